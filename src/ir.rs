// Copyright 2023 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>
mod context;
mod expr;
mod serialize;
mod specification;
mod stmt;
mod traversal;

pub use context::{Context, ExprRef, StmtRef, StringRef};
pub use expr::{BinOp, Builtin, Expr, ForEachChild, Type};
pub use serialize::serialize_expr;
pub use specification::{
    Function, FunctionId, FunctionKind, Rule, RuleId, Specification, UnknownName,
};
pub use stmt::{CallTarget, Span, Stmt, StmtKind};
pub use traversal::bottom_up;
