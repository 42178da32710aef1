// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::expr::*;
use crate::ir::stmt::*;
use crate::ir::{FunctionId, RuleId};
use std::fmt::{Debug, Formatter};
use std::num::{NonZeroU16, NonZeroU32};

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct StringRef(NonZeroU16);

impl Debug for StringRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringRef({})", self.index())
    }
}

impl StringRef {
    fn from_index(index: usize) -> Self {
        Self(NonZeroU16::new((index + 1) as u16).unwrap())
    }

    pub(crate) fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct ExprRef(NonZeroU32);

impl Debug for ExprRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // we need a custom implementation in order to show the zero based index
        write!(f, "ExprRef({})", self.index())
    }
}

impl ExprRef {
    pub(crate) fn from_index(index: usize) -> Self {
        ExprRef(NonZeroU32::new((index + 1) as u32).unwrap())
    }

    pub(crate) fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct StmtRef(NonZeroU32);

impl Debug for StmtRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StmtRef({})", self.index())
    }
}

impl StmtRef {
    pub(crate) fn from_index(index: usize) -> Self {
        StmtRef(NonZeroU32::new((index + 1) as u32).unwrap())
    }

    pub(crate) fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Context which owns all expressions, statements and identifier strings of a specification.
/// Strings are interned such that reference equivalence implies string equivalence.
/// Expressions and statements are only appended, their handles stay valid for the lifetime
/// of the context.
#[derive(Clone, Default)]
pub struct Context {
    strings: indexmap::IndexSet<String>,
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

/// Adding and looking up nodes.
impl Context {
    pub fn get(&self, reference: ExprRef) -> &Expr {
        self.exprs.get(reference.index()).expect("Invalid ExprRef!")
    }

    pub fn get_stmt(&self, reference: StmtRef) -> &Stmt {
        self.stmts.get(reference.index()).expect("Invalid StmtRef!")
    }

    pub(crate) fn add_expr(&mut self, value: Expr) -> ExprRef {
        self.exprs.push(value);
        ExprRef::from_index(self.exprs.len() - 1)
    }

    pub fn add_stmt(&mut self, kind: StmtKind, span: Span) -> StmtRef {
        self.stmts.push(Stmt { kind, span });
        StmtRef::from_index(self.stmts.len() - 1)
    }

    pub fn get_str(&self, reference: StringRef) -> &str {
        self.strings
            .get_index(reference.index())
            .expect("Invalid StringRef!")
    }

    pub fn string(&mut self, value: std::borrow::Cow<str>) -> StringRef {
        if let Some(index) = self.strings.get_index_of(value.as_ref()) {
            StringRef::from_index(index)
        } else {
            let (index, _) = self.strings.insert_full(value.into_owned());
            StringRef::from_index(index)
        }
    }

    /// Overrides the source location of a statement. Builders create statements without one.
    pub fn set_span(&mut self, stmt: StmtRef, span: Span) {
        self.stmts[stmt.index()].span = span;
    }
}

/// Convenience methods to construct expressions.
impl Context {
    pub fn int(&mut self, value: i64) -> ExprRef {
        self.add_expr(Expr::Int(value))
    }
    pub fn float(&mut self, value: f64) -> ExprRef {
        self.add_expr(Expr::Float(value))
    }
    pub fn bool(&mut self, value: bool) -> ExprRef {
        self.add_expr(Expr::Bool(value))
    }
    pub fn str_lit(&mut self, value: &str) -> ExprRef {
        let s = self.string(value.into());
        self.add_expr(Expr::Str(s))
    }
    pub fn undef(&mut self) -> ExprRef {
        self.add_expr(Expr::Undef)
    }
    pub fn rule_ref(&mut self, rule: RuleId) -> ExprRef {
        self.add_expr(Expr::Rule(rule))
    }
    pub fn var(&mut self, name: &str) -> ExprRef {
        let name = self.string(name.into());
        self.add_expr(Expr::Var(name))
    }
    pub fn read(&mut self, function: FunctionId, args: Vec<ExprRef>) -> ExprRef {
        self.add_expr(Expr::Read { function, args })
    }
    pub fn builtin(&mut self, op: Builtin, args: Vec<ExprRef>) -> ExprRef {
        self.add_expr(Expr::Builtin { op, args })
    }
    pub fn binary(&mut self, op: BinOp, a: ExprRef, b: ExprRef) -> ExprRef {
        self.add_expr(Expr::Binary(op, a, b))
    }
    pub fn add(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.binary(BinOp::Add, a, b)
    }
    pub fn sub(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.binary(BinOp::Sub, a, b)
    }
    pub fn equal(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.binary(BinOp::Eq, a, b)
    }
    pub fn lesser(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.binary(BinOp::Lesser, a, b)
    }
    pub fn greater(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.binary(BinOp::Greater, a, b)
    }
    pub fn not(&mut self, e: ExprRef) -> ExprRef {
        self.add_expr(Expr::Not(e))
    }
    pub fn list(&mut self, elements: Vec<ExprRef>) -> ExprRef {
        self.add_expr(Expr::List(elements))
    }
    pub fn range(&mut self, lo: ExprRef, hi: ExprRef) -> ExprRef {
        self.add_expr(Expr::Range(lo, hi))
    }
}

/// Convenience methods to construct statements. All of them use an empty span,
/// call [`Context::set_span`] to attach a source location.
impl Context {
    pub fn skip(&mut self) -> StmtRef {
        self.add_stmt(StmtKind::Skip, Span::default())
    }
    pub fn update(&mut self, function: FunctionId, args: Vec<ExprRef>, value: ExprRef) -> StmtRef {
        self.add_stmt(
            StmtKind::Update {
                function,
                args,
                value,
            },
            Span::default(),
        )
    }
    pub fn par(&mut self, body: Vec<StmtRef>) -> StmtRef {
        self.add_stmt(StmtKind::Par(body), Span::default())
    }
    pub fn seq(&mut self, body: Vec<StmtRef>) -> StmtRef {
        self.add_stmt(StmtKind::Seq(body), Span::default())
    }
    pub fn if_then(&mut self, cond: ExprRef, then: StmtRef, els: Option<StmtRef>) -> StmtRef {
        self.add_stmt(StmtKind::If { cond, then, els }, Span::default())
    }
    pub fn case(
        &mut self,
        expr: ExprRef,
        arms: Vec<(ExprRef, StmtRef)>,
        default: Option<StmtRef>,
    ) -> StmtRef {
        self.add_stmt(
            StmtKind::Case {
                expr,
                arms,
                default,
            },
            Span::default(),
        )
    }
    pub fn let_in(&mut self, name: &str, value: ExprRef, body: StmtRef) -> StmtRef {
        let name = self.string(name.into());
        self.add_stmt(StmtKind::Let { name, value, body }, Span::default())
    }
    pub fn forall(&mut self, name: &str, domain: ExprRef, body: StmtRef) -> StmtRef {
        let name = self.string(name.into());
        self.add_stmt(StmtKind::Forall { name, domain, body }, Span::default())
    }
    pub fn iterate(&mut self, body: StmtRef) -> StmtRef {
        self.add_stmt(StmtKind::Iterate(body), Span::default())
    }
    pub fn call(&mut self, rule: RuleId, args: Vec<ExprRef>) -> StmtRef {
        self.add_stmt(
            StmtKind::Call {
                target: CallTarget::Direct(rule),
                args,
            },
            Span::default(),
        )
    }
    pub fn call_indirect(&mut self, target: ExprRef, args: Vec<ExprRef>) -> StmtRef {
        self.add_stmt(
            StmtKind::Call {
                target: CallTarget::Indirect(target),
                args,
            },
            Span::default(),
        )
    }
    pub fn print(&mut self, values: Vec<ExprRef>) -> StmtRef {
        self.add_stmt(StmtKind::Print(values), Span::default())
    }
    pub fn assert(&mut self, cond: ExprRef) -> StmtRef {
        self.add_stmt(StmtKind::Assert(cond), Span::default())
    }
    pub fn diedie(&mut self, msg: Option<ExprRef>) -> StmtRef {
        self.add_stmt(StmtKind::Diedie(msg), Span::default())
    }
    pub fn push(&mut self, value: ExprRef, to: FunctionId, args: Vec<ExprRef>) -> StmtRef {
        self.add_stmt(StmtKind::Push { value, to, args }, Span::default())
    }
    pub fn pop(&mut self, from: FunctionId, from_args: Vec<ExprRef>, to: FunctionId) -> StmtRef {
        self.add_stmt(
            StmtKind::Pop {
                from,
                from_args,
                to,
            },
            Span::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_type_size() {
        assert_eq!(std::mem::size_of::<StringRef>(), 2);
        assert_eq!(std::mem::size_of::<Option<StringRef>>(), 2);
        assert_eq!(std::mem::size_of::<ExprRef>(), 4);
        assert_eq!(std::mem::size_of::<Option<StmtRef>>(), 4);
    }

    #[test]
    fn strings_are_interned() {
        let mut ctx = Context::default();
        let a = ctx.string("counter".into());
        let b = ctx.string("other".into());
        let c = ctx.string("counter".into());
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(ctx.get_str(b), "other");
    }

    #[test]
    fn statements_keep_their_span() {
        let mut ctx = Context::default();
        let s = ctx.skip();
        assert_eq!(ctx.get_stmt(s).span, Span::default());
        ctx.set_span(s, Span::new(3, 7));
        assert_eq!(ctx.get_stmt(s).span, Span::new(3, 7));
    }
}
