// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::{ExprRef, FunctionId, RuleId, StringRef};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Declared type of a function argument or return value. The type checker guarantees that
/// all values flowing through a function agree with it, the engine only needs it to find
/// list typed functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
    RuleRef,
    List(Box<Type>),
}

impl Type {
    pub fn is_list(&self) -> bool {
        matches!(self, Type::List(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lesser,
    Greater,
    LesserEq,
    GreaterEq,
    And,
    Or,
    Xor,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "=",
            BinOp::Neq => "!=",
            BinOp::Lesser => "<",
            BinOp::Greater => ">",
            BinOp::LesserEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::Neq
                | BinOp::Lesser
                | BinOp::Greater
                | BinOp::LesserEq
                | BinOp::GreaterEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Pow,
    Hex,
    Nth,
    Cons,
    App,
    Tail,
    Len,
    Peek,
    BooleanToInt,
    IntToBoolean,
    AsInt,
    AsFloat,
    Symbolic,
}

lazy_static! {
    static ref BUILTIN_NAMES: HashMap<&'static str, Builtin> = HashMap::from([
        ("pow", Builtin::Pow),
        ("hex", Builtin::Hex),
        ("nth", Builtin::Nth),
        ("cons", Builtin::Cons),
        ("app", Builtin::App),
        ("tail", Builtin::Tail),
        ("len", Builtin::Len),
        ("peek", Builtin::Peek),
        ("Boolean2Int", Builtin::BooleanToInt),
        ("Int2Boolean", Builtin::IntToBoolean),
        ("asInt", Builtin::AsInt),
        ("asFloat", Builtin::AsFloat),
        ("symbolic", Builtin::Symbolic),
    ]);
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTIN_NAMES.get(name).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Pow => "pow",
            Builtin::Hex => "hex",
            Builtin::Nth => "nth",
            Builtin::Cons => "cons",
            Builtin::App => "app",
            Builtin::Tail => "tail",
            Builtin::Len => "len",
            Builtin::Peek => "peek",
            Builtin::BooleanToInt => "Boolean2Int",
            Builtin::IntToBoolean => "Int2Boolean",
            Builtin::AsInt => "asInt",
            Builtin::AsFloat => "asFloat",
            Builtin::Symbolic => "symbolic",
        }
    }
}

/// Represents an expression of the typed specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(StringRef),
    Undef,
    Rule(RuleId),
    /// Reads a `let`, `forall` or rule/derived parameter binding.
    Var(StringRef),
    /// Reads a controlled, static or derived function.
    Read {
        function: FunctionId,
        args: Vec<ExprRef>,
    },
    Builtin {
        op: Builtin,
        args: Vec<ExprRef>,
    },
    Binary(BinOp, ExprRef, ExprRef),
    Not(ExprRef),
    List(Vec<ExprRef>),
    /// Integer range `[lo..hi]`, both ends inclusive.
    Range(ExprRef, ExprRef),
}

pub trait ForEachChild {
    fn for_each_child(&self, visitor: impl FnMut(&ExprRef));
    fn num_children(&self) -> usize;
}

impl ForEachChild for Expr {
    fn for_each_child(&self, mut visitor: impl FnMut(&ExprRef)) {
        match self {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Bool(_)
            | Expr::Str(_)
            | Expr::Undef
            | Expr::Rule(_)
            | Expr::Var(_) => {} // no children
            Expr::Read { args, .. } | Expr::Builtin { args, .. } | Expr::List(args) => {
                args.iter().for_each(visitor)
            }
            Expr::Binary(_, a, b) | Expr::Range(a, b) => {
                (visitor)(a);
                (visitor)(b);
            }
            Expr::Not(e) => (visitor)(e),
        }
    }

    fn num_children(&self) -> usize {
        match self {
            Expr::Read { args, .. } | Expr::Builtin { args, .. } | Expr::List(args) => args.len(),
            Expr::Binary(..) | Expr::Range(..) => 2,
            Expr::Not(_) => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_round_trip() {
        for name in ["pow", "app", "Int2Boolean", "symbolic"] {
            assert_eq!(Builtin::from_name(name).unwrap().name(), name);
        }
        assert_eq!(Builtin::from_name("car"), None);
    }

    #[test]
    fn binary_children() {
        let a = ExprRef::from_index(0);
        let b = ExprRef::from_index(1);
        let e = Expr::Binary(BinOp::Add, a, b);
        let mut children = vec![];
        e.for_each_child(|c| children.push(*c));
        assert_eq!(children, [a, b]);
        assert_eq!(e.num_children(), 2);
    }
}
