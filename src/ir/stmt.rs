// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::{ExprRef, FunctionId, RuleId, StmtRef, StringRef};

/// Byte range into the specification source. Produced by the parser, only carried along so
/// that errors can point back at the offending statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallTarget {
    Direct(RuleId),
    /// Expression that evaluates to a rule reference.
    Indirect(ExprRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Skip,
    Update {
        function: FunctionId,
        args: Vec<ExprRef>,
        value: ExprRef,
    },
    Par(Vec<StmtRef>),
    Seq(Vec<StmtRef>),
    If {
        cond: ExprRef,
        then: StmtRef,
        els: Option<StmtRef>,
    },
    Case {
        expr: ExprRef,
        arms: Vec<(ExprRef, StmtRef)>,
        default: Option<StmtRef>,
    },
    Let {
        name: StringRef,
        value: ExprRef,
        body: StmtRef,
    },
    Forall {
        name: StringRef,
        domain: ExprRef,
        body: StmtRef,
    },
    /// Re-executes the body until it no longer produces updates.
    Iterate(StmtRef),
    Call {
        target: CallTarget,
        args: Vec<ExprRef>,
    },
    Print(Vec<ExprRef>),
    Assert(ExprRef),
    Diedie(Option<ExprRef>),
    /// `push value into to(args)`
    Push {
        value: ExprRef,
        to: FunctionId,
        args: Vec<ExprRef>,
    },
    /// `pop from(from_args) into to`
    Pop {
        from: FunctionId,
        from_args: Vec<ExprRef>,
        to: FunctionId,
    },
}
