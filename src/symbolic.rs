// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Bookkeeping for symbolic execution: fresh symbols, path conditions and the trace of
// timestamped assertions that is handed to an external prover.

mod condition;
mod smt;

pub use condition::{check_condition, CheckResult, CompareOp, SymbolicCondition};
pub use smt::trace_to_smt;

use crate::ir::{BinOp, FunctionId};
use crate::sim::{ArgumentsKey, Value};
use indexmap::{IndexMap, IndexSet};
use std::fmt::{Display, Formatter};

/// An unknown value. Boolean symbols that stem from a comparison carry it as their
/// defining condition.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: u32,
    pub condition: Option<Box<SymbolicCondition>>,
}

impl Symbol {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            condition: None,
        }
    }

    pub fn with_condition(id: u32, condition: SymbolicCondition) -> Self {
        Self {
            id,
            condition: Some(Box::new(condition)),
        }
    }
}

/// Operand of a trace assertion.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Int(i64),
    Bool(bool),
    Symbol(u32),
    Undef,
    /// Rendering of any other value.
    Text(String),
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Int(v) => write!(f, "{v}"),
            Term::Bool(true) => write!(f, "$true"),
            Term::Bool(false) => write!(f, "$false"),
            Term::Symbol(id) => write!(f, "sym{id}"),
            Term::Undef => write!(f, "undef"),
            Term::Text(t) => write!(f, "{t}"),
        }
    }
}

/// Scalar values map directly, everything else needs a [`crate::sim::Renderer`].
impl TryFrom<&Value> for Term {
    type Error = ();

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(v) => Ok(Term::Int(*v)),
            Value::Bool(v) => Ok(Term::Bool(*v)),
            Value::Symbol(sym) => Ok(Term::Symbol(sym.id)),
            Value::Undef => Ok(Term::Undef),
            Value::Float(v) => Ok(Term::Text(format!("{v:?}"))),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionOp {
    Sum,
    Difference,
    Product,
    Quotient,
    Remainder,
}

impl DefinitionOp {
    pub fn from_bin_op(op: BinOp) -> Option<Self> {
        match op {
            BinOp::Add => Some(DefinitionOp::Sum),
            BinOp::Sub => Some(DefinitionOp::Difference),
            BinOp::Mul => Some(DefinitionOp::Product),
            BinOp::Div => Some(DefinitionOp::Quotient),
            BinOp::Mod => Some(DefinitionOp::Remainder),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DefinitionOp::Sum => "$sum",
            DefinitionOp::Difference => "$difference",
            DefinitionOp::Product => "$product",
            DefinitionOp::Quotient => "$quotient_e",
            DefinitionOp::Remainder => "$remainder_e",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestep {
    At(u32),
    Final,
}

impl Display for Timestep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Timestep::At(t) => write!(f, "{t}"),
            Timestep::Final => write!(f, "final"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEntry {
    Declare {
        symbol: u32,
    },
    State {
        id: u32,
        function: String,
        time: Timestep,
        args: Vec<Term>,
        value: Term,
    },
    Condition {
        id: u32,
        lhs: Term,
        op: CompareOp,
        rhs: Term,
    },
    Definition {
        id: u32,
        symbol: u32,
        op: DefinitionOp,
        lhs: Term,
        rhs: Term,
    },
}

impl Display for TraceEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEntry::Declare { symbol } => write!(f, "tff(symbolNext,type,sym{symbol}: $int)."),
            TraceEntry::State {
                id,
                function,
                time,
                args,
                value,
            } => {
                write!(f, "fof('id{id}',hypothesis,{function}({time},")?;
                for arg in args {
                    write!(f, "{arg},")?;
                }
                write!(f, "{value})).")
            }
            TraceEntry::Condition { id, lhs, op, rhs } => {
                write!(f, "fof('id{id}',hypothesis,{lhs}{}{rhs}).", op.symbol())
            }
            TraceEntry::Definition {
                id,
                symbol,
                op,
                lhs,
                rhs,
            } => write!(
                f,
                "fof('id{id}',hypothesis,sym{symbol}={}({lhs},{rhs})).",
                op.name()
            ),
        }
    }
}

/// A function location whose value is reported at every timestep.
#[derive(Debug, Clone)]
struct Location {
    function: String,
    args: Vec<Term>,
    value: Term,
}

pub type LocationKey = (FunctionId, ArgumentsKey);

/// Owns the symbol counter, the path conditions and the trace of one run.
#[derive(Debug, Default)]
pub struct SymbolicEngine {
    last_symbol: u32,
    last_fof: u32,
    timestamp: u32,
    path: Vec<SymbolicCondition>,
    tracked: IndexMap<LocationKey, Location>,
    trace: Vec<TraceEntry>,
}

impl SymbolicEngine {
    pub fn next_symbol_id(&mut self) -> u32 {
        self.last_symbol += 1;
        self.last_symbol
    }

    fn next_fof_id(&mut self) -> u32 {
        self.last_fof += 1;
        self.last_fof
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn advance_timestamp(&mut self) {
        self.timestamp += 1;
    }

    /// Allocates and declares a new symbol.
    pub fn fresh_symbol(&mut self) -> Symbol {
        let id = self.next_symbol_id();
        self.trace.push(TraceEntry::Declare { symbol: id });
        Symbol::new(id)
    }

    /// New symbol that stands for the still undecided `condition`.
    pub fn fresh_condition(&mut self, condition: SymbolicCondition) -> Symbol {
        let id = self.fresh_symbol().id;
        Symbol::with_condition(id, condition)
    }

    /// New symbol defined as `lhs op rhs`.
    pub fn define(&mut self, op: DefinitionOp, lhs: Term, rhs: Term) -> Symbol {
        let symbol = self.fresh_symbol();
        let id = self.next_fof_id();
        self.trace.push(TraceEntry::Definition {
            id,
            symbol: symbol.id,
            op,
            lhs,
            rhs,
        });
        symbol
    }

    pub fn path_conditions(&self) -> &[SymbolicCondition] {
        &self.path
    }

    /// Tries to decide `candidate` from the current path conditions.
    pub fn check(&self, candidate: &SymbolicCondition) -> CheckResult {
        check_condition(&self.path, candidate)
    }

    /// Adds `condition` to the path and records it in the trace.
    pub fn assume(&mut self, condition: SymbolicCondition, lhs: Term, rhs: Term) {
        let id = self.next_fof_id();
        self.trace.push(TraceEntry::Condition {
            id,
            lhs,
            op: condition.op,
            rhs,
        });
        self.path.push(condition);
    }

    /// Records a location that was just materialized with a symbolic value. The trace needs
    /// a value for every timestep, so the same value is reported for all steps so far.
    pub fn dump_create(&mut self, key: LocationKey, function: &str, args: Vec<Term>, value: Term) {
        for t in 0..=self.timestamp {
            self.push_state(function, Timestep::At(t), &args, &value);
        }
        self.tracked.insert(
            key,
            Location {
                function: function.to_string(),
                args,
                value,
            },
        );
    }

    /// Records the new value of an updated location at the current timestep.
    pub fn dump_update(&mut self, key: LocationKey, function: &str, args: Vec<Term>, value: Term) {
        self.push_state(function, Timestep::At(self.timestamp), &args, &value);
        self.tracked.insert(
            key,
            Location {
                function: function.to_string(),
                args,
                value,
            },
        );
    }

    /// Repeats the value of every tracked location that was not updated in this step.
    pub fn dump_symbolic(&mut self, touched: &IndexSet<LocationKey>) {
        let time = Timestep::At(self.timestamp);
        for (key, loc) in self.tracked.iter() {
            if touched.contains(key) {
                continue;
            }
            self.last_fof += 1;
            self.trace.push(TraceEntry::State {
                id: self.last_fof,
                function: loc.function.clone(),
                time,
                args: loc.args.clone(),
                value: loc.value.clone(),
            });
        }
    }

    /// Reports the end state of every tracked location.
    pub fn finish(&mut self) {
        for loc in self.tracked.values() {
            self.last_fof += 1;
            self.trace.push(TraceEntry::State {
                id: self.last_fof,
                function: loc.function.clone(),
                time: Timestep::Final,
                args: loc.args.clone(),
                value: loc.value.clone(),
            });
        }
    }

    fn push_state(&mut self, function: &str, time: Timestep, args: &[Term], value: &Term) {
        let id = self.next_fof_id();
        self.trace.push(TraceEntry::State {
            id,
            function: function.to_string(),
            time,
            args: args.to_vec(),
            value: value.clone(),
        });
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn trace_lines(&self) -> Vec<String> {
        self.trace.iter().map(|e| e.to_string()).collect()
    }
}
