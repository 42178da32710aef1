// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use super::{CompareOp, DefinitionOp, Term, Timestep, TraceEntry};
use easy_smt as smt;
use indexmap::IndexMap;

/// Translates a symbolic trace into SMT-LIB commands over integers: one declaration per
/// symbol and per traced function, followed by one assertion per trace entry.
/// Each traced function takes the timestep as its first argument.
pub fn trace_to_smt(trace: &[TraceEntry]) -> std::io::Result<Vec<String>> {
    let smt_ctx = smt::ContextBuilder::new().build()?;
    let mut declarations = Vec::new();
    let mut assertions = Vec::new();
    let mut functions: IndexMap<&str, usize> = IndexMap::new();
    let mut uses_final = false;

    for entry in trace {
        match entry {
            TraceEntry::Declare { symbol } => {
                declarations.push(smt_ctx.list(vec![
                    smt_ctx.atom("declare-const"),
                    smt_ctx.atom(format!("sym{symbol}")),
                    smt_ctx.int_sort(),
                ]));
            }
            TraceEntry::State {
                function,
                time,
                args,
                value,
                ..
            } => {
                functions.entry(function.as_str()).or_insert(args.len());
                let time = match time {
                    Timestep::At(t) => smt_ctx.numeral(*t),
                    Timestep::Final => {
                        uses_final = true;
                        smt_ctx.atom("final")
                    }
                };
                let mut app = vec![smt_ctx.atom(escape_identifier(function)), time];
                app.extend(args.iter().map(|a| term(&smt_ctx, a)));
                let location = smt_ctx.list(app);
                assertions.push(assert(&smt_ctx, smt_ctx.eq(location, term(&smt_ctx, value))));
            }
            TraceEntry::Condition { lhs, op, rhs, .. } => {
                let (lhs, rhs) = (term(&smt_ctx, lhs), term(&smt_ctx, rhs));
                let cond = match op {
                    CompareOp::Eq => smt_ctx.eq(lhs, rhs),
                    CompareOp::Neq => smt_ctx.list(vec![smt_ctx.atom("not"), smt_ctx.eq(lhs, rhs)]),
                    CompareOp::LesserEq => smt_ctx.list(vec![smt_ctx.atom("<="), lhs, rhs]),
                    CompareOp::Greater => smt_ctx.list(vec![smt_ctx.atom(">"), lhs, rhs]),
                };
                assertions.push(assert(&smt_ctx, cond));
            }
            TraceEntry::Definition {
                symbol,
                op,
                lhs,
                rhs,
                ..
            } => {
                let op = match op {
                    DefinitionOp::Sum => "+",
                    DefinitionOp::Difference => "-",
                    DefinitionOp::Product => "*",
                    DefinitionOp::Quotient => "div",
                    DefinitionOp::Remainder => "mod",
                };
                let value = smt_ctx.list(vec![
                    smt_ctx.atom(op),
                    term(&smt_ctx, lhs),
                    term(&smt_ctx, rhs),
                ]);
                let sym = smt_ctx.atom(format!("sym{symbol}"));
                assertions.push(assert(&smt_ctx, smt_ctx.eq(sym, value)));
            }
        }
    }

    if uses_final {
        declarations.push(smt_ctx.list(vec![
            smt_ctx.atom("declare-const"),
            smt_ctx.atom("final"),
            smt_ctx.int_sort(),
        ]));
    }
    for (name, arity) in functions {
        // timestep plus arguments
        let params = (0..=arity).map(|_| smt_ctx.int_sort()).collect();
        declarations.push(smt_ctx.list(vec![
            smt_ctx.atom("declare-fun"),
            smt_ctx.atom(escape_identifier(name)),
            smt_ctx.list(params),
            smt_ctx.int_sort(),
        ]));
    }

    Ok(declarations
        .into_iter()
        .chain(assertions)
        .map(|e| smt_ctx.display(e).to_string())
        .collect())
}

fn assert(smt_ctx: &smt::Context, e: smt::SExpr) -> smt::SExpr {
    smt_ctx.list(vec![smt_ctx.atom("assert"), e])
}

fn term(smt_ctx: &smt::Context, t: &Term) -> smt::SExpr {
    match t {
        Term::Int(v) if *v < 0 => {
            smt_ctx.list(vec![smt_ctx.atom("-"), smt_ctx.numeral(v.unsigned_abs())])
        }
        Term::Int(v) => smt_ctx.numeral(*v as u64),
        Term::Bool(true) => smt_ctx.atom("true"),
        Term::Bool(false) => smt_ctx.atom("false"),
        Term::Symbol(id) => smt_ctx.atom(format!("sym{id}")),
        Term::Undef => smt_ctx.atom("undef"),
        Term::Text(t) => smt_ctx.atom(escape_identifier(t)),
    }
}

/// easy-smt does not escape atoms.
fn escape_identifier(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace('|', ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_small_trace() {
        let trace = vec![
            TraceEntry::Declare { symbol: 1 },
            TraceEntry::State {
                id: 1,
                function: "f".to_string(),
                time: Timestep::At(0),
                args: vec![Term::Int(-2)],
                value: Term::Symbol(1),
            },
            TraceEntry::Condition {
                id: 2,
                lhs: Term::Symbol(1),
                op: CompareOp::Neq,
                rhs: Term::Int(3),
            },
            TraceEntry::State {
                id: 3,
                function: "f".to_string(),
                time: Timestep::Final,
                args: vec![Term::Int(-2)],
                value: Term::Symbol(1),
            },
        ];
        let lines = trace_to_smt(&trace).unwrap();
        insta::assert_snapshot!(lines.join("\n"), @r###"
        (declare-const sym1 Int)
        (declare-const final Int)
        (declare-fun f (Int Int) Int)
        (assert (= (f 0 (- 2)) sym1))
        (assert (not (= sym1 3)))
        (assert (= (f final (- 2)) sym1))
        "###);
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(escape_identifier("count"), "count");
        assert_eq!(escape_identifier("a b"), "|a b|");
        assert_eq!(escape_identifier("1x"), "|1x|");
    }
}
