// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::BinOp;
use crate::sim::Value;

/// The four comparisons that path conditions are expressed in.
/// `<` and `>=` are rewritten into these when a condition is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    LesserEq,
    Greater,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::LesserEq => "<=",
            CompareOp::Greater => ">",
        }
    }

    pub fn negate(&self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Neq,
            CompareOp::Neq => CompareOp::Eq,
            CompareOp::LesserEq => CompareOp::Greater,
            CompareOp::Greater => CompareOp::LesserEq,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolicCondition {
    pub lhs: Value,
    pub rhs: Value,
    pub op: CompareOp,
}

/// Outcome of [`check_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    True,
    False,
    NotFound,
}

impl SymbolicCondition {
    pub fn new(lhs: Value, op: CompareOp, rhs: Value) -> Self {
        Self { lhs, rhs, op }
    }

    /// Translates a comparison operator. Returns `None` for non-comparison operators.
    pub fn from_comparison(op: BinOp, lhs: Value, rhs: Value) -> Option<Self> {
        let cond = match op {
            BinOp::Eq => Self::new(lhs, CompareOp::Eq, rhs),
            BinOp::Neq => Self::new(lhs, CompareOp::Neq, rhs),
            BinOp::LesserEq => Self::new(lhs, CompareOp::LesserEq, rhs),
            BinOp::Greater => Self::new(lhs, CompareOp::Greater, rhs),
            // s < c  <=>  s <= c - 1, kept as c > s when c - 1 overflows
            BinOp::Lesser => match rhs {
                Value::Int(c) => match c.checked_sub(1) {
                    Some(k) => Self::new(lhs, CompareOp::LesserEq, Value::Int(k)),
                    None => Self::new(Value::Int(c), CompareOp::Greater, lhs),
                },
                other => Self::new(other, CompareOp::Greater, lhs),
            },
            BinOp::GreaterEq => match rhs {
                Value::Int(c) => match c.checked_sub(1) {
                    Some(k) => Self::new(lhs, CompareOp::Greater, Value::Int(k)),
                    None => Self::new(Value::Int(c), CompareOp::LesserEq, lhs),
                },
                other => Self::new(other, CompareOp::LesserEq, lhs),
            },
            _ => return None,
        };
        Some(cond.normalize())
    }

    /// Moves a symbolic operand to the left hand side.
    pub fn normalize(self) -> Self {
        if self.lhs.is_symbolic() || !self.rhs.is_symbolic() {
            return self;
        }
        let Self { lhs, rhs, op } = self;
        let bound = match &lhs {
            Value::Int(c) => c.checked_sub(1),
            _ => None,
        };
        match (op, bound) {
            (CompareOp::Eq | CompareOp::Neq, _) => Self::new(rhs, op, lhs),
            // c <= s  <=>  s > c - 1
            (CompareOp::LesserEq, Some(k)) => Self::new(rhs, CompareOp::Greater, Value::Int(k)),
            // c > s  <=>  s <= c - 1
            (CompareOp::Greater, Some(k)) => Self::new(rhs, CompareOp::LesserEq, Value::Int(k)),
            // i64::MIN or a non-integer constant
            _ => Self { lhs, rhs, op },
        }
    }

    fn symbol_and_constant(&self) -> Option<(u32, i64)> {
        match (&self.lhs, &self.rhs) {
            (Value::Symbol(sym), Value::Int(c)) => Some((sym.id, *c)),
            _ => None,
        }
    }
}

/// Decides whether `candidate` follows from (`True`) or contradicts (`False`) one of the
/// `known` conditions. Only conditions that compare the same symbol against an integer
/// constant are considered. The first known condition that decides the question wins.
pub fn check_condition(known: &[SymbolicCondition], candidate: &SymbolicCondition) -> CheckResult {
    let candidate = candidate.clone().normalize();
    let Some((symbol, c)) = candidate.symbol_and_constant() else {
        return CheckResult::NotFound;
    };
    for cond in known {
        let Some((known_symbol, k)) = cond.symbol_and_constant() else {
            continue;
        };
        if known_symbol != symbol {
            continue;
        }
        match decide(cond.op, k, candidate.op, c) {
            CheckResult::NotFound => {}
            decided => return decided,
        }
    }
    CheckResult::NotFound
}

fn decide(known: CompareOp, k: i64, candidate: CompareOp, c: i64) -> CheckResult {
    use CompareOp::*;
    let exact = |cond: bool| if cond { CheckResult::True } else { CheckResult::False };
    let implies = |cond: bool| if cond { CheckResult::True } else { CheckResult::NotFound };
    let refutes = |cond: bool| if cond { CheckResult::False } else { CheckResult::NotFound };
    match (known, candidate) {
        (Eq, Eq) => exact(k == c),
        (Eq, Neq) => exact(k != c),
        (Eq, LesserEq) => exact(k <= c),
        (Eq, Greater) => exact(k > c),
        (Neq, Eq) => refutes(k == c),
        (Neq, Neq) => implies(k == c),
        (Neq, LesserEq | Greater) => CheckResult::NotFound,
        (LesserEq, Eq) => refutes(c > k),
        (LesserEq, Neq) => implies(c > k),
        (LesserEq, LesserEq) => implies(k >= c),
        (LesserEq, Greater) => refutes(k <= c),
        (Greater, Eq) => refutes(c <= k),
        (Greater, Neq) => implies(c <= k),
        (Greater, LesserEq) => refutes(c <= k),
        (Greater, Greater) => implies(k >= c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::Symbol;

    fn sym(id: u32) -> Value {
        Value::Symbol(Box::new(Symbol::new(id)))
    }

    fn cond(op: CompareOp, c: i64) -> SymbolicCondition {
        SymbolicCondition::new(sym(1), op, Value::Int(c))
    }

    fn check(known: &[(CompareOp, i64)], candidate: (CompareOp, i64)) -> CheckResult {
        let known: Vec<_> = known.iter().map(|(op, c)| cond(*op, *c)).collect();
        check_condition(&known, &cond(candidate.0, candidate.1))
    }

    #[test]
    fn equal_constants() {
        assert_eq!(check(&[(CompareOp::Eq, 20)], (CompareOp::Eq, 20)), CheckResult::True);
        assert_eq!(check(&[(CompareOp::Eq, 20)], (CompareOp::Eq, 10)), CheckResult::False);
    }

    #[test]
    fn not_equal_known() {
        assert_eq!(check(&[(CompareOp::Neq, 20)], (CompareOp::Eq, 20)), CheckResult::False);
        assert_eq!(check(&[(CompareOp::Neq, 20)], (CompareOp::Neq, 20)), CheckResult::True);
        assert_eq!(
            check(&[(CompareOp::Neq, 20)], (CompareOp::Neq, 30)),
            CheckResult::NotFound
        );
        assert_eq!(
            check(&[(CompareOp::Neq, 20), (CompareOp::Neq, 30)], (CompareOp::Neq, 30)),
            CheckResult::True
        );
    }

    #[test]
    fn not_equal_candidate_with_equal_known() {
        assert_eq!(check(&[(CompareOp::Eq, 20)], (CompareOp::Neq, 30)), CheckResult::True);
        assert_eq!(check(&[(CompareOp::Eq, 20)], (CompareOp::Neq, 20)), CheckResult::False);
    }

    #[test]
    fn ordering() {
        assert_eq!(
            check(&[(CompareOp::Greater, 50)], (CompareOp::LesserEq, 60)),
            CheckResult::NotFound
        );
        assert_eq!(
            check(&[(CompareOp::Greater, 50)], (CompareOp::LesserEq, 40)),
            CheckResult::False
        );
        assert_eq!(
            check(&[(CompareOp::LesserEq, 50)], (CompareOp::LesserEq, 40)),
            CheckResult::True
        );
        assert_eq!(
            check(&[(CompareOp::LesserEq, 50)], (CompareOp::Greater, 60)),
            CheckResult::False
        );
        assert_eq!(
            check(&[(CompareOp::Greater, 50)], (CompareOp::Greater, 40)),
            CheckResult::True
        );
    }

    #[test]
    fn other_symbols_are_ignored() {
        let known = [SymbolicCondition::new(sym(2), CompareOp::Eq, Value::Int(20))];
        assert_eq!(
            check_condition(&known, &cond(CompareOp::Eq, 20)),
            CheckResult::NotFound
        );
        assert_eq!(check(&[], (CompareOp::Eq, 20)), CheckResult::NotFound);
    }

    #[test]
    fn constant_on_the_left_is_normalized() {
        // 20 = s
        let candidate = SymbolicCondition::new(Value::Int(20), CompareOp::Eq, sym(1));
        assert_eq!(
            check_condition(&[cond(CompareOp::Eq, 20)], &candidate),
            CheckResult::True
        );
        // 10 > s  <=>  s <= 9
        let candidate = SymbolicCondition::new(Value::Int(10), CompareOp::Greater, sym(1));
        let normalized = candidate.normalize();
        assert_eq!(normalized.op, CompareOp::LesserEq);
        assert_eq!(normalized.rhs.as_int(), Some(9));
        assert!(normalized.lhs.is_symbolic());
    }

    #[test]
    fn strict_comparisons_are_rewritten() {
        let lt = SymbolicCondition::from_comparison(BinOp::Lesser, sym(1), Value::Int(5)).unwrap();
        assert_eq!(lt.op, CompareOp::LesserEq);
        assert_eq!(lt.rhs.as_int(), Some(4));
        let ge =
            SymbolicCondition::from_comparison(BinOp::GreaterEq, sym(1), Value::Int(5)).unwrap();
        assert_eq!(ge.op, CompareOp::Greater);
        assert_eq!(ge.rhs.as_int(), Some(4));
        // 3 >= s  <=>  s <= 3
        let flipped =
            SymbolicCondition::from_comparison(BinOp::GreaterEq, Value::Int(3), sym(1)).unwrap();
        assert_eq!(flipped.op, CompareOp::LesserEq);
        assert_eq!(flipped.rhs.as_int(), Some(3));
        assert!(SymbolicCondition::from_comparison(BinOp::Add, sym(1), Value::Int(1)).is_none());
    }

    #[test]
    fn comparisons_with_the_smallest_integer() {
        // s < MIN has no `<=` form and keeps the constant on the left
        let lt =
            SymbolicCondition::from_comparison(BinOp::Lesser, sym(1), Value::Int(i64::MIN))
                .unwrap();
        assert_eq!(lt.op, CompareOp::Greater);
        assert_eq!(lt.lhs.as_int(), Some(i64::MIN));
        assert!(lt.rhs.is_symbolic());
        let ge =
            SymbolicCondition::from_comparison(BinOp::GreaterEq, sym(1), Value::Int(i64::MIN))
                .unwrap();
        assert_eq!(ge.op, CompareOp::LesserEq);
        assert_eq!(ge.lhs.as_int(), Some(i64::MIN));

        let left = SymbolicCondition::new(Value::Int(i64::MIN), CompareOp::LesserEq, sym(1));
        assert_eq!(left.normalize().lhs.as_int(), Some(i64::MIN));
        // undecided, the trace carries the comparison as is
        assert_eq!(
            check_condition(&[cond(CompareOp::Greater, 0)], &lt),
            CheckResult::NotFound
        );
        // one above the minimum is still rewritten
        let lt = SymbolicCondition::from_comparison(
            BinOp::Lesser,
            sym(1),
            Value::Int(i64::MIN + 1),
        )
        .unwrap();
        assert_eq!(lt.op, CompareOp::LesserEq);
        assert_eq!(lt.rhs.as_int(), Some(i64::MIN));
    }
}
