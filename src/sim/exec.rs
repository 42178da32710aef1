// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Concrete semantics of operators and builtins. Symbolic operands are dealt with by the
// interpreter before it calls into here.

use crate::ir::{BinOp, Builtin};
use crate::sim::list::{ListStore, StepOwner};
use crate::sim::value::{values_equal, Value};

/// On failure, a short explanation of why the operands are not supported.
pub type OpResult = std::result::Result<Value, String>;

fn unsupported(op: &str, a: &Value, b: &Value) -> OpResult {
    Err(format!(
        "`{op}` is not defined for {} and {}",
        a.kind_name(),
        b.kind_name()
    ))
}

pub fn binary(op: BinOp, a: &Value, b: &Value, lists: &ListStore) -> OpResult {
    match op {
        BinOp::Eq => Ok(Value::Bool(values_equal(lists, a, b))),
        BinOp::Neq => Ok(Value::Bool(!values_equal(lists, a, b))),
        BinOp::And | BinOp::Or | BinOp::Xor => logic(op, a, b),
        _ if a.is_undef() || b.is_undef() => Ok(Value::Undef),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arithmetic(op, a, b),
        BinOp::Lesser | BinOp::Greater | BinOp::LesserEq | BinOp::GreaterEq => compare(op, a, b),
    }
}

fn arithmetic(op: BinOp, a: &Value, b: &Value) -> OpResult {
    let res = match (a, b) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinOp::Add => Value::Int(a.wrapping_add(*b)),
            BinOp::Sub => Value::Int(a.wrapping_sub(*b)),
            BinOp::Mul => Value::Int(a.wrapping_mul(*b)),
            BinOp::Div if *b == 0 => Value::Undef,
            BinOp::Div => Value::Int(a.wrapping_div(*b)),
            BinOp::Mod if *b == 0 => Value::Undef,
            BinOp::Mod => Value::Int(a.wrapping_rem(*b)),
            _ => unreachable!("not an arithmetic operator: {op:?}"),
        },
        (Value::Float(a), Value::Float(b)) => match op {
            BinOp::Add => Value::Float(a + b),
            BinOp::Sub => Value::Float(a - b),
            BinOp::Mul => Value::Float(a * b),
            BinOp::Div => Value::Float(a / b),
            BinOp::Mod => Value::Float(a % b),
            _ => unreachable!("not an arithmetic operator: {op:?}"),
        },
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            Value::Str(format!("{a}{b}").into_boxed_str())
        }
        _ => return unsupported(op.symbol(), a, b),
    };
    Ok(res)
}

fn compare(op: BinOp, a: &Value, b: &Value) -> OpResult {
    let ordering = match (a, b) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => return unsupported(op.symbol(), a, b),
    };
    // NaN is unordered
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let res = match op {
        BinOp::Lesser => ordering.is_lt(),
        BinOp::Greater => ordering.is_gt(),
        BinOp::LesserEq => ordering.is_le(),
        BinOp::GreaterEq => ordering.is_ge(),
        _ => unreachable!("not an ordering operator: {op:?}"),
    };
    Ok(Value::Bool(res))
}

/// Three valued logic: undef is unknown.
fn logic(op: BinOp, a: &Value, b: &Value) -> OpResult {
    let as_logic = |v: &Value| match v {
        Value::Bool(b) => Some(Some(*b)),
        Value::Undef => Some(None),
        _ => None,
    };
    let (Some(x), Some(y)) = (as_logic(a), as_logic(b)) else {
        return unsupported(op.symbol(), a, b);
    };
    let res = match op {
        BinOp::And => match (x, y) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinOp::Or => match (x, y) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        BinOp::Xor => match (x, y) {
            (Some(x), Some(y)) => Some(x != y),
            _ => None,
        },
        _ => unreachable!("not a logic operator: {op:?}"),
    };
    Ok(res.map(Value::Bool).unwrap_or(Value::Undef))
}

pub fn not(value: &Value) -> OpResult {
    match value {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        Value::Undef => Ok(Value::Undef),
        other => Err(format!("`not` is not defined for {}", other.kind_name())),
    }
}

/// Evaluates a builtin. `app` may grow a list buffer of the current step in place.
pub fn builtin(
    op: Builtin,
    mut args: Vec<Value>,
    lists: &mut ListStore,
    owner: &StepOwner,
) -> OpResult {
    let expected = match op {
        Builtin::Pow | Builtin::Nth | Builtin::Cons | Builtin::App => 2,
        _ => 1,
    };
    if args.len() != expected {
        return Err(format!(
            "`{}` expects {expected} arguments, got {}",
            op.name(),
            args.len()
        ));
    }
    let unsupported_arg = |v: &Value| -> OpResult {
        Err(format!("`{}` is not defined for {}", op.name(), v.kind_name()))
    };

    if expected == 2 {
        let b = args.pop().unwrap_or_default();
        let a = args.pop().unwrap_or_default();
        return match (op, a, b) {
            (Builtin::Pow, Value::Int(a), Value::Int(b)) => Ok(u32::try_from(b)
                .ok()
                .and_then(|b| a.checked_pow(b))
                .map(Value::Int)
                .unwrap_or(Value::Undef)),
            (Builtin::Pow, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a.powf(b))),
            (Builtin::Pow, Value::Undef, _) | (Builtin::Pow, _, Value::Undef) => Ok(Value::Undef),
            (Builtin::Nth, Value::List(list), Value::Int(index)) => Ok(lists.nth(list, index)),
            (Builtin::Nth, Value::Undef, _) | (Builtin::Nth, _, Value::Undef) => Ok(Value::Undef),
            (Builtin::Cons, value, Value::List(list)) => Ok(Value::List(lists.cons(value, list))),
            (Builtin::Cons, _, Value::Undef) => Ok(Value::Undef),
            (Builtin::App, Value::List(list), value) => {
                Ok(Value::List(lists.app(owner, list, value)))
            }
            (Builtin::App, Value::Undef, _) => Ok(Value::Undef),
            (op, a, b) => unsupported(op.name(), &a, &b),
        };
    }

    let arg = args.pop().unwrap_or_default();
    if op == Builtin::Symbolic {
        return Ok(Value::Bool(arg.is_symbolic()));
    }
    if arg.is_undef() {
        return Ok(Value::Undef);
    }
    match (op, &arg) {
        (Builtin::Hex, Value::Int(v)) if *v < 0 => Ok(Value::str(&format!("-{:x}", v.unsigned_abs()))),
        (Builtin::Hex, Value::Int(v)) => Ok(Value::str(&format!("{v:x}"))),
        (Builtin::Tail, Value::List(list)) => Ok(Value::List(lists.tail(*list))),
        (Builtin::Len, Value::List(list)) => Ok(Value::Int(lists.len(*list) as i64)),
        (Builtin::Peek, Value::List(list)) => Ok(lists.peek(*list)),
        (Builtin::BooleanToInt, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        (Builtin::IntToBoolean, Value::Int(v)) => Ok(Value::Bool(*v != 0)),
        (Builtin::AsInt, Value::Int(v)) => Ok(Value::Int(*v)),
        (Builtin::AsInt, Value::Float(f)) => Ok(Value::Int(f.trunc() as i64)),
        (Builtin::AsInt, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        (Builtin::AsInt, Value::Str(s)) => {
            Ok(s.trim().parse().map(Value::Int).unwrap_or(Value::Undef))
        }
        (Builtin::AsFloat, Value::Float(f)) => Ok(Value::Float(*f)),
        (Builtin::AsFloat, Value::Int(v)) => Ok(Value::Float(*v as f64)),
        (Builtin::AsFloat, Value::Str(s)) => {
            Ok(s.trim().parse().map(Value::Float).unwrap_or(Value::Undef))
        }
        _ => unsupported_arg(&arg),
    }
}
