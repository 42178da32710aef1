// Copyright 2023 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::ir::{Context, RuleId, Specification};
use crate::sim::list::{ListRef, ListStore};
use crate::symbolic::Symbol;
use std::fmt::Write;

/// Runtime value. Scalars are stored inline, every other variant owns exactly one heap
/// allocation (or, for lists, a handle into the [`ListStore`]).
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Box<str>),
    Undef,
    RuleRef(RuleId),
    Symbol(Box<Symbol>),
    List(ListRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Undef
    }
}

impl Value {
    pub fn str(value: &str) -> Self {
        Value::Str(value.into())
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_rule(&self) -> Option<RuleId> {
        match self {
            Value::RuleRef(rule) => Some(*rule),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<ListRef> {
        match self {
            Value::List(list) => Some(*list),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// Short name of the variant, used in error details.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Boolean",
            Value::Str(_) => "String",
            Value::Undef => "Undef",
            Value::RuleRef(_) => "RuleRef",
            Value::Symbol(_) => "Symbol",
            Value::List(_) => "List",
        }
    }
}

/// Variant aware equality. Undef only equals Undef and lists compare their logical
/// element sequences, independent of how they are represented in the store.
pub fn values_equal(lists: &ListStore, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Undef, Value::Undef) => true,
        (Value::RuleRef(a), Value::RuleRef(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a.id == b.id,
        (Value::List(a), Value::List(b)) => {
            if a == b {
                return true;
            }
            let mut a_iter = lists.iter(*a);
            let mut b_iter = lists.iter(*b);
            loop {
                match (a_iter.next(), b_iter.next()) {
                    (None, None) => return true,
                    (Some(a), Some(b)) if values_equal(lists, a, b) => {}
                    _ => return false,
                }
            }
        }
        _ => false,
    }
}

/// Renders values into their textual form. Needs the context and specification to print
/// rule names and the list store to walk list values.
pub struct Renderer<'a> {
    ctx: &'a Context,
    spec: &'a Specification,
    lists: &'a ListStore,
}

impl<'a> Renderer<'a> {
    pub fn new(ctx: &'a Context, spec: &'a Specification, lists: &'a ListStore) -> Self {
        Self { ctx, spec, lists }
    }

    pub fn value(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value);
        out
    }

    pub fn args(&self, args: &[Value]) -> String {
        let mut out = String::new();
        for (ii, arg) in args.iter().enumerate() {
            if ii > 0 {
                out.push_str(", ");
            }
            self.write_value(&mut out, arg);
        }
        out
    }

    /// `f` for nullary functions, `f(a, b)` otherwise.
    pub fn location(&self, name: &str, args: &[Value]) -> String {
        if args.is_empty() {
            name.to_string()
        } else {
            format!("{name}({})", self.args(args))
        }
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        // writing into a String never fails
        let _ = match value {
            Value::Int(v) => write!(out, "{v}"),
            Value::Float(v) => write!(out, "{v:?}"),
            Value::Bool(v) => write!(out, "{v}"),
            Value::Str(v) => write!(out, "{v}"),
            Value::Undef => write!(out, "undef"),
            Value::RuleRef(r) => write!(out, "@{}", self.ctx.get_str(self.spec.rule(*r).name)),
            Value::Symbol(sym) => write!(out, "sym{}", sym.id),
            Value::List(list) => {
                out.push('[');
                for (ii, element) in self.lists.iter(*list).enumerate() {
                    if ii > 0 {
                        out.push_str(", ");
                    }
                    self.write_value(out, element);
                }
                out.push(']');
                Ok(())
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_size() {
        // 8 bytes for the tag and 16 bytes for the largest payload (boxed str)
        assert_eq!(std::mem::size_of::<Value>(), 24);
    }

    #[test]
    fn undef_only_equals_undef() {
        let lists = ListStore::default();
        assert!(values_equal(&lists, &Value::Undef, &Value::Undef));
        assert!(!values_equal(&lists, &Value::Undef, &Value::Int(0)));
        assert!(!values_equal(&lists, &Value::Bool(false), &Value::Undef));
        assert!(!values_equal(&lists, &Value::Int(1), &Value::Bool(true)));
        assert!(values_equal(&lists, &Value::str("a"), &Value::str("a")));
    }

    #[test]
    fn lists_compare_logically() {
        let mut lists = ListStore::default();
        let owner = lists.begin_step();
        let base = lists.from_values(vec![Value::Int(2), Value::Int(3)]);
        let consed = lists.cons(Value::Int(1), base);
        let flat = lists.from_values(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(values_equal(&lists, &Value::List(consed), &Value::List(flat)));
        let longer = lists.app(&owner, flat, Value::Int(4));
        assert!(!values_equal(&lists, &Value::List(consed), &Value::List(longer)));
    }

    #[test]
    fn render_nested_list() {
        let mut ctx = Context::default();
        let spec = Specification::new(&mut ctx, "render".to_string());
        let mut lists = ListStore::default();
        let inner = lists.from_values(vec![Value::Bool(true), Value::Undef]);
        let outer = lists.from_values(vec![Value::Int(1), Value::List(inner), Value::str("x")]);
        let renderer = Renderer::new(&ctx, &spec, &lists);
        assert_eq!(renderer.value(&Value::List(outer)), "[1, [true, undef], x]");
        assert_eq!(
            renderer.location("f", &[Value::Int(1), Value::Float(2.5)]),
            "f(1, 2.5)"
        );
        assert_eq!(renderer.location("x", &[]), "x");
    }
}
