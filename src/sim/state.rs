// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::{FunctionId, Specification};
use crate::sim::list::ListStore;
use crate::sim::value::{values_equal, Value};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub(crate) const UNDEF_HASH: u64 = 0x8000_0000_0000_0001;

/// One hash per argument value. Keys of functions with up to four arguments do not
/// allocate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArgumentsKey(SmallVec<[u64; 4]>);

impl ArgumentsKey {
    pub fn new(args: &[Value], lists: &ListStore) -> Self {
        ArgumentsKey(args.iter().map(|a| hash_value(a, lists)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

/// Lookups work with a borrowed slice of hashes.
impl Borrow<[u64]> for ArgumentsKey {
    fn borrow(&self) -> &[u64] {
        &self.0
    }
}

/// Integers hash to themselves, every other value through the default hasher.
/// Lists hash their logical elements so that equal lists share a key.
fn hash_value(value: &Value, lists: &ListStore) -> u64 {
    match value {
        Value::Int(v) => *v as u64,
        Value::Undef => UNDEF_HASH,
        other => {
            let mut hasher = DefaultHasher::new();
            hash_into(other, lists, &mut hasher);
            hasher.finish()
        }
    }
}

fn hash_into(value: &Value, lists: &ListStore, hasher: &mut DefaultHasher) {
    std::mem::discriminant(value).hash(hasher);
    match value {
        Value::Int(v) => v.hash(hasher),
        Value::Float(v) => v.to_bits().hash(hasher),
        Value::Bool(v) => v.hash(hasher),
        Value::Str(v) => v.hash(hasher),
        Value::Undef => {}
        Value::RuleRef(r) => r.hash(hasher),
        Value::Symbol(sym) => sym.id.hash(hasher),
        Value::List(list) => {
            for element in lists.iter(*list) {
                hash_into(element, lists, hasher);
            }
        }
    }
}

/// Two argument tuples denote the same location.
pub(crate) fn args_equal(lists: &ListStore, a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(lists, a, b))
}

#[derive(Debug, Clone)]
struct Location {
    args: Vec<Value>,
    value: Value,
}

/// Locations whose arguments share one key. Almost always a single entry.
type Bucket = SmallVec<[Location; 1]>;

/// Current value of every stored location. Only written while an update set is applied.
#[derive(Debug, Clone)]
pub struct FunctionStore {
    tables: Vec<IndexMap<ArgumentsKey, Bucket>>,
}

impl FunctionStore {
    pub fn new(spec: &Specification) -> Self {
        Self {
            tables: spec.functions().map(|_| IndexMap::new()).collect(),
        }
    }

    /// Value at `function(args)`. `key` has to be the key of `args`; colliding keys are
    /// told apart by comparing the arguments.
    pub fn get(
        &self,
        lists: &ListStore,
        function: FunctionId,
        key: &[u64],
        args: &[Value],
    ) -> Option<&Value> {
        self.tables[function.index()]
            .get(key)?
            .iter()
            .find(|l| args_equal(lists, &l.args, args))
            .map(|l| &l.value)
    }

    pub fn set(
        &mut self,
        lists: &ListStore,
        function: FunctionId,
        key: ArgumentsKey,
        args: Vec<Value>,
        value: Value,
    ) {
        let bucket = self.tables[function.index()].entry(key).or_default();
        match bucket.iter_mut().find(|l| args_equal(lists, &l.args, &args)) {
            Some(location) => location.value = value,
            None => bucket.push(Location { args, value }),
        }
    }

    /// Every stored argument and value, used as roots when reclaiming list nodes.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.tables
            .iter()
            .flat_map(|t| t.values())
            .flatten()
            .flat_map(|l| l.args.iter().chain(std::iter::once(&l.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Context, Type};

    #[test]
    fn small_keys_are_inline() {
        let lists = ListStore::default();
        let key = ArgumentsKey::new(&[Value::Int(1), Value::Int(2)], &lists);
        assert!(!key.0.spilled());
        assert_eq!(key.len(), 2);
        assert!(ArgumentsKey::new(&[], &lists).is_empty());
    }

    #[test]
    fn equal_values_give_equal_keys() {
        let mut lists = ListStore::default();
        let a = lists.from_values(vec![Value::Int(1), Value::Int(2)]);
        let rest = lists.from_values(vec![Value::Int(2)]);
        let b = lists.cons(Value::Int(1), rest);
        assert_eq!(
            ArgumentsKey::new(&[Value::List(a)], &lists),
            ArgumentsKey::new(&[Value::List(b)], &lists)
        );
        assert_eq!(
            ArgumentsKey::new(&[Value::str("x")], &lists),
            ArgumentsKey::new(&[Value::str("x")], &lists)
        );
        assert_ne!(
            ArgumentsKey::new(&[Value::Int(1)], &lists),
            ArgumentsKey::new(&[Value::Bool(true)], &lists)
        );
        assert_ne!(
            ArgumentsKey::new(&[Value::Undef], &lists),
            ArgumentsKey::new(&[Value::Int(0)], &lists)
        );
    }

    #[test]
    fn lookup_with_borrowed_key() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "store".to_string());
        let f = spec.add_function(&mut ctx, "f", vec![Type::Int], Type::Int);
        let lists = ListStore::default();
        let mut store = FunctionStore::new(&spec);
        let args = vec![Value::Int(7)];
        store.set(&lists, f, ArgumentsKey::new(&args, &lists), args.clone(), Value::Int(49));
        let get = |store: &FunctionStore, v: i64| {
            store
                .get(&lists, f, &[v as u64], &[Value::Int(v)])
                .and_then(|v| v.as_int())
        };
        assert_eq!(get(&store, 7), Some(49));
        assert!(get(&store, 8).is_none());
        assert!(store.get(&lists, spec.program(), &[], &[]).is_none());
        // the argument and the value
        assert_eq!(store.values().count(), 2);

        store.set(&lists, f, ArgumentsKey::new(&args, &lists), args, Value::Int(50));
        assert_eq!(get(&store, 7), Some(50));
        assert_eq!(store.values().count(), 2);
    }

    #[test]
    fn colliding_keys_are_separate_locations() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "collide".to_string());
        let f = spec.add_function(&mut ctx, "f", vec![Type::Int], Type::Int);
        let lists = ListStore::default();
        let mut store = FunctionStore::new(&spec);
        let undef = vec![Value::Undef];
        let int = vec![Value::Int(UNDEF_HASH as i64)];
        let undef_key = ArgumentsKey::new(&undef, &lists);
        let int_key = ArgumentsKey::new(&int, &lists);
        assert_eq!(undef_key, int_key);

        store.set(&lists, f, undef_key.clone(), undef.clone(), Value::Int(5));
        assert!(store.get(&lists, f, int_key.as_slice(), &int).is_none());
        store.set(&lists, f, int_key.clone(), int.clone(), Value::Int(6));
        let read = |args: &[Value]| {
            store
                .get(&lists, f, undef_key.as_slice(), args)
                .and_then(|v| v.as_int())
        };
        assert_eq!(read(&undef), Some(5));
        assert_eq!(read(&int), Some(6));
    }
}
