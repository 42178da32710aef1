// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Buffers the writes of one macro step. Layers are pushed when entering a block whose kind
// differs from the current context: even pseudostates are sequential, odd ones parallel.

use crate::error::{ExecError, ExecErrorKind, Result};
use crate::ir::{FunctionId, Span};
use crate::sim::list::ListStore;
use crate::sim::state::{args_equal, ArgumentsKey};
use crate::sim::value::{values_equal, Value};
use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct Update {
    pub function: FunctionId,
    pub key: ArgumentsKey,
    pub args: Vec<Value>,
    pub value: Value,
    pub span: Span,
    /// Pseudostate the update currently belongs to.
    pub layer: usize,
}

type Layer = IndexMap<(FunctionId, ArgumentsKey), Update>;

#[derive(Debug, Clone)]
pub struct UpdateSet {
    layers: Vec<Layer>,
}

impl Default for UpdateSet {
    fn default() -> Self {
        Self {
            layers: vec![Layer::new()],
        }
    }
}

fn is_parallel(pseudostate: usize) -> bool {
    pseudostate % 2 == 1
}

impl UpdateSet {
    /// Current fork depth.
    pub fn pseudostate(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn in_parallel(&self) -> bool {
        is_parallel(self.pseudostate())
    }

    /// Enters a `par` block. Returns whether a new layer was pushed, which has to be handed
    /// to the matching [`UpdateSet::merge`].
    pub fn fork_parallel(&mut self) -> bool {
        if self.in_parallel() {
            false
        } else {
            self.push_layer();
            true
        }
    }

    /// Enters a `seq` block, see [`UpdateSet::fork_parallel`].
    pub fn fork_sequential(&mut self) -> bool {
        if self.in_parallel() {
            self.push_layer();
            true
        } else {
            false
        }
    }

    fn push_layer(&mut self) {
        self.layers.push(Layer::new());
        trace!("fork to pseudostate {}", self.pseudostate());
    }

    pub fn top_is_empty(&self) -> bool {
        self.layers.last().map_or(true, |l| l.is_empty())
    }

    /// Records a write in the top layer.
    pub fn add(
        &mut self,
        lists: &ListStore,
        function: FunctionId,
        args: Vec<Value>,
        value: Value,
        span: Span,
    ) -> Result<()> {
        let key = ArgumentsKey::new(&args, lists);
        let layer = self.pseudostate();
        let parallel = self.in_parallel();
        let top = self.layers.last_mut().expect("layer 0 is never popped");
        let update = Update {
            function,
            key: key.clone(),
            args,
            value,
            span,
            layer,
        };
        match top.entry((function, key)) {
            Entry::Vacant(entry) => {
                entry.insert(update);
                Ok(())
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if parallel {
                    if values_equal(lists, &existing.value, &update.value) {
                        Ok(())
                    } else {
                        Err(conflict(existing, &update, "conflicting updates in parallel block"))
                    }
                } else if args_equal(lists, &existing.args, &update.args) {
                    *existing = update;
                    Ok(())
                } else {
                    Err(conflict(existing, &update, "updates collide on their storage key"))
                }
            }
        }
    }

    /// Leaves a block. Pops the top layer into its parent if `forked` is set.
    pub fn merge(&mut self, lists: &ListStore, forked: bool) -> Result<()> {
        let child_parallel = self.in_parallel();
        self.merge_layer(lists, forked, child_parallel)
    }

    /// Ends one round of `iterate`. Rounds follow each other, so the parallel layer of a
    /// round overrides what earlier rounds wrote instead of conflicting with it.
    pub fn merge_iteration(&mut self, lists: &ListStore, forked: bool) -> Result<()> {
        self.merge_layer(lists, forked, false)
    }

    fn merge_layer(&mut self, lists: &ListStore, forked: bool, child_parallel: bool) -> Result<()> {
        if !forked {
            return Ok(());
        }
        let Some(child) = self.layers.pop() else {
            return Ok(());
        };
        let depth = self.pseudostate();
        trace!("merge {} updates into pseudostate {depth}", child.len());
        let parent = self.layers.last_mut().expect("layer 0 is never popped");
        for (key, mut update) in child {
            update.layer = depth;
            match parent.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(update);
                }
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    if child_parallel {
                        if !values_equal(lists, &existing.value, &update.value) {
                            return Err(conflict(
                                existing,
                                &update,
                                "conflicting updates in parallel block",
                            ));
                        }
                    } else if args_equal(lists, &existing.args, &update.args) {
                        *existing = update;
                    } else {
                        return Err(conflict(
                            existing,
                            &update,
                            "updates collide on their storage key",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Value visible to reads: the newest pending write of an enclosing sequential layer.
    /// Writes of parallel layers only become visible once merged.
    pub fn lookup(
        &self,
        lists: &ListStore,
        function: FunctionId,
        key: &ArgumentsKey,
        args: &[Value],
    ) -> Option<&Value> {
        let probe = (function, key.clone());
        self.layers
            .iter()
            .enumerate()
            .rev()
            .filter(|(depth, _)| !is_parallel(*depth))
            .find_map(|(_, layer)| {
                layer
                    .get(&probe)
                    .filter(|u| args_equal(lists, &u.args, args))
            })
            .map(|u| &u.value)
    }

    /// Number of pending updates in all layers.
    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops everything, used after an error aborted a step.
    pub fn clear(&mut self) {
        self.layers.truncate(1);
        self.layers[0].clear();
    }

    /// Removes the updates of a completed step, in the order in which they were recorded.
    pub fn take(&mut self) -> Vec<Update> {
        debug_assert_eq!(self.pseudostate(), 0, "all blocks need to be merged");
        self.layers.truncate(1);
        std::mem::take(&mut self.layers[0]).into_values().collect()
    }
}

fn conflict(existing: &Update, update: &Update, detail: &str) -> ExecError {
    warn!(
        "conflict at pseudostate {}: {detail}",
        update.layer.max(existing.layer)
    );
    ExecError::new(ExecErrorKind::Conflict, update.span, detail).with_other(existing.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::UNDEF_HASH;

    fn f() -> FunctionId {
        FunctionId::from_index(1)
    }

    fn write(set: &mut UpdateSet, lists: &ListStore, arg: i64, value: i64) -> Result<()> {
        set.add(lists, f(), vec![Value::Int(arg)], Value::Int(value), Span::new(arg as u32, 0))
    }

    fn read(set: &UpdateSet, lists: &ListStore, arg: i64) -> Option<i64> {
        let args = [Value::Int(arg)];
        let key = ArgumentsKey::new(&args, lists);
        set.lookup(lists, f(), &key, &args).and_then(|v| v.as_int())
    }

    #[test]
    fn pseudostate_parity() {
        let mut set = UpdateSet::default();
        assert_eq!(set.pseudostate(), 0);
        assert!(!set.fork_sequential());
        assert!(set.fork_parallel());
        assert_eq!(set.pseudostate(), 1);
        // nested par flattens
        assert!(!set.fork_parallel());
        assert!(set.fork_sequential());
        assert_eq!(set.pseudostate(), 2);
        let lists = ListStore::default();
        set.merge(&lists, true).unwrap();
        set.merge(&lists, false).unwrap();
        set.merge(&lists, true).unwrap();
        set.merge(&lists, false).unwrap();
        assert_eq!(set.pseudostate(), 0);
    }

    #[test]
    fn duplicate_parallel_writes() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        let forked = set.fork_parallel();
        write(&mut set, &lists, 1, 5).unwrap();
        write(&mut set, &lists, 1, 5).unwrap();
        let err = write(&mut set, &lists, 1, 6).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::Conflict);
        set.merge(&lists, forked).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn sibling_parallel_blocks() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        // seq { par { f(1) := 1 } par { f(1) := 1 } }
        for _ in 0..2 {
            let forked = set.fork_parallel();
            write(&mut set, &lists, 1, 1).unwrap();
            set.merge(&lists, forked).unwrap();
        }
        assert_eq!(read(&set, &lists, 1), Some(1));

        // the parent already holds f(1) = 1 and the par block disagrees
        let forked = set.fork_parallel();
        write(&mut set, &lists, 1, 2).unwrap();
        let err = set.merge(&lists, forked).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::Conflict);
        assert_eq!(err.other.map(|s| s.start), Some(1));
    }

    #[test]
    fn later_sequential_write_wins() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        let par = set.fork_parallel();
        let seq = set.fork_sequential();
        write(&mut set, &lists, 1, 1).unwrap();
        assert_eq!(read(&set, &lists, 1), Some(1));
        write(&mut set, &lists, 1, 2).unwrap();
        assert_eq!(read(&set, &lists, 1), Some(2));
        set.merge(&lists, seq).unwrap();
        set.merge(&lists, par).unwrap();
        let updates = set.take();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value.as_int(), Some(2));
        assert_eq!(updates[0].layer, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn sequential_child_overrides_parallel_parent() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        // par { f(1) := 1  seq { f(1) := 2 } }
        let par = set.fork_parallel();
        write(&mut set, &lists, 1, 1).unwrap();
        let seq = set.fork_sequential();
        write(&mut set, &lists, 1, 2).unwrap();
        set.merge(&lists, seq).unwrap();
        set.merge(&lists, par).unwrap();
        assert_eq!(read(&set, &lists, 1), Some(2));
    }

    #[test]
    fn parallel_layer_disagreeing_with_parent() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        // f(1) := 1; par { seq { f(1) := 2 } }
        write(&mut set, &lists, 1, 1).unwrap();
        let par = set.fork_parallel();
        let seq = set.fork_sequential();
        write(&mut set, &lists, 1, 2).unwrap();
        set.merge(&lists, seq).unwrap();
        // the parallel layer is not visible yet, the sequential base still reads 1
        assert_eq!(read(&set, &lists, 1), Some(1));
        let err = set.merge(&lists, par).unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::Conflict);
    }

    #[test]
    fn colliding_keys_with_different_arguments() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        // an integer that hashes to the same key as undef
        let collision = UNDEF_HASH as i64;
        set.add(&lists, f(), vec![Value::Undef], Value::Int(1), Span::default())
            .unwrap();
        let err = set
            .add(&lists, f(), vec![Value::Int(collision)], Value::Int(2), Span::default())
            .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::Conflict);
        // a read of the colliding location does not see the write to f(undef)
        assert_eq!(read(&set, &lists, collision), None);
    }

    #[test]
    fn reads_skip_unmerged_parallel_layers() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        let forked = set.fork_parallel();
        write(&mut set, &lists, 3, 9).unwrap();
        assert_eq!(read(&set, &lists, 3), None);
        set.merge(&lists, forked).unwrap();
        assert_eq!(read(&set, &lists, 3), Some(9));
    }

    #[test]
    fn iteration_layers() {
        let lists = ListStore::default();
        let mut set = UpdateSet::default();
        // par { iterate { ... } }: the iteration runs in a sequential layer and every round
        // gets its own parallel layer on top
        let outer = set.fork_parallel();
        let seq = set.fork_sequential();
        for round in 0..3 {
            let par = set.fork_parallel();
            assert!(par);
            assert!(set.top_is_empty());
            if round < 2 {
                write(&mut set, &lists, 1, round).unwrap();
                assert!(!set.top_is_empty());
            }
            set.merge_iteration(&lists, par).unwrap();
        }
        assert_eq!(read(&set, &lists, 1), Some(1));
        set.merge(&lists, seq).unwrap();
        set.merge(&lists, outer).unwrap();
        assert_eq!(set.len(), 1);
    }
}
