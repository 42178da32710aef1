// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Persistent lists with a cheap append for lists that were created during the current
// step. Lists are stored as small node graphs in an arena:
//
// - Base: an element buffer. Its own handle sees the first `len` elements.
// - Slice: the elements `start..end` of a Base (results of `app` and `tail`)
// - Head: one value in front of another list (result of `cons`)
//
// Every handle has fixed bounds, so no handle ever observes a later change. The only
// mutation is `app` pushing behind the last element of a buffer of the current
// generation, and only through a handle whose view ends there. The old handle keeps its
// length, the result is a new Slice. All other appends copy.

use crate::sim::value::Value;
use std::num::NonZeroU32;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ListRef(NonZeroU32);

impl ListRef {
    fn from_index(index: usize) -> Self {
        ListRef(NonZeroU32::new(index as u32 + 1).unwrap())
    }

    fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(Debug, Clone)]
enum ListNode {
    Base { values: Vec<Value>, len: usize },
    Slice { base: ListRef, start: usize, end: usize },
    Head { value: Value, rest: ListRef },
}

#[derive(Debug, Clone)]
struct Slot {
    node: ListNode,
    generation: u32,
    marked: bool,
}

/// Permission to append in place to lists created during the current step.
/// Obtained from [`ListStore::begin_step`]; a token from an earlier step never matches
/// the current generation and thus always forces a copy.
#[derive(Debug)]
pub struct StepOwner {
    generation: u32,
}

#[derive(Debug, Default, Clone)]
pub struct ListStore {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    generation: u32,
}

impl ListStore {
    /// Starts a new generation. Lists created before this call are treated as shared and
    /// are never appended to in place again.
    pub fn begin_step(&mut self) -> StepOwner {
        self.generation += 1;
        StepOwner {
            generation: self.generation,
        }
    }

    pub fn empty(&mut self) -> ListRef {
        self.from_values(Vec::new())
    }

    pub fn from_values(&mut self, values: Vec<Value>) -> ListRef {
        let len = values.len();
        self.alloc(ListNode::Base { values, len })
    }

    /// New list with `value` in front of `list`. `list` is not modified.
    pub fn cons(&mut self, value: Value, list: ListRef) -> ListRef {
        self.alloc(ListNode::Head { value, rest: list })
    }

    /// List without its first element. The tail of an empty list is empty.
    pub fn tail(&mut self, list: ListRef) -> ListRef {
        let (base, start, end) = match self.node(list) {
            ListNode::Head { rest, .. } => return *rest,
            ListNode::Base { len, .. } => (list, 0, *len),
            ListNode::Slice { base, start, end } => (*base, *start, *end),
        };
        self.alloc(ListNode::Slice {
            base,
            start: (start + 1).min(end),
            end,
        })
    }

    /// Appends `value` to the end of `list`. `list` itself is never changed. Pushes into
    /// the underlying buffer when it belongs to the generation of `owner` and the view of
    /// `list` ends at the last element of the buffer, otherwise appends to a fresh copy.
    pub fn app(&mut self, owner: &StepOwner, list: ListRef, value: Value) -> ListRef {
        let view = match self.node(list) {
            ListNode::Base { len, .. } => Some((list, 0, *len)),
            ListNode::Slice { base, start, end } => Some((*base, *start, *end)),
            ListNode::Head { .. } => None,
        };
        if owner.generation == self.generation {
            if let Some((base, start, end)) = view {
                let slot = self.slot_mut(base);
                if slot.generation == owner.generation {
                    if let ListNode::Base { values, .. } = &mut slot.node {
                        if values.len() == end {
                            values.push(value);
                            return self.alloc(ListNode::Slice {
                                base,
                                start,
                                end: end + 1,
                            });
                        }
                    }
                }
            }
        }
        let mut values: Vec<Value> = self.iter(list).cloned().collect();
        values.push(value);
        self.from_values(values)
    }

    /// 1-based element access, `Undef` when out of range.
    pub fn nth(&self, list: ListRef, index: i64) -> Value {
        if index < 1 {
            return Value::Undef;
        }
        self.iter(list)
            .nth((index - 1) as usize)
            .cloned()
            .unwrap_or(Value::Undef)
    }

    pub fn len(&self, list: ListRef) -> usize {
        let mut count = 0;
        let mut current = list;
        loop {
            match self.node(current) {
                ListNode::Head { rest, .. } => {
                    count += 1;
                    current = *rest;
                }
                ListNode::Base { len, .. } => return count + len,
                ListNode::Slice { start, end, .. } => return count + (end - start),
            }
        }
    }

    pub fn is_empty(&self, list: ListRef) -> bool {
        self.len(list) == 0
    }

    /// First element, `Undef` for the empty list.
    pub fn peek(&self, list: ListRef) -> Value {
        self.iter(list).next().cloned().unwrap_or(Value::Undef)
    }

    /// Flat representation of `list`. A Base that sees its whole buffer is returned as is.
    pub fn collect(&mut self, list: ListRef) -> ListRef {
        match self.node(list) {
            ListNode::Base { values, len } if values.len() == *len => list,
            _ => {
                let values = self.iter(list).cloned().collect();
                self.from_values(values)
            }
        }
    }

    pub fn to_vec(&self, list: ListRef) -> Vec<Value> {
        self.iter(list).cloned().collect()
    }

    pub fn iter(&self, list: ListRef) -> ListIter<'_> {
        ListIter {
            store: self,
            cursor: Cursor::Node(list),
        }
    }

    /// Number of nodes currently allocated.
    pub fn live_nodes(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Frees every node that is not reachable from `roots`. Lists nested inside of list
    /// elements are followed.
    pub fn collect_garbage<'v>(&mut self, roots: impl IntoIterator<Item = &'v Value>) {
        let mut todo: Vec<ListRef> = roots.into_iter().filter_map(|v| v.as_list()).collect();
        while let Some(list) = todo.pop() {
            let slot = self.slot_mut(list);
            if slot.marked {
                continue;
            }
            slot.marked = true;
            match &slot.node {
                ListNode::Base { values, .. } => {
                    todo.extend(values.iter().filter_map(|v| v.as_list()));
                }
                ListNode::Slice { base, .. } => todo.push(*base),
                ListNode::Head { value, rest } => {
                    todo.extend(value.as_list());
                    todo.push(*rest);
                }
            }
        }

        for (index, entry) in self.slots.iter_mut().enumerate() {
            let keep = match entry {
                Some(slot) if slot.marked => {
                    slot.marked = false;
                    true
                }
                Some(_) => false,
                None => true,
            };
            if !keep {
                *entry = None;
                self.free.push(index);
            }
        }
    }

    fn alloc(&mut self, node: ListNode) -> ListRef {
        let slot = Slot {
            node,
            generation: self.generation,
            marked: false,
        };
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(slot);
            ListRef::from_index(index)
        } else {
            self.slots.push(Some(slot));
            ListRef::from_index(self.slots.len() - 1)
        }
    }

    fn slot(&self, list: ListRef) -> &Slot {
        self.slots[list.index()]
            .as_ref()
            .expect("list was freed while still referenced")
    }

    fn slot_mut(&mut self, list: ListRef) -> &mut Slot {
        self.slots[list.index()]
            .as_mut()
            .expect("list was freed while still referenced")
    }

    fn node(&self, list: ListRef) -> &ListNode {
        &self.slot(list).node
    }

    fn buffer(&self, base: ListRef) -> &[Value] {
        match self.node(base) {
            ListNode::Base { values, .. } => values,
            _ => unreachable!("slices always point at a Base"),
        }
    }
}

enum Cursor<'a> {
    Node(ListRef),
    Values(std::slice::Iter<'a, Value>),
}

/// Iterates the logical elements of a list, front to back.
pub struct ListIter<'a> {
    store: &'a ListStore,
    cursor: Cursor<'a>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        loop {
            match &mut self.cursor {
                Cursor::Values(values) => return values.next(),
                Cursor::Node(list) => match store.node(*list) {
                    ListNode::Head { value, rest } => {
                        self.cursor = Cursor::Node(*rest);
                        return Some(value);
                    }
                    ListNode::Base { values, len } => {
                        self.cursor = Cursor::Values(values[..*len].iter());
                    }
                    ListNode::Slice { base, start, end } => {
                        let values = &store.buffer(*base)[*start..*end];
                        self.cursor = Cursor::Values(values.iter());
                    }
                },
            }
        }
    }
}
