//! Instance arena - persistent identity for component call-sites.
//!
//! Components are plain functions re-invoked every tick. What persists is
//! the Instance: one record per tree position, keyed by (parent instance,
//! position-or-key), holding the slot array their `use_*` declarations
//! claim in call order.
//!
//! # Lifecycle
//!
//! Each tick stamps every invoked instance with the tick number. The
//! sweep afterwards walks the tree: a positional child missing while its
//! parent ran is gone on purpose and is destroyed immediately; a keyed
//! child gets one tick of grace (reordering may move it between siblings)
//! and is destroyed when still absent the next tick. Destruction disposes
//! the instance's effects and memos and releases its state cells,
//! children first.

use std::collections::HashMap;
use std::fmt;

use crate::reactive::{CellId, EffectId};

// =============================================================================
// Ids and keys
// =============================================================================

/// Identity of one component instance within its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance #{}", self.index)
    }
}

/// How a child instance is identified under its parent.
///
/// Positional keys are the call-order counter; explicit keys opt into
/// reorder-stable identity (and the destruction debounce that requires).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ChildKey {
    Position(u32),
    Key(String),
}

impl ChildKey {
    fn is_keyed(&self) -> bool {
        matches!(self, Self::Key(_))
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(n) => write!(f, "position {n}"),
            Self::Key(k) => write!(f, "key {k:?}"),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One slot in an instance's call-order slot array.
pub(crate) enum SlotRecord {
    State(CellId),
    Effect(EffectId),
    Memo { effect: EffectId, cell: CellId },
}

impl SlotRecord {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Effect(_) => "effect",
            Self::Memo { .. } => "memo",
        }
    }
}

pub(crate) struct InstanceRecord {
    parent: Option<InstanceId>,
    children: HashMap<ChildKey, InstanceId>,
    slots: Vec<SlotRecord>,
    /// Next slot index; reset to zero when an invocation begins.
    cursor: usize,
    /// Slot count recorded by the first completed invocation.
    expected_slots: Option<usize>,
    /// Positional child counter; reset to zero when an invocation begins.
    next_child_position: u32,
    last_seen: u64,
    /// Keyed instance already missed one tick; destroy on the next miss.
    pending_retire: bool,
}

struct Entry {
    generation: u32,
    rec: Option<InstanceRecord>,
}

// =============================================================================
// Arena
// =============================================================================

/// Storage and invocation bookkeeping for all instances of one runtime.
pub(crate) struct InstanceArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    /// Invocation stack; `use_*` declarations claim slots on the top.
    stack: Vec<InstanceId>,
    root: Option<InstanceId>,
    tick: u64,
}

impl InstanceArena {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            stack: Vec::new(),
            root: None,
            tick: 0,
        }
    }

    fn alloc(&mut self, parent: Option<InstanceId>) -> InstanceId {
        let rec = InstanceRecord {
            parent,
            children: HashMap::new(),
            slots: Vec::new(),
            cursor: 0,
            expected_slots: None,
            next_child_position: 0,
            last_seen: self.tick,
            pending_retire: false,
        };
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.rec = Some(rec);
            InstanceId {
                index,
                generation: entry.generation,
            }
        } else {
            self.entries.push(Entry { generation: 0, rec: Some(rec) });
            InstanceId {
                index: (self.entries.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    fn rec(&self, id: InstanceId) -> Option<&InstanceRecord> {
        let entry = self.entries.get(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.rec.as_ref()
    }

    fn rec_mut(&mut self, id: InstanceId) -> Option<&mut InstanceRecord> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.rec.as_mut()
    }

    fn rec_mut_or_panic(&mut self, id: InstanceId) -> &mut InstanceRecord {
        self.rec_mut(id)
            .unwrap_or_else(|| panic!("{id} used after destruction"))
    }

    // -------------------------------------------------------------------------
    // Invocation
    // -------------------------------------------------------------------------

    /// Start a tick: bump the counter and enter the root instance.
    pub(crate) fn begin_tick(&mut self) -> InstanceId {
        self.tick += 1;
        let root = match self.root {
            Some(id) if self.rec(id).is_some() => id,
            _ => {
                let id = self.alloc(None);
                self.root = Some(id);
                id
            }
        };
        self.begin_invocation(root);
        self.stack.push(root);
        root
    }

    /// Enter a child instance at `key`, creating it on first sight.
    pub(crate) fn enter_child(&mut self, key: ChildKey) -> InstanceId {
        let parent = *self
            .stack
            .last()
            .expect("component invoked outside a tick");
        let existing = self
            .rec(parent)
            .and_then(|rec| rec.children.get(&key).copied());
        let id = match existing {
            Some(id) if self.rec(id).is_some() => {
                if self.rec(id).map(|r| r.last_seen) == Some(self.tick) {
                    panic!(
                        "{parent}: two siblings entered {key} in one invocation; \
                         keys must be unique among siblings"
                    );
                }
                id
            }
            _ => {
                let id = self.alloc(Some(parent));
                self.rec_mut_or_panic(parent).children.insert(key, id);
                id
            }
        };
        self.begin_invocation(id);
        self.stack.push(id);
        id
    }

    fn begin_invocation(&mut self, id: InstanceId) {
        let tick = self.tick;
        let rec = self.rec_mut_or_panic(id);
        rec.cursor = 0;
        rec.next_child_position = 0;
        rec.last_seen = tick;
        rec.pending_retire = false;
    }

    /// Leave the instance on top of the stack, verifying the slot-count
    /// precondition in debug builds.
    pub(crate) fn exit_instance(&mut self) {
        let id = self
            .stack
            .pop()
            .expect("instance stack underflow");
        let rec = self.rec_mut_or_panic(id);
        let claimed = rec.cursor;
        if cfg!(debug_assertions) {
            match rec.expected_slots {
                Some(expected) if expected != claimed => panic!(
                    "{id} claimed {claimed} slots this invocation but {expected} previously; \
                     state/effect declarations must run unconditionally, in the same order, \
                     every invocation"
                ),
                _ => {}
            }
        }
        rec.expected_slots = Some(claimed);
    }

    /// Next positional child key under the current instance.
    pub(crate) fn next_position_key(&mut self) -> ChildKey {
        let id = *self
            .stack
            .last()
            .expect("component invoked outside a tick");
        let rec = self.rec_mut_or_panic(id);
        let position = rec.next_child_position;
        rec.next_child_position += 1;
        ChildKey::Position(position)
    }

    // -------------------------------------------------------------------------
    // Slots
    // -------------------------------------------------------------------------

    /// Claim the next slot index on the current instance. Returns the
    /// instance, the index, and whether the slot already exists.
    pub(crate) fn claim_slot(&mut self) -> (InstanceId, usize, bool) {
        let id = *self
            .stack
            .last()
            .expect("hook called outside a component invocation");
        let rec = self.rec_mut_or_panic(id);
        let index = rec.cursor;
        rec.cursor += 1;
        (id, index, index < rec.slots.len())
    }

    /// Check a reused slot has the kind the call-site expects; a mismatch
    /// means declarations moved and alignment is corrupt.
    pub(crate) fn reused_slot(&self, id: InstanceId, index: usize, expect: &'static str) -> &SlotRecord {
        let rec = self
            .rec(id)
            .unwrap_or_else(|| panic!("{id} used after destruction"));
        let slot = &rec.slots[index];
        if slot.kind_name() != expect {
            panic!(
                "{id} slot {index} was {} on a previous invocation but {expect} now; \
                 state/effect declarations must run unconditionally, in the same order, \
                 every invocation",
                slot.kind_name()
            );
        }
        slot
    }

    pub(crate) fn store_slot(&mut self, id: InstanceId, index: usize, slot: SlotRecord) {
        let rec = self.rec_mut_or_panic(id);
        debug_assert_eq!(rec.slots.len(), index, "slots must be appended in claim order");
        rec.slots.push(slot);
    }

    // -------------------------------------------------------------------------
    // Sweep & destruction
    // -------------------------------------------------------------------------

    /// Decide the fate of every instance not invoked this tick. Returns
    /// the roots of the subtrees to destroy; mutates debounce flags.
    pub(crate) fn sweep_plan(&mut self) -> Vec<InstanceId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut doomed = Vec::new();
        self.plan_children(root, &mut doomed);
        doomed
    }

    fn plan_children(&mut self, id: InstanceId, doomed: &mut Vec<InstanceId>) {
        let tick = self.tick;
        let children: Vec<(ChildKey, InstanceId)> = match self.rec(id) {
            Some(rec) => rec.children.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            None => return,
        };
        for (key, child) in children {
            let Some(rec) = self.rec_mut(child) else {
                // Dead link: drop it from the parent's map.
                if let Some(parent_rec) = self.rec_mut(id) {
                    parent_rec.children.remove(&key);
                }
                continue;
            };
            if rec.last_seen == tick {
                self.plan_children(child, doomed);
            } else if key.is_keyed() && !rec.pending_retire {
                // One tick of grace: a reorder may bring it back.
                rec.pending_retire = true;
                // Descendants wait with it; their fate follows the parent's.
            } else {
                doomed.push(child);
            }
        }
    }

    /// Remove a subtree from the arena, returning its slots bottom-up so
    /// the caller can dispose effects and release cells without holding
    /// the arena borrow.
    pub(crate) fn remove_subtree(&mut self, id: InstanceId) -> Vec<SlotRecord> {
        let mut slots = Vec::new();
        self.collect_subtree(id, &mut slots);
        // Unlink from the parent so a later sweep won't revisit.
        if let Some(parent) = self.rec(id).and_then(|r| r.parent) {
            if let Some(parent_rec) = self.rec_mut(parent) {
                parent_rec.children.retain(|_, v| *v != id);
            }
        }
        self.release(id);
        if self.root == Some(id) {
            self.root = None;
        }
        slots
    }

    fn collect_subtree(&mut self, id: InstanceId, out: &mut Vec<SlotRecord>) {
        let children: Vec<InstanceId> = match self.rec(id) {
            Some(rec) => rec.children.values().copied().collect(),
            None => return,
        };
        // Children release before the parent.
        for child in children {
            self.collect_subtree(child, out);
            self.release(child);
        }
        if let Some(rec) = self.rec_mut(id) {
            out.append(&mut rec.slots);
        }
    }

    fn release(&mut self, id: InstanceId) {
        let Some(entry) = self.entries.get_mut(id.index as usize) else {
            return;
        };
        if entry.generation != id.generation || entry.rec.is_none() {
            return;
        }
        entry.rec = None;
        entry.generation += 1;
        self.free.push(id.index);
    }

    pub(crate) fn root(&self) -> Option<InstanceId> {
        self.root
    }

    /// Live instance count, for tests and diagnostics.
    pub(crate) fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.rec.is_some()).count()
    }

    pub(crate) fn unwind_stack_to(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }
}
