//! The reactive runtime: cell storage, effect records, and the scheduler.
//!
//! Everything observable lives in an explicitly constructed [`Runtime`].
//! There are no module-level globals holding state; a scoped stack of
//! "current" runtimes lets the free-function API ([`signal`](crate::reactive::signal),
//! [`effect`](crate::reactive::effect), ...) find the runtime it should
//! allocate into, and two runtimes never share anything. Tests construct
//! one runtime each and cannot contaminate one another.
//!
//! # Architecture
//!
//! - Cells: `{value, subscribers}` records in a generational arena.
//!   Reading inside a tracking scope subscribes the running effect.
//! - Effects: `{compute, cleanups, dependencies}` records. Dependencies
//!   are rebuilt from scratch on every run; stale ones are dropped.
//! - Scheduler: a FIFO of dirty effect ids, drained by [`Runtime::flush`].
//!   Writes enqueue, they never run subscribers inline, so re-entrant
//!   writes converge instead of recursing. A drain that exceeds
//!   [`MAX_FLUSH_ITERATIONS`] panics naming the offending effect and cell.

use std::any::Any;
use std::cell::{Cell as StdCell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::instance::arena::InstanceArena;

/// Upper bound on queue pops in one flush. Exceeding it means an effect
/// keeps writing something it transitively reads.
pub(crate) const MAX_FLUSH_ITERATIONS: u32 = 1000;

static NEXT_RUNTIME_ID: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static CURRENT: RefCell<Vec<Rc<RuntimeInner>>> = const { RefCell::new(Vec::new()) };
}

// =============================================================================
// Ids
// =============================================================================

/// Identity of one reactive cell within its runtime.
///
/// Generational: a released index reused for a new cell gets a bumped
/// generation, so stale handles are detected instead of reading the
/// wrong value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell #{}", self.index)
    }
}

/// Identity of one effect (or memo) within its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect #{}", self.index)
    }
}

// =============================================================================
// Records
// =============================================================================

struct CellRecord {
    value: Box<dyn Any>,
    /// Effects whose latest run read this cell.
    subscribers: Vec<EffectId>,
}

struct CellEntry {
    generation: u32,
    rec: Option<CellRecord>,
}

pub(crate) type Cleanup = Box<dyn FnOnce()>;
pub(crate) type ComputeFn = Rc<RefCell<dyn FnMut() -> Option<Cleanup>>>;

/// Placeholder value a memo's cache cell holds until its first
/// computation commits.
pub(crate) struct MemoPending;

pub(crate) enum EffectKind {
    /// Ordinary effect: each scheduler run clears dependencies, runs the
    /// compute closure under tracking, stores the returned cleanup.
    Plain,
    /// Cached computation: compute writes the cache cell itself (under an
    /// equality gate). `stale` collapses multiple notifications into one
    /// recompute per dirty cycle, whether pulled by a read or drained.
    Memo { stale: bool },
    /// Loop-owned marker: fires a notification closure instead of doing
    /// work of its own. Its dependency set is rebuilt externally around
    /// each root invocation via [`RuntimeInner::run_tracked`]; a drain
    /// that fires it leaves the set empty until the next invocation.
    External,
}

struct EffectRecord {
    compute: ComputeFn,
    cleanups: Vec<Cleanup>,
    /// Cells read during the latest run.
    deps: Vec<CellId>,
    queued: bool,
    kind: EffectKind,
}

struct EffectEntry {
    generation: u32,
    rec: Option<EffectRecord>,
}

// =============================================================================
// Runtime
// =============================================================================

/// One reactive world: cells, effects, scheduler queue, component
/// instances. Construct one per running application (or per test), enter
/// it, and every `signal`/`effect`/`memo` call inside the scope allocates
/// here.
///
/// # Example
///
/// ```
/// use glint_tui::reactive::{Runtime, signal, effect, flush_sync};
///
/// let rt = Runtime::new();
/// rt.enter(|| {
///     let count = signal(0);
///     let _e = effect(move || {
///         let _ = count.get();
///     });
///     count.set(1);
///     flush_sync();
/// });
/// ```
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
                cells: RefCell::new(Vec::new()),
                free_cells: RefCell::new(Vec::new()),
                effects: RefCell::new(Vec::new()),
                free_effects: RefCell::new(Vec::new()),
                observers: RefCell::new(Vec::new()),
                queue: RefCell::new(VecDeque::new()),
                flushing: StdCell::new(false),
                last_write: StdCell::new(None),
                instances: RefCell::new(InstanceArena::new()),
            }),
        }
    }

    /// Run `f` with this runtime current. Nestable; the previous current
    /// runtime is restored afterwards, even on panic.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = EnterGuard::push(self.inner.clone());
        f()
    }

    /// Drain the scheduler queue until no effect is pending.
    ///
    /// Equivalent to calling [`flush_sync`](crate::reactive::flush_sync)
    /// inside [`Runtime::enter`].
    pub fn flush(&self) {
        self.enter(|| self.inner.flush());
    }

    /// Whether any effect is waiting in the scheduler queue.
    pub fn has_pending(&self) -> bool {
        !self.inner.queue.borrow().is_empty()
    }

    pub(crate) fn inner(&self) -> &Rc<RuntimeInner> {
        &self.inner
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

struct EnterGuard;

impl EnterGuard {
    fn push(rt: Rc<RuntimeInner>) -> Self {
        CURRENT.with(|stack| stack.borrow_mut().push(rt));
        EnterGuard
    }
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Resolve the current runtime or panic with a usable message.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Rc<RuntimeInner>) -> R) -> R {
    CURRENT.with(|stack| {
        let stack = stack.borrow();
        let rt = stack
            .last()
            .unwrap_or_else(|| panic!("no reactive runtime is current; wrap this call in Runtime::enter"));
        let rt = rt.clone();
        drop(stack);
        f(&rt)
    })
}

// =============================================================================
// RuntimeInner
// =============================================================================

pub(crate) struct RuntimeInner {
    pub(crate) id: u32,
    cells: RefCell<Vec<CellEntry>>,
    free_cells: RefCell<Vec<u32>>,
    effects: RefCell<Vec<EffectEntry>>,
    free_effects: RefCell<Vec<u32>>,
    /// Tracking scopes. `None` frames are untracked regions.
    observers: RefCell<Vec<Option<EffectId>>>,
    queue: RefCell<VecDeque<EffectId>>,
    flushing: StdCell<bool>,
    /// Most recent notifying write, reported when the flush bound trips.
    last_write: StdCell<Option<CellId>>,
    pub(crate) instances: RefCell<InstanceArena>,
}

impl RuntimeInner {
    // -------------------------------------------------------------------------
    // Cells
    // -------------------------------------------------------------------------

    pub(crate) fn create_cell(&self, value: Box<dyn Any>) -> CellId {
        let rec = CellRecord {
            value,
            subscribers: Vec::new(),
        };
        let mut cells = self.cells.borrow_mut();
        if let Some(index) = self.free_cells.borrow_mut().pop() {
            let entry = &mut cells[index as usize];
            entry.rec = Some(rec);
            CellId {
                index,
                generation: entry.generation,
            }
        } else {
            cells.push(CellEntry { generation: 0, rec: Some(rec) });
            CellId {
                index: (cells.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Drop a cell's record and retire its index. Stale ids are ignored
    /// so a double release (instance teardown racing a manual dispose)
    /// stays harmless.
    pub(crate) fn release_cell(&self, id: CellId) {
        let mut cells = self.cells.borrow_mut();
        let Some(entry) = cells.get_mut(id.index as usize) else {
            return;
        };
        if entry.generation != id.generation || entry.rec.is_none() {
            return;
        }
        entry.rec = None;
        entry.generation += 1;
        self.free_cells.borrow_mut().push(id.index);
    }

    /// Tracked read: clones the value and subscribes the current observer.
    pub(crate) fn read_cell<T: Clone + 'static>(&self, id: CellId) -> T {
        let observer = self.current_observer();
        let mut cells = self.cells.borrow_mut();
        let rec = Self::cell_rec(&mut cells, id);
        if let Some(obs) = observer {
            if !rec.subscribers.contains(&obs) {
                rec.subscribers.push(obs);
            }
        }
        let value = Self::downcast::<T>(&rec.value, id);
        drop(cells);
        if let Some(obs) = observer {
            self.record_dep(obs, id);
        }
        value
    }

    /// Untracked read.
    pub(crate) fn peek_cell<T: Clone + 'static>(&self, id: CellId) -> T {
        let mut cells = self.cells.borrow_mut();
        let rec = Self::cell_rec(&mut cells, id);
        Self::downcast::<T>(&rec.value, id)
    }

    /// Write with an equality gate: subscribers are enqueued only when
    /// the value actually changed.
    pub(crate) fn write_cell<T: PartialEq + 'static>(&self, id: CellId, value: T) {
        let changed = {
            let mut cells = self.cells.borrow_mut();
            let rec = Self::cell_rec(&mut cells, id);
            let old = rec.value.downcast_ref::<T>().unwrap_or_else(|| {
                panic!("{id} written with a value of a different type")
            });
            if *old == value {
                false
            } else {
                rec.value = Box::new(value);
                true
            }
        };
        if changed {
            self.notify(id);
        }
    }

    /// Write without comparing; subscribers are always enqueued.
    pub(crate) fn write_cell_always<T: 'static>(&self, id: CellId, value: T) {
        {
            let mut cells = self.cells.borrow_mut();
            let rec = Self::cell_rec(&mut cells, id);
            debug_assert!(rec.value.is::<T>(), "{id} written with a value of a different type");
            rec.value = Box::new(value);
        }
        self.notify(id);
    }

    /// Mutate in place; subscribers are always enqueued.
    pub(crate) fn update_cell<T: 'static, R>(&self, id: CellId, f: impl FnOnce(&mut T) -> R) -> R {
        let out = {
            let mut cells = self.cells.borrow_mut();
            let rec = Self::cell_rec(&mut cells, id);
            let value = rec.value.downcast_mut::<T>().unwrap_or_else(|| {
                panic!("{id} updated with a closure for a different type")
            });
            f(value)
        };
        self.notify(id);
        out
    }

    /// Memo cache commit: replace under `eq`, notify on change. Never
    /// tracks: the memo's own computation is the thing being recorded,
    /// and it must not subscribe to its own cache.
    pub(crate) fn write_memo_cache<T: 'static>(
        &self,
        id: CellId,
        value: T,
        eq: &dyn Fn(&T, &T) -> bool,
    ) {
        let changed = {
            let mut cells = self.cells.borrow_mut();
            let rec = Self::cell_rec(&mut cells, id);
            if rec.value.is::<MemoPending>() {
                // First fill; nothing can have subscribed before this.
                rec.value = Box::new(value);
                false
            } else {
                let old = Self::downcast_ref_panic::<T>(&rec.value, id);
                if eq(old, &value) {
                    false
                } else {
                    rec.value = Box::new(value);
                    true
                }
            }
        };
        if changed {
            self.notify(id);
        }
    }

    fn cell_rec<'a>(cells: &'a mut [CellEntry], id: CellId) -> &'a mut CellRecord {
        let entry = cells
            .get_mut(id.index as usize)
            .unwrap_or_else(|| panic!("{id} does not exist in this runtime"));
        if entry.generation != id.generation {
            panic!("stale handle: {id} was destroyed (its owning instance is gone)");
        }
        entry
            .rec
            .as_mut()
            .unwrap_or_else(|| panic!("stale handle: {id} was destroyed (its owning instance is gone)"))
    }

    fn downcast<T: Clone + 'static>(value: &Box<dyn Any>, id: CellId) -> T {
        Self::downcast_ref_panic::<T>(value, id).clone()
    }

    fn downcast_ref_panic<T: 'static>(value: &Box<dyn Any>, id: CellId) -> &T {
        value
            .downcast_ref::<T>()
            .unwrap_or_else(|| panic!("{id} read as a different type than it stores"))
    }

    // -------------------------------------------------------------------------
    // Tracking
    // -------------------------------------------------------------------------

    pub(crate) fn current_observer(&self) -> Option<EffectId> {
        self.observers.borrow().last().copied().flatten()
    }

    pub(crate) fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.observers.borrow_mut().push(None);
        let out = f();
        self.observers.borrow_mut().pop();
        out
    }

    fn record_dep(&self, effect: EffectId, cell: CellId) {
        let mut effects = self.effects.borrow_mut();
        if let Some(rec) = Self::effect_rec(&mut effects, effect) {
            if !rec.deps.contains(&cell) {
                rec.deps.push(cell);
            }
        }
    }

    /// Run `f` as the tracking scope of `id` after dropping its previous
    /// dependency set. The invoke phase of the render loop uses this to
    /// make the whole component invocation the dependency footprint of
    /// the loop's external effect.
    pub(crate) fn run_tracked<R>(&self, id: EffectId, f: impl FnOnce() -> R) -> R {
        self.clear_deps(id);
        self.observers.borrow_mut().push(Some(id));
        let out = f();
        self.observers.borrow_mut().pop();
        out
    }

    // -------------------------------------------------------------------------
    // Effects
    // -------------------------------------------------------------------------

    pub(crate) fn create_effect(&self, compute: ComputeFn, kind: EffectKind) -> EffectId {
        let rec = EffectRecord {
            compute,
            cleanups: Vec::new(),
            deps: Vec::new(),
            queued: false,
            kind,
        };
        let mut effects = self.effects.borrow_mut();
        if let Some(index) = self.free_effects.borrow_mut().pop() {
            let entry = &mut effects[index as usize];
            entry.rec = Some(rec);
            EffectId {
                index,
                generation: entry.generation,
            }
        } else {
            effects.push(EffectEntry { generation: 0, rec: Some(rec) });
            EffectId {
                index: (effects.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Register an effect and run it once immediately to record its
    /// initial dependencies.
    pub(crate) fn spawn_effect(&self, compute: ComputeFn) -> EffectId {
        let id = self.create_effect(compute, EffectKind::Plain);
        self.run_plain_effect(id);
        id
    }

    /// Loop-owned dirty marker; never tracked by the scheduler itself.
    pub(crate) fn spawn_external_effect(&self, notify: impl FnMut() + 'static) -> EffectId {
        let mut notify = notify;
        let compute: ComputeFn = Rc::new(RefCell::new(move || {
            notify();
            None
        }));
        self.create_effect(compute, EffectKind::External)
    }

    pub(crate) fn spawn_memo(&self, compute: ComputeFn) -> EffectId {
        self.create_effect(compute, EffectKind::Memo { stale: false })
    }

    /// Append a cleanup to the effect currently computing, if any.
    pub(crate) fn push_cleanup(&self, cleanup: Cleanup) -> bool {
        let Some(observer) = self.current_observer() else {
            return false;
        };
        let mut effects = self.effects.borrow_mut();
        match Self::effect_rec(&mut effects, observer) {
            Some(rec) => {
                rec.cleanups.push(cleanup);
                true
            }
            None => false,
        }
    }

    /// Dispose: run cleanups, unsubscribe everywhere, retire the index.
    /// Idempotent; disposing twice (handle + owning instance) is fine.
    pub(crate) fn dispose_effect(&self, id: EffectId) {
        let rec = {
            let mut effects = self.effects.borrow_mut();
            let Some(entry) = effects.get_mut(id.index as usize) else {
                return;
            };
            if entry.generation != id.generation || entry.rec.is_none() {
                return;
            }
            entry.generation += 1;
            entry.rec.take()
        };
        let Some(rec) = rec else { return };
        self.free_effects.borrow_mut().push(id.index);
        self.unsubscribe(id, &rec.deps);
        // Cleanups never track, even when disposal happens inside some
        // other computation's scope.
        self.untracked(|| {
            for cleanup in rec.cleanups {
                cleanup();
            }
        });
    }

    fn effect_rec<'a>(effects: &'a mut [EffectEntry], id: EffectId) -> Option<&'a mut EffectRecord> {
        let entry = effects.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.rec.as_mut()
    }

    fn clear_deps(&self, id: EffectId) {
        let deps = {
            let mut effects = self.effects.borrow_mut();
            match Self::effect_rec(&mut effects, id) {
                Some(rec) => std::mem::take(&mut rec.deps),
                None => return,
            }
        };
        self.unsubscribe(id, &deps);
    }

    fn unsubscribe(&self, effect: EffectId, deps: &[CellId]) {
        let mut cells = self.cells.borrow_mut();
        for dep in deps {
            let Some(entry) = cells.get_mut(dep.index as usize) else {
                continue;
            };
            // The cell may already be gone; releases don't chase subscribers.
            if entry.generation != dep.generation {
                continue;
            }
            if let Some(rec) = entry.rec.as_mut() {
                rec.subscribers.retain(|s| *s != effect);
            }
        }
    }

    fn take_cleanups(&self, id: EffectId) -> Vec<Cleanup> {
        let mut effects = self.effects.borrow_mut();
        match Self::effect_rec(&mut effects, id) {
            Some(rec) => std::mem::take(&mut rec.cleanups),
            None => Vec::new(),
        }
    }

    /// One ordinary effect run: prior cleanups first, then a fresh
    /// tracked execution of the compute closure.
    fn run_plain_effect(&self, id: EffectId) {
        let cleanups = self.take_cleanups(id);
        self.untracked(|| {
            for cleanup in cleanups {
                cleanup();
            }
        });
        let compute = {
            let mut effects = self.effects.borrow_mut();
            match Self::effect_rec(&mut effects, id) {
                Some(rec) => rec.compute.clone(),
                None => return, // disposed while queued
            }
        };
        let cleanup = self.run_tracked(id, || (compute.borrow_mut())());
        if let Some(cleanup) = cleanup {
            let mut effects = self.effects.borrow_mut();
            if let Some(rec) = Self::effect_rec(&mut effects, id) {
                rec.cleanups.push(cleanup);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Memos
    // -------------------------------------------------------------------------

    /// Recompute a stale memo now. Reads pull through here so a memo
    /// observed mid-cycle is already fresh; the queued scheduler run then
    /// sees `stale == false` and skips.
    pub(crate) fn pull_memo(&self, id: EffectId) {
        {
            let observers = self.observers.borrow();
            if observers.iter().any(|o| *o == Some(id)) {
                panic!("{id} (memo) reads itself while computing");
            }
        }
        let compute = {
            let mut effects = self.effects.borrow_mut();
            let Some(rec) = Self::effect_rec(&mut effects, id) else {
                return;
            };
            match &mut rec.kind {
                EffectKind::Memo { stale } if *stale => {
                    *stale = false;
                    rec.compute.clone()
                }
                _ => return,
            }
        };
        let cleanups = self.take_cleanups(id);
        self.untracked(|| {
            for cleanup in cleanups {
                cleanup();
            }
        });
        // The closure writes its cache cell itself (under the memo's eq).
        let leftover = self.run_tracked(id, || (compute.borrow_mut())());
        debug_assert!(leftover.is_none());
    }

    pub(crate) fn mark_memo_stale(&self, id: EffectId) {
        let mut effects = self.effects.borrow_mut();
        if let Some(rec) = Self::effect_rec(&mut effects, id) {
            if let EffectKind::Memo { stale } = &mut rec.kind {
                *stale = true;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Scheduler
    // -------------------------------------------------------------------------

    /// Mark every subscriber of `id` dirty and queue its effect.
    fn notify(&self, id: CellId) {
        self.last_write.set(Some(id));
        let subscribers = {
            let mut cells = self.cells.borrow_mut();
            let rec = Self::cell_rec(&mut cells, id);
            rec.subscribers.clone()
        };
        for sub in subscribers {
            self.enqueue(sub);
        }
    }

    fn enqueue(&self, id: EffectId) {
        let mut effects = self.effects.borrow_mut();
        let Some(rec) = Self::effect_rec(&mut effects, id) else {
            return;
        };
        if let EffectKind::Memo { stale } = &mut rec.kind {
            *stale = true;
        }
        if rec.queued {
            return;
        }
        rec.queued = true;
        drop(effects);
        self.queue.borrow_mut().push_back(id);
    }

    /// Withdraw `id`'s pending queue entry without running it.
    ///
    /// The render loop acknowledges its external effect at tick start:
    /// the invocation about to run already observes everything the
    /// queued notification reported, so letting it fire at the drain
    /// would schedule one redundant tick.
    pub(crate) fn acknowledge(&self, id: EffectId) {
        let mut effects = self.effects.borrow_mut();
        if let Some(rec) = Self::effect_rec(&mut effects, id) {
            rec.queued = false;
        }
    }

    /// Drain the queue until it settles. Called exactly once per render
    /// tick by the loop, or explicitly by `flush_sync` in tests.
    ///
    /// Panics after [`MAX_FLUSH_ITERATIONS`] pops, naming the effect that
    /// was running and the cell whose write re-armed the queue.
    pub(crate) fn flush(&self) {
        if self.flushing.get() {
            return; // already draining further up the stack
        }
        self.flushing.set(true);
        let mut iterations: u32 = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(id) = next else { break };
            iterations += 1;
            if iterations > MAX_FLUSH_ITERATIONS {
                self.flushing.set(false);
                let cell = self
                    .last_write
                    .get()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "<unknown cell>".to_string());
                panic!(
                    "reactive update cycle did not settle after {MAX_FLUSH_ITERATIONS} \
                     effect runs; {id} keeps being re-queued by writes to {cell}"
                );
            }
            let kind_is_memo = {
                let mut effects = self.effects.borrow_mut();
                match Self::effect_rec(&mut effects, id) {
                    Some(rec) if rec.queued => {
                        rec.queued = false;
                        matches!(rec.kind, EffectKind::Memo { .. })
                    }
                    // Disposed, or acknowledged out of the queue since
                    // being pushed.
                    _ => continue,
                }
            };
            if kind_is_memo {
                self.pull_memo(id);
            } else {
                self.run_plain_effect(id);
            }
        }
        self.flushing.set(false);
    }
}

// =============================================================================
// Tests
// =============================================================================
