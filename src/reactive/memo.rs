//! Memos: cached derived values with equality-gated propagation.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use super::runtime::{with_runtime, CellId, EffectId, MemoPending, RuntimeInner};

/// Create a memo using `PartialEq` to decide whether the value changed.
///
/// The computation runs once immediately. Afterwards it recomputes at
/// most once per dirty cycle (when a dependency wrote) and notifies its
/// own subscribers only when the recomputed value differs from the cached
/// one.
///
/// # Example
///
/// ```
/// use glint_tui::reactive::{Runtime, signal, memo};
///
/// let rt = Runtime::new();
/// rt.enter(|| {
///     let n = signal(4);
///     let parity = memo(move || n.get() % 2);
///     assert_eq!(parity.get(), 0);
///     n.set(6); // parity unchanged: downstream effects stay quiet
/// });
/// ```
pub fn memo<T, F>(f: F) -> Memo<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    memo_with(f, |a: &T, b: &T| a == b)
}

/// Create a memo with a caller-supplied equality check.
pub fn memo_with<T, F, E>(f: F, eq: E) -> Memo<T>
where
    T: 'static,
    F: FnMut() -> T + 'static,
    E: Fn(&T, &T) -> bool + 'static,
{
    with_runtime(|rt| {
        let cell = rt.create_cell(Box::new(MemoPending));
        let mut f = f;
        let compute = Rc::new(RefCell::new(move || {
            let value = f();
            with_runtime(|rt| rt.write_memo_cache::<T>(cell, value, &eq));
            None
        }));
        let effect = rt.spawn_memo(compute);
        // Initial computation fills the cache and records dependencies.
        rt.mark_memo_stale(effect);
        rt.pull_memo(effect);
        Memo {
            rt: rt.id,
            effect,
            cell,
            _marker: PhantomData,
        }
    })
}

/// Handle to a cached derived value.
///
/// Reading subscribes the caller to the cache cell, so downstream
/// effects re-run only when the cached value actually changes.
pub struct Memo<T> {
    rt: u32,
    effect: EffectId,
    cell: CellId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Memo<T> {}

impl<T> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memo({})", self.effect)
    }
}

impl<T: 'static> Memo<T> {
    /// Rebuild a handle from stored ids. The caller is responsible for
    /// `T` matching what the cache cell holds; a mismatch panics on access.
    pub(crate) fn from_raw(rt: u32, effect: EffectId, cell: CellId) -> Self {
        Self {
            rt,
            effect,
            cell,
            _marker: PhantomData,
        }
    }

    fn with_rt<R>(&self, f: impl FnOnce(&Rc<RuntimeInner>) -> R) -> R {
        with_runtime(|rt| {
            if rt.id != self.rt {
                panic!("{} belongs to a different runtime", self.effect);
            }
            f(rt)
        })
    }

    /// Read the cached value, recomputing first if a dependency changed
    /// since the last computation. Subscribes the running computation.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with_rt(|rt| {
            rt.pull_memo(self.effect);
            rt.read_cell::<T>(self.cell)
        })
    }

    /// Read the cached value (refreshing if stale) without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.with_rt(|rt| {
            rt.pull_memo(self.effect);
            rt.peek_cell::<T>(self.cell)
        })
    }

    /// Stop recomputation and release the cache cell.
    pub fn dispose(&self) {
        self.with_rt(|rt| {
            rt.dispose_effect(self.effect);
            rt.release_cell(self.cell);
        });
    }

    pub(crate) fn effect_id(&self) -> EffectId {
        self.effect
    }

    pub(crate) fn cell_id(&self) -> CellId {
        self.cell
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::reactive::{effect, flush_sync, memo, memo_with, signal, Runtime};

    #[test]
    fn caches_until_dependency_changes() {
        let rt = Runtime::new();
        rt.enter(|| {
            let n = signal(2);
            let computes = Rc::new(Cell::new(0));
            let c = computes.clone();
            let doubled = memo(move || {
                c.set(c.get() + 1);
                n.get() * 2
            });
            assert_eq!(computes.get(), 1); // eager initial compute

            assert_eq!(doubled.get(), 4);
            assert_eq!(doubled.get(), 4);
            assert_eq!(computes.get(), 1); // repeated reads hit the cache

            n.set(3);
            assert_eq!(doubled.get(), 6); // lazy pull before flush
            assert_eq!(computes.get(), 2);

            flush_sync();
            assert_eq!(computes.get(), 2); // drain skips the already-pulled memo
        });
    }

    #[test]
    fn equality_gate_blocks_propagation() {
        let rt = Runtime::new();
        rt.enter(|| {
            let n = signal(4);
            let parity = memo(move || n.get() % 2);
            let runs = Rc::new(Cell::new(0));
            let r = runs.clone();
            let _watch = effect(move || {
                let _ = parity.get();
                r.set(r.get() + 1);
            });
            assert_eq!(runs.get(), 1);

            n.set(6); // parity still 0
            flush_sync();
            assert_eq!(runs.get(), 1);

            n.set(7); // parity flips to 1
            flush_sync();
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn custom_equality() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(String::from("Hello"));
            let lowered = memo_with(
                move || s.get(),
                |a: &String, b: &String| a.eq_ignore_ascii_case(b),
            );
            let runs = Rc::new(Cell::new(0));
            let r = runs.clone();
            let _watch = effect(move || {
                let _ = lowered.get();
                r.set(r.get() + 1);
            });

            s.set(String::from("HELLO")); // equal under the custom check
            flush_sync();
            assert_eq!(runs.get(), 1);
        });
    }

    #[test]
    fn chained_memos_settle_in_one_flush() {
        let rt = Runtime::new();
        rt.enter(|| {
            let n = signal(1);
            let doubled = memo(move || n.get() * 2);
            let quadrupled = memo(move || doubled.get() * 2);
            let observed = Rc::new(Cell::new(0));
            let o = observed.clone();
            let _watch = effect(move || o.set(quadrupled.get()));
            assert_eq!(observed.get(), 4);

            n.set(5);
            flush_sync();
            assert_eq!(observed.get(), 20);
        });
    }

    #[test]
    #[should_panic(expected = "reads itself")]
    fn self_referential_memo_panics() {
        let rt = Runtime::new();
        rt.enter(|| {
            let slot: Rc<Cell<Option<crate::reactive::Memo<i32>>>> = Rc::new(Cell::new(None));
            let s = slot.clone();
            let src = signal(0);
            let cyc = memo(move || {
                let _ = src.get();
                match s.get() {
                    Some(me) => me.get(), // reachable from the second run on
                    None => 0,
                }
            });
            slot.set(Some(cyc));
            src.set(1); // mark stale
            let _ = cyc.get(); // recompute now reads itself
        });
    }
}
