//! Signals: observable cells with tracked reads and gated writes.

use std::marker::PhantomData;
use std::rc::Rc;

use super::runtime::{with_runtime, CellId, RuntimeInner};

/// Create a signal in the current runtime.
///
/// The returned handle is the cell's read/write accessor pair: `get`
/// subscribes the running effect, `set` notifies subscribers.
///
/// # Example
///
/// ```
/// use glint_tui::reactive::{Runtime, signal};
///
/// let rt = Runtime::new();
/// rt.enter(|| {
///     let count = signal(0);
///     assert_eq!(count.get(), 0);
///     count.set(5);
///     assert_eq!(count.get(), 5);
/// });
/// ```
pub fn signal<T: 'static>(initial: T) -> Signal<T> {
    with_runtime(|rt| Signal {
        rt: rt.id,
        id: rt.create_cell(Box::new(initial)),
        _marker: PhantomData,
    })
}

/// Handle to one reactive cell.
///
/// Cheap to copy; the value lives in the runtime, not the handle. A
/// handle only works inside the runtime that created it and panics if
/// used in another (or after its owning instance released the cell).
pub struct Signal<T> {
    rt: u32,
    id: CellId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signal({})", self.id)
    }
}

impl<T: 'static> Signal<T> {
    /// Rebuild a handle from stored ids. The caller is responsible for
    /// `T` matching what the cell holds; a mismatch panics on access.
    pub(crate) fn from_raw(rt: u32, id: CellId) -> Self {
        Self {
            rt,
            id,
            _marker: PhantomData,
        }
    }

    fn with_rt<R>(&self, f: impl FnOnce(&Rc<RuntimeInner>) -> R) -> R {
        with_runtime(|rt| {
            if rt.id != self.rt {
                panic!("{} belongs to a different runtime", self.id);
            }
            f(rt)
        })
    }

    /// Read the value. Inside an effect/memo computation this subscribes
    /// that computation to the cell.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with_rt(|rt| rt.read_cell::<T>(self.id))
    }

    /// Read without subscribing, regardless of tracking scope.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.with_rt(|rt| rt.peek_cell::<T>(self.id))
    }

    /// Write the value. Subscribers are enqueued on the scheduler only
    /// when the new value differs from the old one.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        self.with_rt(|rt| rt.write_cell::<T>(self.id, value));
    }

    /// Write without an equality check; subscribers are always enqueued.
    pub fn set_always(&self, value: T) {
        self.with_rt(|rt| rt.write_cell_always::<T>(self.id, value));
    }

    /// Mutate the value in place. Subscribers are always enqueued (there
    /// is no old value left to compare against).
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.with_rt(|rt| rt.update_cell::<T, R>(self.id, f))
    }

    /// The cell id, for diagnostics and ownership bookkeeping.
    pub(crate) fn id(&self) -> CellId {
        self.id
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::reactive::{effect, flush_sync, signal, untrack, Runtime};

    #[test]
    fn get_set_roundtrip() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(String::from("hello"));
            assert_eq!(s.get(), "hello");
            s.set(String::from("world"));
            assert_eq!(s.get(), "world");
        });
    }

    #[test]
    fn set_equal_value_does_not_notify() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(7);
            let runs = Rc::new(Cell::new(0));
            let runs2 = runs.clone();
            let _e = effect(move || {
                let _ = s.get();
                runs2.set(runs2.get() + 1);
            });
            assert_eq!(runs.get(), 1);

            s.set(7); // unchanged
            flush_sync();
            assert_eq!(runs.get(), 1);

            s.set(8);
            flush_sync();
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn set_always_notifies_unconditionally() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(7);
            let runs = Rc::new(Cell::new(0));
            let runs2 = runs.clone();
            let _e = effect(move || {
                let _ = s.get();
                runs2.set(runs2.get() + 1);
            });
            s.set_always(7);
            flush_sync();
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn update_mutates_in_place() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(vec![1, 2]);
            s.update(|v| v.push(3));
            assert_eq!(s.get(), vec![1, 2, 3]);
        });
    }

    #[test]
    fn peek_and_untrack_do_not_subscribe() {
        let rt = Runtime::new();
        rt.enter(|| {
            let tracked = signal(0);
            let ignored = signal(0);
            let runs = Rc::new(Cell::new(0));
            let runs2 = runs.clone();
            let _e = effect(move || {
                let _ = tracked.get();
                let _ = ignored.peek();
                let _ = untrack(|| ignored.get());
                runs2.set(runs2.get() + 1);
            });
            assert_eq!(runs.get(), 1);

            ignored.set(99);
            flush_sync();
            assert_eq!(runs.get(), 1); // peeked/untracked reads don't re-run

            tracked.set(1);
            flush_sync();
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn three_effects_one_write_each_runs_once() {
        let rt = Runtime::new();
        rt.enter(|| {
            let cell = signal(0);
            let seen: Rc<Cell<(i32, i32, i32)>> = Rc::new(Cell::new((-1, -1, -1)));
            let runs = Rc::new(Cell::new((0, 0, 0)));

            let (s1, r1) = (seen.clone(), runs.clone());
            let _e1 = effect(move || {
                let v = cell.get();
                s1.set((v, s1.get().1, s1.get().2));
                r1.set((r1.get().0 + 1, r1.get().1, r1.get().2));
            });
            let (s2, r2) = (seen.clone(), runs.clone());
            let _e2 = effect(move || {
                let v = cell.get();
                s2.set((s2.get().0, v, s2.get().2));
                r2.set((r2.get().0, r2.get().1 + 1, r2.get().2));
            });
            let (s3, r3) = (seen.clone(), runs.clone());
            let _e3 = effect(move || {
                let v = cell.get();
                s3.set((s3.get().0, s3.get().1, v));
                r3.set((r3.get().0, r3.get().1, r3.get().2 + 1));
            });

            assert_eq!(runs.get(), (1, 1, 1));

            cell.set(5);
            flush_sync();
            assert_eq!(runs.get(), (2, 2, 2)); // exactly once each
            assert_eq!(seen.get(), (5, 5, 5)); // all observed 5
        });
    }
}
