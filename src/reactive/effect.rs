//! Effects: computations that re-run when their dependencies change.

use std::cell::RefCell;
use std::rc::Rc;

use super::runtime::{with_runtime, Cleanup, EffectId};

/// Convert an effect body's return value into an optional cleanup.
///
/// Returning `()` means no cleanup; returning a closure registers it to
/// run before the next re-run and on disposal.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl<F: FnOnce() + 'static> IntoCleanup for F {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(Box::new(self))
    }
}

/// Create an effect in the current runtime.
///
/// Runs `f` immediately, recording every cell read as a dependency. Any
/// later write to a dependency queues a re-run; each re-run first invokes
/// the cleanup the previous run returned, then rebuilds the dependency
/// set from the cells the new run actually reads.
///
/// # Example
///
/// ```
/// use glint_tui::reactive::{Runtime, signal, effect, flush_sync};
///
/// let rt = Runtime::new();
/// rt.enter(|| {
///     let name = signal(String::from("a"));
///     let handle = effect(move || {
///         let current = name.get();
///         move || drop(current) // cleanup for the previous subscription
///     });
///     name.set(String::from("b"));
///     flush_sync();
///     handle.dispose();
/// });
/// ```
pub fn effect<F, C>(f: F) -> EffectHandle
where
    F: FnMut() -> C + 'static,
    C: IntoCleanup,
{
    with_runtime(|rt| {
        let mut f = f;
        let compute = Rc::new(RefCell::new(move || f().into_cleanup()));
        let id = rt.spawn_effect(compute);
        EffectHandle { rt: rt.id, id }
    })
}

/// Register an extra cleanup on the effect or memo currently computing.
///
/// Panics when no computation is running; a cleanup with no owner would
/// never fire and the call site is wrong.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    with_runtime(|rt| {
        if !rt.push_cleanup(Box::new(f)) {
            panic!("on_cleanup called outside a running effect or memo");
        }
    });
}

/// Handle to a running effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectHandle {
    rt: u32,
    id: EffectId,
}

impl EffectHandle {
    /// Stop future runs, run pending cleanups, unsubscribe from all
    /// dependencies. Safe to call more than once.
    pub fn dispose(&self) {
        with_runtime(|rt| {
            if rt.id != self.rt {
                panic!("{} belongs to a different runtime", self.id);
            }
            rt.dispose_effect(self.id);
        });
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::reactive::{effect, flush_sync, on_cleanup, signal, Runtime};

    #[test]
    fn dependencies_are_rebuilt_each_run() {
        let rt = Runtime::new();
        rt.enter(|| {
            let use_first = signal(true);
            let first = signal(10);
            let second = signal(20);
            let observed = Rc::new(Cell::new(0));
            let runs = Rc::new(Cell::new(0));

            let (obs, rn) = (observed.clone(), runs.clone());
            let _e = effect(move || {
                let v = if use_first.get() { first.get() } else { second.get() };
                obs.set(v);
                rn.set(rn.get() + 1);
            });
            assert_eq!((observed.get(), runs.get()), (10, 1));

            // Writes to the untaken branch's cell must not re-run.
            second.set(21);
            flush_sync();
            assert_eq!(runs.get(), 1);

            use_first.set(false);
            flush_sync();
            assert_eq!((observed.get(), runs.get()), (21, 2));

            // The stale dependency was dropped on the latest run.
            first.set(11);
            flush_sync();
            assert_eq!(runs.get(), 2);

            second.set(22);
            flush_sync();
            assert_eq!((observed.get(), runs.get()), (22, 3));
        });
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(0);
            let events: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
            let ev = events.clone();
            let handle = effect(move || {
                let v = s.get();
                ev.borrow_mut().push(format!("run {v}"));
                let ev2 = ev.clone();
                move || ev2.borrow_mut().push(format!("cleanup {v}"))
            });

            s.set(1);
            flush_sync();
            handle.dispose();

            assert_eq!(
                *events.borrow(),
                vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
            );
        });
    }

    #[test]
    fn on_cleanup_registers_for_current_run() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(0);
            let events: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
            let ev = events.clone();
            let _e = effect(move || {
                let _ = s.get();
                ev.borrow_mut().push("run");
                let ev2 = ev.clone();
                on_cleanup(move || ev2.borrow_mut().push("extra"));
            });
            s.set(1);
            flush_sync();
            assert_eq!(*events.borrow(), vec!["run", "extra", "run"]);
        });
    }

    #[test]
    #[should_panic(expected = "outside a running effect")]
    fn on_cleanup_outside_effect_panics() {
        let rt = Runtime::new();
        rt.enter(|| on_cleanup(|| {}));
    }

    #[test]
    fn dispose_is_idempotent() {
        let rt = Runtime::new();
        rt.enter(|| {
            let s = signal(0);
            let runs = Rc::new(Cell::new(0));
            let rn = runs.clone();
            let handle = effect(move || {
                let _ = s.get();
                rn.set(rn.get() + 1);
            });
            handle.dispose();
            handle.dispose();
            s.set(1);
            flush_sync();
            assert_eq!(runs.get(), 1);
        });
    }

    #[test]
    fn nested_effect_creation_tracks_separately() {
        let rt = Runtime::new();
        rt.enter(|| {
            let outer_dep = signal(0);
            let inner_dep = signal(0);
            let outer_runs = Rc::new(Cell::new(0));
            let inner_runs = Rc::new(Cell::new(0));

            let (or, ir) = (outer_runs.clone(), inner_runs.clone());
            let _e = effect(move || {
                let _ = outer_dep.get();
                or.set(or.get() + 1);
                let ir2 = ir.clone();
                // Created once on the first run only; later runs of the
                // outer effect must not stack up inner duplicates here.
                if or.get() == 1 {
                    let _inner = effect(move || {
                        let _ = inner_dep.get();
                        ir2.set(ir2.get() + 1);
                    });
                }
            });
            assert_eq!((outer_runs.get(), inner_runs.get()), (1, 1));

            // Inner dep re-runs only the inner effect.
            inner_dep.set(1);
            flush_sync();
            assert_eq!((outer_runs.get(), inner_runs.get()), (1, 2));

            // Outer dep re-runs only the outer effect.
            outer_dep.set(1);
            flush_sync();
            assert_eq!((outer_runs.get(), inner_runs.get()), (2, 2));
        });
    }

    #[test]
    fn effect_writing_other_cell_converges_in_one_flush() {
        let rt = Runtime::new();
        rt.enter(|| {
            let a = signal(0);
            let b = signal(0);
            let b_runs = Rc::new(Cell::new(0));

            let _propagate = effect(move || {
                let v = a.get();
                b.set(v * 2);
            });
            let br = b_runs.clone();
            let observed = Rc::new(Cell::new(0));
            let obs = observed.clone();
            let _watch = effect(move || {
                obs.set(b.get());
                br.set(br.get() + 1);
            });

            a.set(3);
            flush_sync();
            assert_eq!(observed.get(), 6); // chained write settled in the same drain
            assert_eq!(b_runs.get(), 2);
        });
    }
}
