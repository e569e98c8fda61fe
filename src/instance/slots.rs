//! Hooks: slot-backed state, effects, and memos for component functions.
//!
//! A component function is re-invoked every tick, so nothing it declares
//! locally survives on its own. `use_state`, `use_effect` and `use_memo`
//! claim slots on the current instance in call order; the first
//! invocation fills a slot, later invocations hand back the same handle.
//! That contract is positional: declarations must run unconditionally,
//! in the same order, on every invocation. Conditional hooks shift every
//! later slot and corrupt state silently, which is why slot kinds are
//! checked on reuse and slot counts are checked per invocation in debug
//! builds.

use crate::reactive::{effect, memo, with_runtime, Memo, RuntimeInner, Signal};

use super::arena::{ChildKey, InstanceId, SlotRecord};

// =============================================================================
// Tick driver
// =============================================================================

/// Run one tick's root invocation: enter the root instance, run `body`,
/// then sweep instances the invocation no longer reached.
///
/// The render loop calls this once per tick with the application's root
/// component; headless tests call it directly.
pub fn invoke_root<R>(body: impl FnOnce() -> R) -> R {
    with_runtime(|rt| {
        {
            let mut arena = rt.instances.borrow_mut();
            // A panic in a previous tick may have left stale frames.
            arena.unwind_stack_to(0);
            arena.begin_tick();
        }
        let out = body();
        rt.instances.borrow_mut().exit_instance();
        sweep(rt);
        out
    })
}

/// Destroy every instance not reached by the tick that just finished.
fn sweep(rt: &RuntimeInner) {
    let doomed = rt.instances.borrow_mut().sweep_plan();
    if doomed.is_empty() {
        return;
    }
    for id in doomed {
        destroy_instance(rt, id);
    }
    log::trace!(
        "instance sweep: {} live after destruction",
        rt.instances.borrow().len()
    );
}

/// Tear down an instance subtree: dispose its effects and memos, release
/// its state cells, children before parents.
fn destroy_instance(rt: &RuntimeInner, id: InstanceId) {
    let slots = rt.instances.borrow_mut().remove_subtree(id);
    for slot in slots {
        match slot {
            SlotRecord::State(cell) => rt.release_cell(cell),
            SlotRecord::Effect(effect) => rt.dispose_effect(effect),
            SlotRecord::Memo { effect, cell } => {
                rt.dispose_effect(effect);
                rt.release_cell(cell);
            }
        }
    }
}

/// Destroy the whole instance tree. The render loop does this on exit so
/// every effect cleanup runs before the terminal is restored.
pub(crate) fn destroy_root(rt: &RuntimeInner) {
    let root = rt.instances.borrow().root();
    if let Some(root) = root {
        destroy_instance(rt, root);
    }
}

// =============================================================================
// Component scopes
// =============================================================================

/// Invoke `body` as a child component at the next call-order position.
///
/// The instance persists across ticks as long as a component is invoked
/// at the same position; skipping the call destroys it (and its state)
/// immediately, since positional absence is unambiguous.
pub fn component<R>(body: impl FnOnce() -> R) -> R {
    with_runtime(|rt| {
        let key = rt.instances.borrow_mut().next_position_key();
        enter_scoped(rt, key, body)
    })
}

/// Invoke `body` as a child component identified by `key` instead of by
/// position.
///
/// Keyed instances keep their state when siblings reorder. The price is
/// a one-tick destruction debounce: a keyed instance absent for one tick
/// might be mid-move, so it is destroyed only when still absent on the
/// next.
pub fn keyed<R>(key: impl Into<String>, body: impl FnOnce() -> R) -> R {
    with_runtime(|rt| enter_scoped(rt, ChildKey::Key(key.into()), body))
}

fn enter_scoped<R>(rt: &RuntimeInner, key: ChildKey, body: impl FnOnce() -> R) -> R {
    rt.instances.borrow_mut().enter_child(key);
    let out = body();
    rt.instances.borrow_mut().exit_instance();
    out
}

// =============================================================================
// Hooks
// =============================================================================

/// Instance-scoped state. `init` runs only when the slot is first
/// claimed; afterwards the same cell's handle is returned every
/// invocation. The cell is released when the instance is destroyed.
///
/// # Example
///
/// ```
/// use glint_tui::instance::{invoke_root, use_state};
/// use glint_tui::reactive::Runtime;
///
/// let rt = Runtime::new();
/// rt.enter(|| {
///     let first = invoke_root(|| {
///         let count = use_state(|| 0);
///         count.get()
///     });
///     assert_eq!(first, 0);
/// });
/// ```
pub fn use_state<T: 'static>(init: impl FnOnce() -> T) -> Signal<T> {
    with_runtime(|rt| {
        let (id, index, reused) = rt.instances.borrow_mut().claim_slot();
        if reused {
            let arena = rt.instances.borrow();
            match arena.reused_slot(id, index, "state") {
                SlotRecord::State(cell) => Signal::from_raw(rt.id, *cell),
                _ => unreachable!(),
            }
        } else {
            let cell = rt.create_cell(Box::new(init()));
            rt.instances
                .borrow_mut()
                .store_slot(id, index, SlotRecord::State(cell));
            Signal::from_raw(rt.id, cell)
        }
    })
}

/// Instance-scoped effect. Spawned on the first invocation, re-run by its
/// own dependency changes (not by re-invocation), disposed with the
/// instance. The body may return a cleanup closure, and may register more
/// via [`on_cleanup`](crate::reactive::on_cleanup); cleanups run before
/// each re-run and on destruction.
pub fn use_effect<F, C>(f: F)
where
    F: FnMut() -> C + 'static,
    C: crate::reactive::IntoCleanup,
{
    with_runtime(|rt| {
        let (id, index, reused) = rt.instances.borrow_mut().claim_slot();
        if reused {
            let arena = rt.instances.borrow();
            arena.reused_slot(id, index, "effect");
        } else {
            let handle = effect(f);
            rt.instances
                .borrow_mut()
                .store_slot(id, index, SlotRecord::Effect(handle.id()));
        }
    })
}

/// Instance-scoped memo. Computed on the first invocation, recomputed
/// when its dependencies change, disposed with the instance. Reading the
/// returned handle subscribes the reader to the cached value under the
/// memo's equality gate.
pub fn use_memo<T, F>(f: F) -> Memo<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    with_runtime(|rt| {
        let (id, index, reused) = rt.instances.borrow_mut().claim_slot();
        if reused {
            let arena = rt.instances.borrow();
            match arena.reused_slot(id, index, "memo") {
                SlotRecord::Memo { effect, cell } => Memo::from_raw(rt.id, *effect, *cell),
                _ => unreachable!(),
            }
        } else {
            let handle = memo(f);
            rt.instances.borrow_mut().store_slot(
                id,
                index,
                SlotRecord::Memo {
                    effect: handle.effect_id(),
                    cell: handle.cell_id(),
                },
            );
            handle
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
