//! Fine-grained reactivity - signals, effects, memos, and the scheduler.
//!
//! The dependency graph is discovered, not declared: reading a signal
//! inside a running effect subscribes that effect to the cell, and every
//! run rebuilds the effect's dependency set from what it actually read.
//! Writes never run subscribers inline; they queue them, and the queue is
//! drained at a batching boundary (the render tick, or [`flush_sync`]).
//!
//! # Architecture
//!
//! ```text
//! signal.set(v) ──> subscribers marked dirty ──> scheduler queue
//!                                                    │ flush (once per tick)
//! effect re-run <── cleanup, fresh dependency capture ┘
//! ```
//!
//! All state lives in an explicit [`Runtime`]; see its docs for the
//! entering rules.

mod effect;
mod memo;
mod runtime;
mod signal;

pub use effect::{effect, on_cleanup, EffectHandle, IntoCleanup};
pub use memo::{memo, memo_with, Memo};
pub use runtime::{CellId, EffectId, Runtime};
pub use signal::{signal, Signal};

pub(crate) use runtime::{with_runtime, Cleanup, ComputeFn, RuntimeInner, MAX_FLUSH_ITERATIONS};

/// Drain the current runtime's scheduler queue until it settles.
///
/// The render loop calls this exactly once per tick; tests call it to
/// observe post-batch state.
pub fn flush_sync() {
    with_runtime(|rt| rt.flush());
}

/// Run `f` with dependency tracking suspended: signal reads inside do
/// not subscribe the surrounding effect.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.untracked(f))
}
