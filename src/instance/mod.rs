//! Component instances: persistent identity behind re-invoked functions.
//!
//! # Architecture
//!
//! ```text
//!   invoke_root(body)          one tick
//!   ├── begin_tick             stamp + enter root instance
//!   ├── body()
//!   │    ├── use_state/use_effect/use_memo   claim slots in call order
//!   │    └── component/keyed                 enter child instances
//!   ├── exit root              debug slot-count check
//!   └── sweep                  destroy what this tick never reached
//! ```
//!
//! Instances are keyed by (parent, position-or-key). Positional instances
//! are destroyed the first tick they go missing; keyed instances get one
//! tick of grace so sibling reorders don't lose state. Destruction
//! disposes the instance's effects and memos and releases its state
//! cells, children first.

pub(crate) mod arena;
mod slots;

pub use slots::{component, invoke_root, keyed, use_effect, use_memo, use_state};
pub(crate) use slots::destroy_root;
