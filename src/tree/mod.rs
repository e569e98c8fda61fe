//! Declarative UI tree construction.
//!
//! Components call [`row`]/[`column`]/[`text`]/[`spacer`]/[`fragment`]
//! to produce an immutable [`UiNode`] snapshot per invocation. The tree
//! carries only data; layout and compositing interpret it.

mod node;

pub use node::{column, container, fragment, row, spacer, text, NodeKind, Style, UiNode};
