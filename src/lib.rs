//! # glint-tui
//!
//! Reactive terminal UI runtime for Rust.
//!
//! UI is a plain function from state to a node tree. Signals make the
//! state reactive: writing one marks its subscribers, the scheduler
//! batches the marks, and the render loop re-invokes the tree, lays it
//! out, and diffs the result against the previous frame so only changed
//! cells hit the wire.
//!
//! ## Architecture
//!
//! ```text
//! signals ──> invoke root ──> UiNode tree ──> layout ──> compose ──> diff ──> terminal
//!    ▲                                                                           │
//!    └────────────────────────── input events ◄──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (Rgba, Dimension, Cell, style enums)
//! - [`reactive`] - Signals, effects, memos, and the batching scheduler
//! - [`instance`] - Component instances with call-order state slots
//! - [`tree`] - Declarative node constructors
//! - [`layout`] - Flexbox solver and grapheme-aware text measurement
//! - [`render`] - Compositor, frame diffing, ANSI output
//! - [`input`] - Escape-sequence decoding, handler routing, focus
//! - [`pipeline`] - Terminal session control and the render loop

pub mod input;
pub mod instance;
pub mod layout;
pub mod pipeline;
pub mod reactive;
pub mod render;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use reactive::{
    effect, flush_sync, memo, memo_with, on_cleanup, signal, untrack, CellId, EffectHandle,
    EffectId, Memo, Runtime, Signal,
};

pub use instance::{component, invoke_root, keyed, use_effect, use_memo, use_state};

pub use tree::{column, container, fragment, row, spacer, text, NodeKind, Style, UiNode};

pub use layout::{
    measure_height, natural_width, shape_lines, solve, string_width, Layout, LayoutBox,
};

pub use render::{
    compose, ColorDepth, DiffRenderer, FrameBuffer, HitMap, HitRegion, OutputBuffer, TermCaps,
};

pub use input::{
    blur, focus, focus_next, focus_prev, focused, focused_signal, is_focused, on_input,
    on_input_blocking, on_input_scoped, register_focusable, remove_handler, unregister_focusable,
    HandlerId, InputEvent, InputParser, InputRouter, KeyCode, KeyEvent, KeyState, Modifiers,
    MouseButton, MouseEvent, MouseKind,
};

pub use pipeline::{exit, App, RunOptions};
