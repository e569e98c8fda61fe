//! Terminal input: byte-stream decoding, handler routing, focus.
//!
//! # Architecture
//!
//! ```text
//! raw bytes ──► InputParser ──► InputEvent ──► InputRouter
//!               (escape FSM,                   (blocking set, then
//!                paste accumulation)            most-recent-first)
//!                                                    │ unconsumed Tab
//!                                                    ▼
//!                                               focus ring
//! ```
//!
//! The parser tolerates sequences split across pipe reads; the router
//! owns handler registration and the registration-ordered focus ring.

mod dispatch;
mod events;
mod focus;
mod parser;

pub use dispatch::{
    blur, focus, focus_next, focus_prev, focused, focused_signal, is_focused, on_input,
    on_input_blocking, on_input_scoped, register_focusable, remove_handler, unregister_focusable,
    HandlerId, InputRouter,
};
pub use events::{
    InputEvent, KeyCode, KeyEvent, KeyState, Modifiers, MouseButton, MouseEvent, MouseKind,
};
pub use parser::InputParser;
