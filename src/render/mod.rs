//! Rendering: compositor, frame diffing, and terminal output.
//!
//! # Pipeline
//!
//! ```text
//! Layout boxes --compose--> FrameBuffer --diff--> ANSI bytes --> sink
//! ```
//!
//! The compositor rasters positioned boxes into cells. The diff
//! renderer compares frames and emits escape sequences only for the
//! cells that changed, so steady-state frames cost almost nothing on
//! the wire. Capabilities are probed once and decide border glyphs and
//! color depth for the whole session.

pub mod ansi;

mod buffer;
mod capabilities;
mod compositor;
mod diff;
mod output;

pub use buffer::FrameBuffer;
pub use capabilities::{ColorDepth, TermCaps};
pub use compositor::{compose, HitMap, HitRegion};
pub use diff::DiffRenderer;
pub use output::{CellEmitter, OutputBuffer};
