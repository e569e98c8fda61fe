//! Layout engine: text measurement and the flexbox solver.
//!
//! # Architecture
//!
//! [`solve`] consumes the immutable node tree plus a terminal size and
//! produces absolutely-positioned [`LayoutBox`]es:
//!
//! 1. Intrinsic pass (bottom-up) measures natural content sizes
//! 2. Distribute pass (top-down) resolves percentages, grow and shrink
//!    against the parent's final size and assigns screen rectangles
//!
//! Nothing here touches the reactive runtime or the terminal; the
//! solver is a pure function, so the same tree and size always produce
//! the same geometry. Text metrics are grapheme-aware and count display
//! cells, not bytes.

mod solver;
mod text;

pub use solver::{solve, Layout, LayoutBox};
pub use text::{measure_height, natural_width, shape_lines, string_width};

pub(crate) use solver::{border_edges, chrome};
