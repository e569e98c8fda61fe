//! Differential frame renderer.
//!
//! Compares the current frame against the previous one and emits only
//! the cells that changed, wrapped in a synchronized-output block so
//! the terminal applies the frame atomically. Changed cells that sit
//! next to each other on a row collapse into one cursor move plus a
//! run of glyphs; an unchanged row produces no output at all.
//!
//! The renderer writes to any `io::Write` sink. The app hands it
//! stdout; tests hand it a `Vec<u8>`.

use std::io::{self, Write};

use crate::types::Cell;

use super::ansi;
use super::buffer::FrameBuffer;
use super::capabilities::TermCaps;
use super::output::{CellEmitter, OutputBuffer};

pub struct DiffRenderer {
    output: OutputBuffer,
    emitter: CellEmitter,
    previous: Option<FrameBuffer>,
}

impl DiffRenderer {
    pub fn new(caps: TermCaps) -> Self {
        Self {
            output: OutputBuffer::new(),
            emitter: CellEmitter::new(caps),
            previous: None,
        }
    }

    /// Render a frame, emitting only changed cells.
    ///
    /// With no previous frame, or when the size changed since last
    /// time, every cell counts as changed. Returns true if anything
    /// was written.
    pub fn render<W: Write>(&mut self, frame: &FrameBuffer, sink: &mut W) -> io::Result<bool> {
        let mut has_changes = false;

        ansi::begin_sync(&mut self.output)?;
        // Clear attribute state left over from the previous frame's
        // last cell, then start tracking fresh.
        ansi::reset(&mut self.output)?;
        self.emitter.reset();

        let width = frame.width();
        let height = frame.height();
        let comparable = self
            .previous
            .as_ref()
            .filter(|prev| prev.width() == width && prev.height() == height);

        for y in 0..height {
            for x in 0..width {
                let Some(cell) = frame.get(x, y) else {
                    continue;
                };
                let changed = match comparable {
                    Some(prev) => match prev.get(x, y) {
                        Some(prev_cell) => !cells_equal(cell, prev_cell),
                        None => true,
                    },
                    None => true,
                };
                if changed {
                    has_changes = true;
                    self.emitter.emit(&mut self.output, x, y, cell);
                }
            }
        }

        ansi::end_sync(&mut self.output)?;
        self.output.flush_to(sink)?;
        self.previous = Some(frame.clone());
        Ok(has_changes)
    }

    /// Drop the previous frame so the next render repaints everything.
    ///
    /// Call after a resize or anything else that may have corrupted the
    /// screen behind our back.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// Cell equality for diffing.
#[inline]
fn cells_equal(a: &Cell, b: &Cell) -> bool {
    a.char == b.char && a.attrs == b.attrs && a.fg == b.fg && a.bg == b.bg
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attr, Rgba};

    fn render_to_vec(renderer: &mut DiffRenderer, frame: &FrameBuffer) -> Vec<u8> {
        let mut sink = Vec::new();
        renderer.render(frame, &mut sink).unwrap();
        sink
    }

    #[test]
    fn first_render_paints_everything() {
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut frame = FrameBuffer::new(4, 2);
        frame.draw_text(0, 0, "hi", Rgba::WHITE, Rgba::TRANSPARENT, Attr::NONE, None);

        let bytes = render_to_vec(&mut renderer, &frame);
        assert!(!bytes.is_empty());
        assert!(renderer.has_previous());
    }

    #[test]
    fn unchanged_frame_emits_only_framing() {
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut frame = FrameBuffer::new(6, 2);
        frame.draw_text(0, 0, "stable", Rgba::WHITE, Rgba::TRANSPARENT, Attr::NONE, None);

        render_to_vec(&mut renderer, &frame);
        let second = render_to_vec(&mut renderer, &frame);

        // Only the sync bracket and the leading reset remain.
        assert_eq!(second, b"\x1b[?2026h\x1b[0m\x1b[?2026l");
    }

    #[test]
    fn output_scales_with_changed_cells() {
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut frame = FrameBuffer::new(40, 10);
        frame.draw_text(0, 0, "baseline", Rgba::WHITE, Rgba::TRANSPARENT, Attr::NONE, None);
        render_to_vec(&mut renderer, &frame);

        // One changed cell.
        let mut one = frame.clone();
        one.set_cell(0, 5, 'x' as u32, Rgba::WHITE, Rgba::TRANSPARENT, Attr::NONE, None);
        let small = render_to_vec(&mut renderer, &one);

        // A whole changed row.
        let mut row = one.clone();
        row.draw_text(0, 9, "the quick brown fox jumps again", Rgba::WHITE, Rgba::TRANSPARENT, Attr::NONE, None);
        let large = render_to_vec(&mut renderer, &row);

        assert!(small.len() < large.len());
    }

    #[test]
    fn size_change_invalidates_diff() {
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let frame = FrameBuffer::new(4, 2);
        render_to_vec(&mut renderer, &frame);
        let repeat = render_to_vec(&mut renderer, &frame);

        let bigger = FrameBuffer::new(8, 4);
        let resized = render_to_vec(&mut renderer, &bigger);

        // Full repaint after resize dwarfs the no-op frame.
        assert!(resized.len() > repeat.len());
    }

    #[test]
    fn invalidate_forces_full_repaint() {
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut frame = FrameBuffer::new(10, 3);
        frame.draw_text(0, 1, "persist", Rgba::WHITE, Rgba::TRANSPARENT, Attr::NONE, None);

        let first = render_to_vec(&mut renderer, &frame);
        renderer.invalidate();
        assert!(!renderer.has_previous());
        let again = render_to_vec(&mut renderer, &frame);
        assert_eq!(first, again);
    }
}
