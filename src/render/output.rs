//! Output buffering and stateful cell emission.
//!
//! Terminal writes are expensive, so the frame accumulates into one
//! byte buffer and flushes in a single write. The emitter tracks what
//! the terminal is already showing (cursor position, colors, attrs) and
//! only emits escape codes for state that changed, which turns a run of
//! same-styled adjacent cells into one cursor move plus plain glyphs.

use std::io::{self, Write};

use crate::types::{Attr, Cell, Rgba};

use super::ansi;
use super::capabilities::TermCaps;

// =============================================================================
// OutputBuffer
// =============================================================================

/// Accumulates frame output for a single batched write.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_capacity(16384)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear without deallocating.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    #[inline]
    pub fn write_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        let s = c.encode_utf8(&mut buf);
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Write a unicode codepoint. Invalid codepoints are dropped.
    #[inline]
    pub fn write_codepoint(&mut self, cp: u32) {
        if let Some(c) = char::from_u32(cp) {
            self.write_char(c);
        }
    }

    /// Flush accumulated bytes to a writer and clear.
    pub fn flush_to<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        writer.write_all(&self.data)?;
        writer.flush()?;
        self.data.clear();
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(()) // buffering only; the real flush is flush_to
    }
}

// =============================================================================
// CellEmitter
// =============================================================================

/// Emits cells while tracking terminal state to minimize output.
///
/// Tracks the last cursor position, colors and attributes; a cell that
/// continues the previous one on the same row needs no cursor move, and
/// unchanged colors emit nothing. Colors quantize through the probed
/// capabilities before comparison, so two RGB values that collapse to
/// the same palette slot don't force a redundant escape.
#[derive(Debug)]
pub struct CellEmitter {
    caps: TermCaps,
    last_x: i32,
    last_y: i32,
    last_fg: Option<Rgba>,
    last_bg: Option<Rgba>,
    last_attrs: Attr,
}

impl CellEmitter {
    pub fn new(caps: TermCaps) -> Self {
        Self {
            caps,
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::NONE,
        }
    }

    /// Forget all tracked state. Call at the start of each frame.
    pub fn reset(&mut self) {
        self.last_x = -1;
        self.last_y = -1;
        self.last_fg = None;
        self.last_bg = None;
        self.last_attrs = Attr::NONE;
    }

    /// Emit a single cell, skipping whatever the terminal already has.
    pub fn emit(&mut self, output: &mut OutputBuffer, x: u16, y: u16, cell: &Cell) {
        // Continuation halves of wide glyphs: the head cell already
        // advanced the cursor past this column.
        if cell.char == 0 {
            self.last_x = x as i32;
            self.last_y = y as i32;
            return;
        }

        if y as i32 != self.last_y || x as i32 != self.last_x + 1 {
            ansi::cursor_to(output, x, y).ok();
        }

        if cell.attrs != self.last_attrs {
            // Attribute changes reset everything, so colors re-emit.
            ansi::reset(output).ok();
            if !cell.attrs.is_empty() {
                ansi::attrs(output, cell.attrs).ok();
            }
            self.last_fg = None;
            self.last_bg = None;
            self.last_attrs = cell.attrs;
        }

        let fg = self.caps.quantize(cell.fg);
        if self.last_fg != Some(fg) {
            ansi::fg(output, fg).ok();
            self.last_fg = Some(fg);
        }

        let bg = self.caps.quantize(cell.bg);
        if self.last_bg != Some(bg) {
            ansi::bg(output, bg).ok();
            self.last_bg = Some(bg);
        }

        output.write_codepoint(cell.char);
        self.last_x = x as i32;
        self.last_y = y as i32;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(ch: char, fg: Rgba, bg: Rgba) -> Cell {
        Cell {
            char: ch as u32,
            fg,
            bg,
            attrs: Attr::NONE,
        }
    }

    #[test]
    fn output_buffer_accumulates_and_flushes() {
        let mut buf = OutputBuffer::new();
        buf.write_str("hello");
        buf.write_char(' ');
        buf.write_str("world");
        assert_eq!(buf.as_bytes(), b"hello world");

        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"hello world");
        assert!(buf.is_empty());
    }

    #[test]
    fn sequential_cells_skip_cursor_moves() {
        let mut emitter = CellEmitter::new(TermCaps::default());
        let mut output = OutputBuffer::new();
        let c = cell('A', Rgba::WHITE, Rgba::BLACK);

        emitter.emit(&mut output, 0, 0, &c);
        let first_len = output.len();

        output.clear();
        emitter.emit(&mut output, 1, 0, &c);
        assert!(
            output.len() < first_len,
            "sequential cell should be cursor-move-free and color-free"
        );
        assert_eq!(output.as_bytes(), b"A");
    }

    #[test]
    fn same_colors_skip_color_codes() {
        let mut emitter = CellEmitter::new(TermCaps::default());
        let mut output = OutputBuffer::new();
        let c = cell('X', Rgba::rgb(255, 0, 0), Rgba::rgb(0, 0, 255));

        emitter.emit(&mut output, 0, 0, &c);
        let first_len = output.len();

        // Jump to a new column: cursor move yes, colors no.
        output.clear();
        emitter.emit(&mut output, 5, 0, &c);
        assert!(output.len() < first_len);
        let bytes = output.as_bytes();
        assert!(!bytes.windows(4).any(|w| w == b"38;2"), "fg re-emitted");
    }

    #[test]
    fn continuation_cells_emit_nothing() {
        let mut emitter = CellEmitter::new(TermCaps::default());
        let mut output = OutputBuffer::new();
        let cont = Cell {
            char: 0,
            fg: Rgba::WHITE,
            bg: Rgba::BLACK,
            attrs: Attr::NONE,
        };
        emitter.emit(&mut output, 0, 0, &cont);
        assert!(output.is_empty());
    }

    #[test]
    fn quantized_twins_do_not_thrash_colors() {
        use super::super::capabilities::ColorDepth;
        let caps = TermCaps {
            unicode: true,
            color: ColorDepth::Ansi256,
        };
        let mut emitter = CellEmitter::new(caps);
        let mut output = OutputBuffer::new();

        // Two slightly different RGB values that land on the same
        // palette slot: the second emits no color change.
        emitter.emit(&mut output, 0, 0, &cell('a', Rgba::rgb(255, 0, 0), Rgba::BLACK));
        output.clear();
        emitter.emit(&mut output, 1, 0, &cell('b', Rgba::rgb(254, 1, 0), Rgba::BLACK));
        assert_eq!(output.as_bytes(), b"b");
    }
}
