//! FrameBuffer and drawing primitives.
//!
//! The FrameBuffer is a 2D grid of Cells representing what should be on
//! the terminal. The compositor draws into it; the diff renderer reads
//! it. All drawing clips to the buffer bounds, and optionally to an
//! explicit `ClipRect`.
//!
//! # Design Decisions
//!
//! - **Flat storage**: `Vec<Cell>` with row-major indexing for cache
//!   efficiency.
//! - **Alpha blending**: translucent backgrounds blend with the cell
//!   already in place, so overlapping boxes composite instead of
//!   punching holes.
//! - **Wide characters**: CJK and emoji occupy two cells; the second
//!   carries the continuation marker (`char == 0`).

use unicode_width::UnicodeWidthChar;

use crate::types::{Attr, BorderSides, BorderStyle, Cell, ClipRect, Rgba};

/// A 2D buffer of terminal cells.
///
/// Flat storage with row-major indexing: `index = y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a new buffer filled with default cells.
    pub fn new(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::default(); size],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Full buffer bounds as a ClipRect.
    #[inline]
    pub fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Cell at (x, y), or None out of bounds.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Reset every cell to the default.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::default();
        }
    }

    /// Resize the buffer. Content is cleared, not preserved.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let size = width as usize * height as usize;
        self.cells.resize(size, Cell::default());
        self.clear();
    }

    // =========================================================================
    // Drawing Primitives
    // =========================================================================

    /// Set a single cell with optional clipping.
    ///
    /// Returns true if the cell was written.
    pub fn set_cell(
        &mut self,
        x: u16,
        y: u16,
        char: u32,
        fg: Rgba,
        bg: Rgba,
        attrs: Attr,
        clip: Option<&ClipRect>,
    ) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        if let Some(clip) = clip {
            if !clip.contains(x, y) {
                return false;
            }
        }

        let idx = self.index(x, y);
        let cell = &mut self.cells[idx];

        // Alpha blend translucent backgrounds against what is there.
        let blended_bg = if bg.is_opaque() || bg.is_terminal_default() || bg.is_ansi() {
            bg
        } else {
            Rgba::blend(bg, cell.bg)
        };

        cell.char = char;
        cell.fg = fg;
        cell.bg = blended_bg;
        cell.attrs = attrs;
        true
    }

    /// Fill a rectangle with a background color, wiping glyphs.
    pub fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        bg: Rgba,
        clip: Option<&ClipRect>,
    ) {
        let x1 = x;
        let y1 = y;
        let x2 = x.saturating_add(width).min(self.width);
        let y2 = y.saturating_add(height).min(self.height);

        let (x1, y1, x2, y2) = if let Some(clip) = clip {
            let cx2 = clip.x.saturating_add(clip.width);
            let cy2 = clip.y.saturating_add(clip.height);
            (x1.max(clip.x), y1.max(clip.y), x2.min(cx2), y2.min(cy2))
        } else {
            (x1, y1, x2, y2)
        };
        if x2 <= x1 || y2 <= y1 {
            return;
        }

        let is_opaque = bg.is_opaque() || bg.is_terminal_default() || bg.is_ansi();
        for row in y1..y2 {
            let start = self.index(x1, row);
            let end = self.index(x2, row);
            for cell in &mut self.cells[start..end] {
                if is_opaque {
                    cell.bg = bg;
                } else {
                    cell.bg = Rgba::blend(bg, cell.bg);
                }
                cell.char = b' ' as u32;
                cell.attrs = Attr::NONE;
            }
        }
    }

    /// Draw a single character.
    pub fn draw_char(
        &mut self,
        x: u16,
        y: u16,
        char: char,
        fg: Rgba,
        bg: Rgba,
        attrs: Attr,
        clip: Option<&ClipRect>,
    ) -> bool {
        self.set_cell(x, y, char as u32, fg, bg, attrs, clip)
    }

    /// Draw a single line of text starting at (x, y).
    ///
    /// Wide characters take two cells; the trailing cell gets the
    /// continuation marker so the emitter skips it. Returns the number
    /// of cells advanced.
    pub fn draw_text(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        fg: Rgba,
        bg: Rgba,
        attrs: Attr,
        clip: Option<&ClipRect>,
    ) -> u16 {
        let mut col = x;
        for ch in text.chars() {
            if col >= self.width {
                break;
            }
            let char_width = ch.width().unwrap_or(0);
            if char_width == 0 {
                continue;
            }

            if self.set_cell(col, y, ch as u32, fg, bg, attrs, clip) && char_width == 2 {
                // Mark the second half of a wide glyph.
                let cont = col + 1;
                if cont < self.width && clip.map_or(true, |c| c.contains(cont, y)) {
                    if let Some(next) = self.get_mut(cont, y) {
                        next.char = 0;
                        next.fg = fg;
                        if !bg.is_transparent() {
                            next.bg = Rgba::blend(bg, next.bg);
                        }
                        next.attrs = attrs;
                    }
                }
            }
            col += char_width as u16;
        }
        col.saturating_sub(x)
    }

    /// Draw a border on the selected sides of a rectangle.
    ///
    /// Corners where two drawn sides meet use the corner glyph; a corner
    /// touched by only one side continues that side's edge glyph.
    pub fn draw_border(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        style: BorderStyle,
        sides: BorderSides,
        color: Rgba,
        bg: Rgba,
        clip: Option<&ClipRect>,
    ) {
        if width < 2 || height < 2 || !style.is_visible() || sides.is_empty() {
            return;
        }
        let (horiz, vert, tl, tr, br, bl) = style.chars();
        let x2 = x + width - 1;
        let y2 = y + height - 1;

        let top = sides.contains(BorderSides::TOP);
        let right = sides.contains(BorderSides::RIGHT);
        let bottom = sides.contains(BorderSides::BOTTOM);
        let left = sides.contains(BorderSides::LEFT);

        if top {
            for col in (x + 1)..x2 {
                self.draw_char(col, y, horiz, color, bg, Attr::NONE, clip);
            }
        }
        if bottom {
            for col in (x + 1)..x2 {
                self.draw_char(col, y2, horiz, color, bg, Attr::NONE, clip);
            }
        }
        if left {
            for row in (y + 1)..y2 {
                self.draw_char(x, row, vert, color, bg, Attr::NONE, clip);
            }
        }
        if right {
            for row in (y + 1)..y2 {
                self.draw_char(x2, row, vert, color, bg, Attr::NONE, clip);
            }
        }

        let corner = |both: char, h_only: bool, v_only: bool| -> Option<char> {
            match (h_only, v_only) {
                (true, true) => Some(both),
                (true, false) => Some(horiz),
                (false, true) => Some(vert),
                (false, false) => None,
            }
        };
        if let Some(c) = corner(tl, top, left) {
            self.draw_char(x, y, c, color, bg, Attr::NONE, clip);
        }
        if let Some(c) = corner(tr, top, right) {
            self.draw_char(x2, y, c, color, bg, Attr::NONE, clip);
        }
        if let Some(c) = corner(br, bottom, right) {
            self.draw_char(x2, y2, c, color, bg, Attr::NONE, clip);
        }
        if let Some(c) = corner(bl, bottom, left) {
            self.draw_char(x, y2, c, color, bg, Attr::NONE, clip);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
