//! Compositor: solved layout boxes to frame cells.
//!
//! Walks the positioned box tree in document order and rasters each box
//! into the FrameBuffer. Later boxes paint over earlier ones, so a
//! box's absolute children (placed after its flow children by the
//! solver) naturally sit on top.
//!
//! Per box: background fill, then border, then text content, then
//! children. Every write clips to the chain of ancestor content
//! rectangles intersected with the screen, so an overflowing child
//! cannot paint outside its parent's content area; text additionally
//! clips to its own content rectangle so a pinned-height box truncates
//! instead of bleeding into siblings.
//!
//! Boxes carrying a style `id` leave a hit region behind for mouse
//! targeting. Regions are recorded in paint order, so the topmost match
//! is the last one.

use crate::layout::{chrome, shape_lines, Layout, LayoutBox};
use crate::tree::NodeKind;
use crate::types::{ClipRect, Rgba};

use super::buffer::FrameBuffer;
use super::capabilities::TermCaps;

// =============================================================================
// Hit regions
// =============================================================================

/// Screen rectangle owned by an id-carrying node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRegion {
    pub id: String,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl HitRegion {
    fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// All hit regions of a frame, in paint order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HitMap {
    regions: Vec<HitRegion>,
}

impl HitMap {
    /// The topmost id under (x, y), if any.
    pub fn hit(&self, x: u16, y: u16) -> Option<&str> {
        self.regions
            .iter()
            .rev()
            .find(|r| r.contains(x, y))
            .map(|r| r.id.as_str())
    }

    pub fn regions(&self) -> &[HitRegion] {
        &self.regions
    }
}

// =============================================================================
// Composition
// =============================================================================

/// Raster a solved layout into a fresh frame of the given size.
pub fn compose(layout: &Layout<'_>, caps: &TermCaps, width: u16, height: u16) -> (FrameBuffer, HitMap) {
    let mut frame = FrameBuffer::new(width, height);
    let mut hits = HitMap::default();
    let screen = frame.bounds();

    // Static band first, then the dynamic region over it.
    for fixed in &layout.statics {
        paint_box(&mut frame, caps, fixed, &screen, &mut hits);
    }
    paint_box(&mut frame, caps, &layout.root, &screen, &mut hits);

    (frame, hits)
}

fn paint_box(
    frame: &mut FrameBuffer,
    caps: &TermCaps,
    boxed: &LayoutBox<'_>,
    clip: &ClipRect,
    hits: &mut HitMap,
) {
    if boxed.width == 0 || boxed.height == 0 {
        return;
    }
    let style = &boxed.node.style;

    if style.bg.a > 0 && !style.bg.is_terminal_default() {
        frame.fill_rect(boxed.x, boxed.y, boxed.width, boxed.height, style.bg, Some(clip));
    }

    if let Some(id) = &style.id {
        hits.regions.push(HitRegion {
            id: id.clone(),
            x: boxed.x,
            y: boxed.y,
            width: boxed.width,
            height: boxed.height,
        });
    }

    if style.border.is_visible() && !style.border_sides.is_empty() {
        frame.draw_border(
            boxed.x,
            boxed.y,
            boxed.width,
            boxed.height,
            caps.border_style(style.border),
            style.border_sides,
            style.border_color,
            Rgba::TRANSPARENT,
            Some(clip),
        );
    }

    if let NodeKind::Text(content) = &boxed.node.kind {
        paint_text(frame, boxed, content, clip);
    }

    if boxed.children.is_empty() {
        return;
    }
    let inset = chrome(style);
    let content = ClipRect::new(
        boxed.x.saturating_add(inset.left),
        boxed.y.saturating_add(inset.top),
        boxed.width.saturating_sub(inset.horizontal()),
        boxed.height.saturating_sub(inset.vertical()),
    );
    // A box fully outside the visible chain contributes nothing below it.
    let Some(child_clip) = clip.intersect(&content) else {
        return;
    };
    for child in &boxed.children {
        paint_box(frame, caps, child, &child_clip, hits);
    }
}

fn paint_text(frame: &mut FrameBuffer, boxed: &LayoutBox<'_>, content: &str, clip: &ClipRect) {
    if content.is_empty() {
        return;
    }
    let style = &boxed.node.style;
    let inset = chrome(style);
    let cx = boxed.x.saturating_add(inset.left);
    let cy = boxed.y.saturating_add(inset.top);
    let cw = boxed.width.saturating_sub(inset.horizontal());
    let ch = boxed.height.saturating_sub(inset.vertical());
    if cw == 0 || ch == 0 {
        return;
    }

    let Some(text_clip) = clip.intersect(&ClipRect::new(cx, cy, cw, ch)) else {
        return;
    };
    let lines = shape_lines(content, style.wrap, cw);
    for (row, line) in lines.iter().enumerate().take(ch as usize) {
        frame.draw_text(
            cx,
            cy + row as u16,
            line,
            style.fg,
            Rgba::TRANSPARENT,
            style.attrs,
            Some(&text_clip),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
