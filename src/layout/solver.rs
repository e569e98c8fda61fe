//! Flexbox layout solver.
//!
//! # Algorithm
//!
//! Two passes per container:
//!
//! 1. **Intrinsic** (bottom-up): text leaves measure their content under
//!    the wrap mode, containers sum children on the main axis and take
//!    the max on the cross axis. Percentages contribute nothing here.
//! 2. **Distribute** (top-down): with the parent's final size known,
//!    fixed children take their size, percentages resolve against the
//!    parent's final content size, and the remaining main-axis space is
//!    distributed to grow/shrink weights. Leftover cells from integer
//!    division go to earlier children in declaration order.
//!
//! Static-positioned nodes are hoisted out of flow into an accumulation
//! band stacked at the top of the screen; the dynamic region lays out in
//! the rows below it. Absolute nodes size like roots of their own
//! subtree and place by explicit offsets inside their parent's content
//! area, after flow siblings so they raster on top.
//!
//! Every geometry value is a whole terminal cell. Constraint conflicts
//! (padding wider than the box, shrink below zero) clamp to zero and are
//! counted so the caller can report them without crashing the frame.

use crate::tree::{NodeKind, Style, UiNode};
use crate::types::{AlignItems, BorderSides, Dimension, Edges, JustifyContent, Position};

use super::text;

// =============================================================================
// Output
// =============================================================================

/// One positioned box. Coordinates are absolute screen cells.
#[derive(Debug, PartialEq)]
pub struct LayoutBox<'a> {
    pub node: &'a UiNode,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub children: Vec<LayoutBox<'a>>,
}

/// A solved frame: the static accumulation band plus the dynamic region.
#[derive(Debug, PartialEq)]
pub struct Layout<'a> {
    /// Hoisted static boxes, stacked from row 0 in document order.
    pub statics: Vec<LayoutBox<'a>>,
    /// Rows the static band occupies; the dynamic region starts below.
    pub static_rows: u16,
    /// Root box of the dynamic region.
    pub root: LayoutBox<'a>,
    /// Boxes clamped to zero by conflicting constraints this solve.
    pub clamped: u32,
}

/// Solve the tree against a terminal of `term_width` x `term_height`.
pub fn solve<'a>(tree: &'a UiNode, term_width: u16, term_height: u16) -> Layout<'a> {
    let mut solver = Solver { clamped: 0 };

    let mut static_nodes = Vec::new();
    collect_statics(tree, &mut static_nodes);
    let mut statics = Vec::new();
    let mut band: u16 = 0;
    for node in static_nodes {
        let (_, ih) = solver.intrinsic(node, term_width);
        let width = resolve(node.style.width, term_width)
            .unwrap_or(term_width)
            .min(term_width);
        let height = resolve(node.style.height, term_height).unwrap_or(ih);
        statics.push(solver.layout_into(node, 0, band, width, height, true));
        band = band.saturating_add(height);
    }
    let band = band.min(term_height);

    let avail_h = term_height.saturating_sub(band);
    let root_w = resolve(tree.style.width, term_width).unwrap_or(term_width);
    let root_h = resolve(tree.style.height, avail_h).unwrap_or(avail_h);
    let root = solver.layout_into(tree, 0, band, root_w, root_h, false);

    Layout {
        statics,
        static_rows: band,
        root,
        clamped: solver.clamped,
    }
}

/// Padding plus border cells per side.
pub(crate) fn chrome(style: &Style) -> Edges {
    let border = border_edges(style);
    Edges {
        top: style.padding.top + border.top,
        right: style.padding.right + border.right,
        bottom: style.padding.bottom + border.bottom,
        left: style.padding.left + border.left,
    }
}

/// Cells consumed by the border on each side (0 or 1).
pub(crate) fn border_edges(style: &Style) -> Edges {
    if !style.border.is_visible() {
        return Edges::ZERO;
    }
    let sides = style.border_sides;
    Edges {
        top: sides.contains(BorderSides::TOP) as u16,
        right: sides.contains(BorderSides::RIGHT) as u16,
        bottom: sides.contains(BorderSides::BOTTOM) as u16,
        left: sides.contains(BorderSides::LEFT) as u16,
    }
}

// =============================================================================
// Dimension resolution
// =============================================================================

/// Distribute-pass resolution: percentages resolve against the parent's
/// final size. `None` means auto.
fn resolve(dim: Dimension, parent: u16) -> Option<u16> {
    match dim {
        Dimension::Auto => None,
        Dimension::Cells(n) => Some(n),
        Dimension::Percent(p) => {
            Some((parent as f32 * p / 100.0).floor().clamp(0.0, u16::MAX as f32) as u16)
        }
    }
}

/// Intrinsic-pass resolution: only absolute sizes count; percentages are
/// deferred entirely to the distribute pass.
fn fixed(dim: Dimension) -> Option<u16> {
    match dim {
        Dimension::Cells(n) => Some(n),
        _ => None,
    }
}

fn collect_statics<'a>(node: &'a UiNode, out: &mut Vec<&'a UiNode>) {
    for child in &node.children {
        if child.style.position == Position::Static {
            // Hoisted whole; statics nested beneath it stay inside.
            out.push(child);
        } else {
            collect_statics(child, out);
        }
    }
}

// =============================================================================
// Solver
// =============================================================================

struct Solver {
    clamped: u32,
}

struct FlowItem<'a> {
    node: &'a UiNode,
    /// Main-axis size after grow/shrink.
    main: u16,
    /// Content-derived cross size, pre-alignment.
    intrinsic_cross: u16,
}

impl Solver {
    // -------------------------------------------------------------------------
    // Intrinsic pass
    // -------------------------------------------------------------------------

    /// Natural (content-derived) size of `node`. `hint_w` is the width
    /// the parent expects to offer, used only to predict text wrapping.
    fn intrinsic(&self, node: &UiNode, hint_w: u16) -> (u16, u16) {
        let inset = chrome(&node.style);
        match &node.kind {
            NodeKind::Text(content) => {
                let inner = hint_w.saturating_sub(inset.horizontal()).max(1);
                let w = text::natural_width(content) + inset.horizontal();
                let h = text::measure_height(content, node.style.wrap, inner) + inset.vertical();
                (w, h)
            }
            NodeKind::Spacer => (0, 0),
            NodeKind::Container | NodeKind::Fragment => {
                let is_row = node.style.direction.is_row();
                let gap = node.style.gap;
                let avail = fixed(node.style.width)
                    .unwrap_or(hint_w)
                    .saturating_sub(inset.horizontal());

                let mut sum_main: u16 = 0;
                let mut max_cross: u16 = 0;
                let mut count: u16 = 0;
                for child in node.children.iter().filter(|c| c.style.position == Position::Flow) {
                    let (iw, ih) = self.intrinsic(child, avail);
                    let w = fixed(child.style.width).unwrap_or(iw);
                    let h = fixed(child.style.height).unwrap_or(ih);
                    let margin = &child.style.margin;
                    let (main, cross) = if is_row {
                        (w + margin.horizontal(), h + margin.vertical())
                    } else {
                        (h + margin.vertical(), w + margin.horizontal())
                    };
                    sum_main = sum_main.saturating_add(main);
                    max_cross = max_cross.max(cross);
                    count += 1;
                }
                sum_main = sum_main.saturating_add(gap * count.saturating_sub(1));

                if is_row {
                    (sum_main + inset.horizontal(), max_cross + inset.vertical())
                } else {
                    (max_cross + inset.horizontal(), sum_main + inset.vertical())
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Distribute pass
    // -------------------------------------------------------------------------

    /// Place `node` at the given rect and lay out its subtree.
    /// `in_static_band` marks subtrees hoisted into the accumulation
    /// band, where nested static children behave as ordinary flow.
    fn layout_into<'a>(
        &mut self,
        node: &'a UiNode,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        in_static_band: bool,
    ) -> LayoutBox<'a> {
        let mut placed = LayoutBox {
            node,
            x,
            y,
            width,
            height,
            children: Vec::new(),
        };
        if matches!(node.kind, NodeKind::Container | NodeKind::Fragment) {
            self.layout_children(&mut placed, in_static_band);
        }
        placed
    }

    fn layout_children<'a>(&mut self, parent: &mut LayoutBox<'a>, in_static_band: bool) {
        let style = &parent.node.style;
        let inset = chrome(style);
        if inset.horizontal() > parent.width || inset.vertical() > parent.height {
            self.clamped += 1;
        }
        let content_x = parent.x.saturating_add(inset.left);
        let content_y = parent.y.saturating_add(inset.top);
        let content_w = parent.width.saturating_sub(inset.horizontal());
        let content_h = parent.height.saturating_sub(inset.vertical());

        let is_row = style.direction.is_row();
        let is_reverse = style.direction.is_reverse();
        let (main_size, cross_size) = if is_row {
            (content_w, content_h)
        } else {
            (content_h, content_w)
        };
        let gap = style.gap;

        let in_flow = |c: &UiNode| {
            c.style.position == Position::Flow
                || (in_static_band && c.style.position == Position::Static)
        };
        let flow: Vec<&UiNode> = parent.node.children.iter().filter(|c| in_flow(c)).collect();

        if !flow.is_empty() {
            let mut items: Vec<FlowItem<'a>> = Vec::with_capacity(flow.len());
            let mut used: u16 = 0;
            let mut total_grow: f32 = 0.0;
            let mut total_shrink: f32 = 0.0;

            for child in &flow {
                let (iw, ih) = self.intrinsic(child, content_w);
                let w = resolve(child.style.width, content_w).unwrap_or(iw);
                let h = resolve(child.style.height, content_h).unwrap_or(ih);
                let (main, intrinsic_cross) = if is_row { (w, h) } else { (h, w) };
                used = used.saturating_add(main + main_margin(child, is_row));
                total_grow += child.style.grow.max(0.0);
                total_shrink += child.style.shrink.max(0.0);
                items.push(FlowItem {
                    node: child,
                    main,
                    intrinsic_cross,
                });
            }
            used = used.saturating_add(gap * (items.len() as u16 - 1));

            let free = main_size as i32 - used as i32;
            if free > 0 && total_grow > 0.0 {
                self.distribute_growth(&mut items, free as u16, total_grow);
            } else if free < 0 && total_shrink > 0.0 {
                self.distribute_shrink(&mut items, (-free) as u16, total_shrink);
            }

            // Final main-axis occupancy decides the justify offsets.
            let mut line_main: u16 = 0;
            for item in &items {
                line_main = line_main.saturating_add(item.main + main_margin(item.node, is_row));
            }
            line_main = line_main.saturating_add(gap * (items.len() as u16 - 1));
            let remaining = main_size.saturating_sub(line_main);
            let (mut main_offset, item_gap) =
                justify_offsets(style.justify, remaining, items.len() as u16, gap);

            for item in items {
                let child = item.node;
                let margin = &child.style.margin;
                let margin_main = main_margin(child, is_row);
                let margin_cross = if is_row {
                    margin.vertical()
                } else {
                    margin.horizontal()
                };

                let align = child
                    .style
                    .align_self
                    .to_align_items()
                    .unwrap_or(style.align_items);
                let explicit_cross = if is_row {
                    resolve(child.style.height, content_h)
                } else {
                    resolve(child.style.width, content_w)
                };
                let cross = explicit_cross.unwrap_or_else(|| {
                    if align == AlignItems::Stretch {
                        cross_size.saturating_sub(margin_cross)
                    } else {
                        item.intrinsic_cross
                    }
                });

                let cross_pos = match align {
                    AlignItems::Center => cross_size.saturating_sub(cross) / 2,
                    AlignItems::FlexEnd => cross_size.saturating_sub(cross),
                    _ => 0, // Stretch and FlexStart pin to the content edge
                };

                let (cx, cy, cw, mut chh) = if is_row {
                    let cx = if is_reverse {
                        content_x
                            + content_w.saturating_sub(main_offset + item.main + margin.right)
                    } else {
                        content_x + main_offset + margin.left
                    };
                    (cx, content_y + cross_pos + margin.top, item.main, cross)
                } else {
                    let cy = if is_reverse {
                        content_y
                            + content_h.saturating_sub(main_offset + item.main + margin.bottom)
                    } else {
                        content_y + main_offset + margin.top
                    };
                    (content_x + cross_pos + margin.left, cy, cross, item.main)
                };

                // Text height follows the final width unless pinned.
                if let NodeKind::Text(content) = &child.kind {
                    if resolve(child.style.height, content_h).is_none() {
                        let child_inset = chrome(&child.style);
                        let inner = cw.saturating_sub(child_inset.horizontal()).max(1);
                        chh = text::measure_height(content, child.style.wrap, inner).max(1)
                            + child_inset.vertical();
                    }
                }

                let advance = item.main;
                let placed = self.layout_into(child, cx, cy, cw, chh, in_static_band);
                parent.children.push(placed);
                main_offset = main_offset.saturating_add(advance + margin_main + item_gap);
            }
        }

        // Absolute children after flow, so they raster on top.
        for child in parent
            .node
            .children
            .iter()
            .filter(|c| c.style.position == Position::Absolute)
        {
            let (iw, ih) = self.intrinsic(child, content_w);
            let w = resolve(child.style.width, content_w).unwrap_or(iw);
            let h = resolve(child.style.height, content_h).unwrap_or(ih);

            let x = match (child.style.left, child.style.right) {
                (Some(left), _) => content_x as i32 + left as i32,
                (None, Some(right)) => {
                    (content_x + content_w) as i32 - w as i32 - right as i32
                }
                (None, None) => content_x as i32,
            };
            let y = match (child.style.top, child.style.bottom) {
                (Some(top), _) => content_y as i32 + top as i32,
                (None, Some(bottom)) => {
                    (content_y + content_h) as i32 - h as i32 - bottom as i32
                }
                (None, None) => content_y as i32,
            };

            let placed = self.layout_into(
                child,
                x.max(0) as u16,
                y.max(0) as u16,
                w,
                h,
                in_static_band,
            );
            parent.children.push(placed);
        }
    }

    /// Hand out `free` cells to grow weights; leftover cells from the
    /// integer split go to earlier growing children.
    fn distribute_growth(&mut self, items: &mut [FlowItem<'_>], free: u16, total_grow: f32) {
        let mut handed: u16 = 0;
        for item in items.iter_mut() {
            let grow = item.node.style.grow.max(0.0);
            if grow > 0.0 {
                let share = ((grow / total_grow) * free as f32).floor() as u16;
                item.main = item.main.saturating_add(share);
                handed = handed.saturating_add(share);
            }
        }
        let mut leftover = free.saturating_sub(handed);
        for item in items.iter_mut() {
            if leftover == 0 {
                break;
            }
            if item.node.style.grow > 0.0 {
                item.main += 1;
                leftover -= 1;
            }
        }
    }

    /// Take `deficit` cells back from shrink weights, clamping every
    /// item at zero. Clamps are counted, never fatal.
    fn distribute_shrink(&mut self, items: &mut [FlowItem<'_>], deficit: u16, total_shrink: f32) {
        let mut reclaimed: u16 = 0;
        for item in items.iter_mut() {
            let shrink = item.node.style.shrink.max(0.0);
            if shrink > 0.0 {
                let share = ((shrink / total_shrink) * deficit as f32).floor() as u16;
                if share > item.main {
                    self.clamped += 1;
                }
                let cut = share.min(item.main);
                item.main -= cut;
                reclaimed = reclaimed.saturating_add(cut);
            }
        }
        let mut leftover = deficit.saturating_sub(reclaimed);
        for item in items.iter_mut() {
            if leftover == 0 {
                break;
            }
            if item.node.style.shrink > 0.0 && item.main > 0 {
                item.main -= 1;
                leftover -= 1;
            }
        }
        // Whatever could not be reclaimed overflows; the compositor clips.
    }
}

fn main_margin(node: &UiNode, is_row: bool) -> u16 {
    if is_row {
        node.style.margin.horizontal()
    } else {
        node.style.margin.vertical()
    }
}

/// Starting offset and per-item spacing for a justify mode, given the
/// space left over on the main axis.
fn justify_offsets(justify: JustifyContent, remaining: u16, count: u16, gap: u16) -> (u16, u16) {
    match justify {
        JustifyContent::Center => (remaining / 2, gap),
        JustifyContent::FlexEnd => (remaining, gap),
        JustifyContent::SpaceBetween => {
            if count > 1 {
                (0, remaining / (count - 1) + gap)
            } else {
                (0, gap)
            }
        }
        JustifyContent::SpaceAround => {
            let around = remaining / count.max(1);
            (around / 2, around + gap)
        }
        JustifyContent::SpaceEvenly => {
            let even = remaining / (count + 1);
            (even, even + gap)
        }
        JustifyContent::FlexStart => (0, gap),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{column, container, row, spacer, text};
    use crate::types::{AlignSelf, BorderStyle, FlexDirection};

    fn sizes(boxes: &[LayoutBox<'_>]) -> Vec<(u16, u16, u16, u16)> {
        boxes.iter().map(|b| (b.x, b.y, b.width, b.height)).collect()
    }

    #[test]
    fn spacer_absorbs_remaining_width() {
        // Row of width 10: "A", spacer, "B" -> spacer gets 10 - 1 - 1 = 8.
        let tree = row()
            .width(10)
            .child(text("A"))
            .child(spacer())
            .child(text("B"));
        let layout = solve(&tree, 80, 24);
        assert_eq!(layout.root.width, 10);
        let widths: Vec<u16> = layout.root.children.iter().map(|b| b.width).collect();
        assert_eq!(widths, [1, 8, 1]);
        let xs: Vec<u16> = layout.root.children.iter().map(|b| b.x).collect();
        assert_eq!(xs, [0, 1, 9]);
    }

    #[test]
    fn oversubscribed_grow_child_clamps_to_zero() {
        let tree = row()
            .width(10)
            .child(container().width(8).height(1))
            .child(container().width(5).height(1))
            .child(spacer());
        let layout = solve(&tree, 80, 24);
        let spacer_box = &layout.root.children[2];
        assert_eq!(spacer_box.width, 0); // never negative
        assert!(layout.clamped > 0);
    }

    #[test]
    fn layout_is_deterministic() {
        let tree = column()
            .child(row().child(text("left")).child(spacer()).child(text("right")))
            .child(text("body text that wraps around"))
            .child(container().grow(1.0));
        let a = solve(&tree, 40, 12);
        let b = solve(&tree, 40, 12);
        assert_eq!(a, b);
    }

    #[test]
    fn percent_resolves_against_final_parent_size() {
        // The parent's own width comes from grow, so the child's 50% can
        // only be right if percentages wait for the final size.
        let tree = row()
            .width(20)
            .child(container().grow(1.0).child(container().width(Dimension::Percent(50.0)).height(1)));
        let layout = solve(&tree, 80, 24);
        let grown = &layout.root.children[0];
        assert_eq!(grown.width, 20);
        assert_eq!(grown.children[0].width, 10);
    }

    #[test]
    fn grow_remainder_goes_to_earlier_children() {
        // 10 cells over three grow-1 children: 4, 3, 3.
        let tree = row()
            .width(10)
            .child(container().grow(1.0))
            .child(container().grow(1.0))
            .child(container().grow(1.0));
        let layout = solve(&tree, 80, 24);
        let widths: Vec<u16> = layout.root.children.iter().map(|b| b.width).collect();
        assert_eq!(widths, [4, 3, 3]);
    }

    #[test]
    fn gap_separates_children() {
        let tree = row()
            .width(10)
            .gap(2)
            .child(container().width(2).height(1))
            .child(container().width(2).height(1));
        let layout = solve(&tree, 80, 24);
        let xs: Vec<u16> = layout.root.children.iter().map(|b| b.x).collect();
        assert_eq!(xs, [0, 4]);
    }

    #[test]
    fn justify_center_and_end() {
        let centered = row()
            .width(10)
            .justify(JustifyContent::Center)
            .child(container().width(4).height(1));
        let layout = solve(&centered, 80, 24);
        assert_eq!(layout.root.children[0].x, 3);

        let ended = row()
            .width(10)
            .justify(JustifyContent::FlexEnd)
            .child(container().width(4).height(1));
        let layout = solve(&ended, 80, 24);
        assert_eq!(layout.root.children[0].x, 6);
    }

    #[test]
    fn justify_space_between() {
        let tree = row()
            .width(10)
            .justify(JustifyContent::SpaceBetween)
            .child(container().width(2).height(1))
            .child(container().width(2).height(1))
            .child(container().width(2).height(1));
        let layout = solve(&tree, 80, 24);
        let xs: Vec<u16> = layout.root.children.iter().map(|b| b.x).collect();
        assert_eq!(xs, [0, 4, 8]);
    }

    #[test]
    fn align_items_positions_cross_axis() {
        let tree = row()
            .width(10)
            .height(5)
            .align_items(AlignItems::Center)
            .child(container().width(2).height(1));
        let layout = solve(&tree, 80, 24);
        assert_eq!(layout.root.children[0].y, 2);

        let tree = row()
            .width(10)
            .height(5)
            .align_items(AlignItems::FlexEnd)
            .child(container().width(2).height(1).align_self(AlignSelf::FlexStart));
        let layout = solve(&tree, 80, 24);
        assert_eq!(layout.root.children[0].y, 0); // align-self overrides
    }

    #[test]
    fn stretch_fills_cross_axis() {
        let tree = row().width(10).height(5).child(container().width(2));
        let layout = solve(&tree, 80, 24);
        assert_eq!(layout.root.children[0].height, 5);
    }

    #[test]
    fn row_reverse_mirrors_placement() {
        let tree = container()
            .direction(FlexDirection::RowReverse)
            .width(10)
            .height(1)
            .child(container().width(3).height(1))
            .child(container().width(2).height(1));
        let layout = solve(&tree, 80, 24);
        // First declared child hugs the right edge.
        let xs: Vec<u16> = layout.root.children.iter().map(|b| b.x).collect();
        assert_eq!(xs, [7, 5]);
    }

    #[test]
    fn padding_and_border_consume_space() {
        let tree = column()
            .width(10)
            .height(6)
            .padding(1)
            .border(BorderStyle::Single)
            .child(container().grow(1.0));
        let layout = solve(&tree, 80, 24);
        let inner = &layout.root.children[0];
        assert_eq!((inner.x, inner.y), (2, 2));
        assert_eq!((inner.width, inner.height), (6, 2));
    }

    #[test]
    fn text_height_tracks_wrap_width() {
        let tree = column().width(5).child(text("hello world"));
        let layout = solve(&tree, 80, 24);
        assert_eq!(layout.root.children[0].height, 2); // "hello" / "world"
    }

    #[test]
    fn absolute_places_by_offsets() {
        let tree = container()
            .width(20)
            .height(10)
            .child(container().absolute().width(5).height(3).left(2).top(1))
            .child(container().absolute().width(4).height(2).right(0).bottom(0));
        let layout = solve(&tree, 80, 24);
        assert_eq!(sizes(&layout.root.children), [(2, 1, 5, 3), (16, 8, 4, 2)]);
    }

    #[test]
    fn static_nodes_stack_above_dynamic_region() {
        let tree = column()
            .child(text("log line one").static_position())
            .child(text("log line two").static_position())
            .child(text("app body"));
        let layout = solve(&tree, 40, 24);
        assert_eq!(layout.static_rows, 2);
        assert_eq!(sizes(&layout.statics), [(0, 0, 40, 1), (0, 1, 40, 1)]);
        // Dynamic region starts below the band.
        assert_eq!(layout.root.y, 2);
        assert_eq!(layout.root.height, 22);
        // Hoisted nodes are gone from the flow.
        assert_eq!(layout.root.children.len(), 1);
    }

    #[test]
    fn chrome_overflow_counts_a_clamp() {
        let tree = container().width(2).height(2).padding(3).child(text("x"));
        let layout = solve(&tree, 80, 24);
        assert!(layout.clamped > 0);
    }

    #[test]
    fn root_defaults_to_full_terminal() {
        let tree = column().child(text("hi"));
        let layout = solve(&tree, 80, 24);
        assert_eq!((layout.root.width, layout.root.height), (80, 24));
    }
}
