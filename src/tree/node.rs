//! UI nodes - the immutable tree a component invocation produces.
//!
//! Nodes are plain values. A component builds a fresh tree every
//! invocation and hands it to layout; nothing here is reactive or
//! mutable in place. Reactivity comes from the invocation itself being
//! tracked: reading a signal while building subscribes the render loop,
//! and the next tick rebuilds the tree from scratch.

use crate::types::{
    AlignItems, AlignSelf, Attr, BorderSides, BorderStyle, Dimension, Edges, FlexDirection,
    JustifyContent, Position, Rgba, TextWrap,
};

// =============================================================================
// Node kind
// =============================================================================

/// What a node is, independent of how it is styled.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Flex container; lays out its children.
    Container,
    /// Text leaf; derives its intrinsic size from the content.
    Text(String),
    /// Empty flexible leaf (`grow: 1` by default); eats main-axis space.
    Spacer,
    /// Grouping without a box of its own. Children are spliced into the
    /// parent when attached; only a fragment used as the root survives
    /// to layout, where it behaves as a default container.
    Fragment,
}

// =============================================================================
// Style
// =============================================================================

/// Style properties layout and compositing recognize.
///
/// Everything is concrete values; resolving any higher-level styling
/// (themes, cascades) into this struct is the caller's business.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    // Dimensions
    pub width: Dimension,
    pub height: Dimension,

    // Container layout
    pub direction: FlexDirection,
    pub gap: u16,
    pub justify: JustifyContent,
    pub align_items: AlignItems,

    // Item layout
    pub grow: f32,
    pub shrink: f32,
    pub align_self: AlignSelf,

    // Spacing
    pub padding: Edges,
    pub margin: Edges,

    // Out-of-flow placement
    pub position: Position,
    pub left: Option<i16>,
    pub top: Option<i16>,
    pub right: Option<i16>,
    pub bottom: Option<i16>,

    // Visual
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
    pub border: BorderStyle,
    pub border_sides: BorderSides,
    pub border_color: Rgba,

    // Text
    pub wrap: TextWrap,

    /// Stable identifier for focus registration and mouse hit lookup.
    pub id: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            direction: FlexDirection::Column,
            gap: 0,
            justify: JustifyContent::FlexStart,
            align_items: AlignItems::Stretch,
            grow: 0.0,
            shrink: 1.0,
            align_self: AlignSelf::Auto,
            padding: Edges::ZERO,
            margin: Edges::ZERO,
            position: Position::Flow,
            left: None,
            top: None,
            right: None,
            bottom: None,
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TRANSPARENT,
            attrs: Attr::NONE,
            border: BorderStyle::None,
            border_sides: BorderSides::NONE,
            border_color: Rgba::TERMINAL_DEFAULT,
            wrap: TextWrap::Word,
            id: None,
        }
    }
}

// =============================================================================
// UiNode
// =============================================================================

/// One node of the declarative UI tree: `{kind, style, children}`.
///
/// # Example
///
/// ```
/// use glint_tui::tree::{row, text, spacer};
///
/// let bar = row()
///     .width(10)
///     .child(text("A"))
///     .child(spacer())
///     .child(text("B"));
/// assert_eq!(bar.children.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UiNode {
    pub kind: NodeKind,
    pub style: Style,
    pub children: Vec<UiNode>,
}

/// Column container (the default direction).
pub fn column() -> UiNode {
    UiNode {
        kind: NodeKind::Container,
        style: Style::default(),
        children: Vec::new(),
    }
}

/// Row container.
pub fn row() -> UiNode {
    let mut node = column();
    node.style.direction = FlexDirection::Row;
    node
}

/// Container with the default (column) direction.
pub fn container() -> UiNode {
    column()
}

/// Text leaf.
pub fn text(content: impl Into<String>) -> UiNode {
    UiNode {
        kind: NodeKind::Text(content.into()),
        style: Style::default(),
        children: Vec::new(),
    }
}

/// Flexible empty space (`grow: 1`).
pub fn spacer() -> UiNode {
    let mut node = UiNode {
        kind: NodeKind::Spacer,
        style: Style::default(),
        children: Vec::new(),
    };
    node.style.grow = 1.0;
    node
}

/// Group children without introducing a box. Attaching a fragment to a
/// container splices its children in place.
pub fn fragment(children: Vec<UiNode>) -> UiNode {
    UiNode {
        kind: NodeKind::Fragment,
        style: Style::default(),
        children,
    }
}

impl UiNode {
    // -------------------------------------------------------------------------
    // Children
    // -------------------------------------------------------------------------

    /// Append one child. Fragments are spliced, not nested.
    pub fn child(mut self, node: UiNode) -> Self {
        match node.kind {
            NodeKind::Fragment => {
                for spliced in node.children {
                    self = self.child(spliced);
                }
            }
            _ => self.children.push(node),
        }
        self
    }

    /// Append many children; fragments are spliced.
    pub fn children(mut self, nodes: impl IntoIterator<Item = UiNode>) -> Self {
        for node in nodes {
            self = self.child(node);
        }
        self
    }

    // -------------------------------------------------------------------------
    // Dimensions
    // -------------------------------------------------------------------------

    pub fn width(mut self, width: impl Into<Dimension>) -> Self {
        self.style.width = width.into();
        self
    }

    pub fn height(mut self, height: impl Into<Dimension>) -> Self {
        self.style.height = height.into();
        self
    }

    // -------------------------------------------------------------------------
    // Container layout
    // -------------------------------------------------------------------------

    pub fn direction(mut self, direction: FlexDirection) -> Self {
        self.style.direction = direction;
        self
    }

    pub fn gap(mut self, gap: u16) -> Self {
        self.style.gap = gap;
        self
    }

    pub fn justify(mut self, justify: JustifyContent) -> Self {
        self.style.justify = justify;
        self
    }

    pub fn align_items(mut self, align: AlignItems) -> Self {
        self.style.align_items = align;
        self
    }

    // -------------------------------------------------------------------------
    // Item layout
    // -------------------------------------------------------------------------

    pub fn grow(mut self, grow: f32) -> Self {
        self.style.grow = grow;
        self
    }

    pub fn shrink(mut self, shrink: f32) -> Self {
        self.style.shrink = shrink;
        self
    }

    pub fn align_self(mut self, align: AlignSelf) -> Self {
        self.style.align_self = align;
        self
    }

    // -------------------------------------------------------------------------
    // Spacing
    // -------------------------------------------------------------------------

    pub fn padding(mut self, padding: impl Into<Edges>) -> Self {
        self.style.padding = padding.into();
        self
    }

    pub fn margin(mut self, margin: impl Into<Edges>) -> Self {
        self.style.margin = margin.into();
        self
    }

    // -------------------------------------------------------------------------
    // Out-of-flow placement
    // -------------------------------------------------------------------------

    /// Remove from flow; place by [`left`](Self::left)/[`top`](Self::top)/
    /// [`right`](Self::right)/[`bottom`](Self::bottom) offsets over flow
    /// content.
    pub fn absolute(mut self) -> Self {
        self.style.position = Position::Absolute;
        self
    }

    /// Remove from flow; stack into the accumulation region above the
    /// dynamic area.
    pub fn static_position(mut self) -> Self {
        self.style.position = Position::Static;
        self
    }

    pub fn left(mut self, cells: i16) -> Self {
        self.style.left = Some(cells);
        self
    }

    pub fn top(mut self, cells: i16) -> Self {
        self.style.top = Some(cells);
        self
    }

    pub fn right(mut self, cells: i16) -> Self {
        self.style.right = Some(cells);
        self
    }

    pub fn bottom(mut self, cells: i16) -> Self {
        self.style.bottom = Some(cells);
        self
    }

    // -------------------------------------------------------------------------
    // Visual
    // -------------------------------------------------------------------------

    pub fn fg(mut self, color: Rgba) -> Self {
        self.style.fg = color;
        self
    }

    pub fn bg(mut self, color: Rgba) -> Self {
        self.style.bg = color;
        self
    }

    pub fn attrs(mut self, attrs: Attr) -> Self {
        self.style.attrs = attrs;
        self
    }

    /// Border on all four sides in the given glyph family.
    pub fn border(mut self, style: BorderStyle) -> Self {
        self.style.border = style;
        self.style.border_sides = BorderSides::ALL;
        self
    }

    /// Border on selected sides only.
    pub fn border_sides(mut self, style: BorderStyle, sides: BorderSides) -> Self {
        self.style.border = style;
        self.style.border_sides = sides;
        self
    }

    pub fn border_color(mut self, color: Rgba) -> Self {
        self.style.border_color = color;
        self
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    pub fn wrap(mut self, wrap: TextWrap) -> Self {
        self.style.wrap = wrap;
        self
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Stable id for focus registration and mouse hit lookup.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.style.id = Some(id.into());
        self
    }

    /// Text content, if this is a text leaf.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_flow_column_auto() {
        let node = container();
        assert_eq!(node.style.width, Dimension::Auto);
        assert_eq!(node.style.direction, FlexDirection::Column);
        assert_eq!(node.style.position, Position::Flow);
        assert_eq!(node.style.grow, 0.0);
        assert_eq!(node.style.shrink, 1.0);
    }

    #[test]
    fn spacer_grows_by_default() {
        assert_eq!(spacer().style.grow, 1.0);
    }

    #[test]
    fn fragments_splice_into_parent() {
        let tree = row()
            .child(text("a"))
            .child(fragment(vec![text("b"), text("c")]))
            .child(text("d"));
        let texts: Vec<_> = tree
            .children
            .iter()
            .filter_map(|c| c.text_content())
            .collect();
        assert_eq!(texts, ["a", "b", "c", "d"]);
    }

    #[test]
    fn nested_fragments_flatten_fully() {
        let tree = column().child(fragment(vec![
            text("x"),
            fragment(vec![text("y"), text("z")]),
        ]));
        let texts: Vec<_> = tree
            .children
            .iter()
            .filter_map(|c| c.text_content())
            .collect();
        assert_eq!(texts, ["x", "y", "z"]);
    }

    #[test]
    fn builder_sets_style() {
        let node = row()
            .width(10)
            .height(Dimension::Percent(50.0))
            .gap(2)
            .padding(1)
            .border(BorderStyle::Rounded)
            .id("panel");
        assert_eq!(node.style.width, Dimension::Cells(10));
        assert_eq!(node.style.height, Dimension::Percent(50.0));
        assert_eq!(node.style.gap, 2);
        assert_eq!(node.style.padding, Edges::all(1));
        assert_eq!(node.style.border_sides, BorderSides::ALL);
        assert_eq!(node.style.id.as_deref(), Some("panel"));
    }
}
