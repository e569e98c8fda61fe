//! Text measurement and line shaping in terminal cells.
//!
//! Widths come from `unicode-width` (CJK and emoji occupy two cells,
//! combining marks zero) and all cutting happens on `unicode-segmentation`
//! grapheme boundaries, so a truncation never splits a combining sequence.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::types::TextWrap;

/// Ellipsis marker used by the truncating wrap modes.
pub const ELLIPSIS: char = '…';

/// Display width of a string in terminal cells.
pub fn string_width(s: &str) -> u16 {
    UnicodeWidthStr::width(s).min(u16::MAX as usize) as u16
}

fn grapheme_width(g: &str) -> u16 {
    string_width(g)
}

/// Natural (unwrapped) width: the widest explicit line.
pub fn natural_width(text: &str) -> u16 {
    text.lines().map(string_width).max().unwrap_or(0)
}

/// Number of rows `text` occupies at `width` under `wrap`.
pub fn measure_height(text: &str, wrap: TextWrap, width: u16) -> u16 {
    if text.is_empty() {
        return 0;
    }
    match wrap {
        TextWrap::Word => wrap_lines(text, width).len().min(u16::MAX as usize) as u16,
        // Single-line modes: one row per explicit line.
        _ => text.lines().count().max(1).min(u16::MAX as usize) as u16,
    }
}

/// Produce the rows to draw for `text` in a box `width` cells wide.
pub fn shape_lines(text: &str, wrap: TextWrap, width: u16) -> Vec<String> {
    match wrap {
        TextWrap::Word => wrap_lines(text, width),
        TextWrap::NoWrap => text.lines().map(str::to_string).collect(),
        mode => text.lines().map(|line| truncate(line, mode, width)).collect(),
    }
}

// =============================================================================
// Word wrap
// =============================================================================

/// Word-wrap to `width`, honoring explicit newlines. Words wider than a
/// whole line are hard-broken on grapheme boundaries.
pub fn wrap_lines(text: &str, width: u16) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if width == 0 {
        // Degenerate box; one row per explicit line, clipped by the drawer.
        return text.lines().map(str::to_string).collect();
    }

    let mut lines = Vec::new();
    for raw in text.lines() {
        wrap_one_line(raw, width, &mut lines);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn wrap_one_line(raw: &str, width: u16, out: &mut Vec<String>) {
    let mut line = String::new();
    let mut line_width: u16 = 0;

    for word in raw.split_inclusive(' ') {
        let word_width = string_width(word);
        if line_width + word_width <= width {
            line.push_str(word);
            line_width += word_width;
            continue;
        }
        // Trailing space may hang past the edge without forcing a break.
        let trimmed = word.trim_end_matches(' ');
        let trimmed_width = string_width(trimmed);
        if line_width + trimmed_width <= width {
            line.push_str(word);
            line_width += word_width;
            continue;
        }
        if !line.is_empty() {
            out.push(trim_trailing_spaces(std::mem::take(&mut line)));
            line_width = 0;
        }
        if trimmed_width <= width {
            line.push_str(word);
            line_width = word_width;
        } else {
            // A single word wider than the box: hard-break it.
            for g in word.graphemes(true) {
                let gw = grapheme_width(g);
                if line_width + gw > width && line_width > 0 {
                    out.push(trim_trailing_spaces(std::mem::take(&mut line)));
                    line_width = 0;
                }
                line.push_str(g);
                line_width += gw;
            }
        }
    }
    out.push(trim_trailing_spaces(line));
}

fn trim_trailing_spaces(mut line: String) -> String {
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

// =============================================================================
// Truncation
// =============================================================================

/// Truncate one line to `width` cells with an ellipsis marker, keeping
/// the head (`TruncateEnd`), the tail (`TruncateStart`), or both ends
/// (`TruncateMiddle`). Text that already fits is returned unchanged.
pub fn truncate(line: &str, mode: TextWrap, width: u16) -> String {
    if width == 0 {
        return String::new();
    }
    if string_width(line) <= width {
        return line.to_string();
    }
    if width == 1 {
        return ELLIPSIS.to_string();
    }

    let budget = width - 1; // room for the marker
    match mode {
        TextWrap::TruncateEnd => {
            let mut head = take_prefix(line, budget);
            head.push(ELLIPSIS);
            head
        }
        TextWrap::TruncateStart => {
            let tail = take_suffix(line, budget);
            let mut out = String::with_capacity(tail.len() + ELLIPSIS.len_utf8());
            out.push(ELLIPSIS);
            out.push_str(&tail);
            out
        }
        TextWrap::TruncateMiddle => {
            // Head-heavy split; at width >= 3 both ends keep >= 1 cell.
            let head_budget = budget - budget / 2;
            let tail_budget = budget / 2;
            let mut out = take_prefix(line, head_budget);
            out.push(ELLIPSIS);
            if tail_budget > 0 {
                out.push_str(&take_suffix(line, tail_budget));
            }
            out
        }
        // NoWrap/Word never truncate; the compositor clips.
        _ => line.to_string(),
    }
}

/// Longest grapheme-aligned prefix fitting `budget` cells.
fn take_prefix(line: &str, budget: u16) -> String {
    let mut out = String::new();
    let mut used: u16 = 0;
    for g in line.graphemes(true) {
        let gw = grapheme_width(g);
        if used + gw > budget {
            break;
        }
        out.push_str(g);
        used += gw;
    }
    out
}

/// Longest grapheme-aligned suffix fitting `budget` cells.
fn take_suffix(line: &str, budget: u16) -> String {
    let mut taken: Vec<&str> = Vec::new();
    let mut used: u16 = 0;
    for g in line.graphemes(true).rev() {
        let gw = grapheme_width(g);
        if used + gw > budget {
            break;
        }
        taken.push(g);
        used += gw;
    }
    taken.iter().rev().copied().collect()
}

// =============================================================================
// Tests
// =============================================================================
