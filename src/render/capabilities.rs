//! Terminal capability probe.
//!
//! Runs once at startup; the answers never change mid-session. Two
//! things matter to the compositor and emitter:
//!
//! - whether the terminal can show Unicode box drawing (border glyph
//!   selection falls back to ASCII when it cannot)
//! - how many colors it can show (RGB values quantize down to the
//!   xterm 256 cube or the basic 16 palette)
//!
//! Detection is heuristic, from environment variables only. No terminal
//! queries, so a headless run gets conservative defaults.

use std::env;

use crate::types::{BorderStyle, Rgba};

/// Color support level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorDepth {
    /// 24-bit RGB.
    #[default]
    TrueColor,
    /// xterm 256 palette (6x6x6 cube plus grayscale ramp).
    Ansi256,
    /// The basic 16.
    Ansi16,
}

/// Probed terminal capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCaps {
    pub unicode: bool,
    pub color: ColorDepth,
}

impl Default for TermCaps {
    fn default() -> Self {
        Self {
            unicode: true,
            color: ColorDepth::TrueColor,
        }
    }
}

impl TermCaps {
    /// Probe the environment. Called once when the app starts.
    pub fn detect() -> Self {
        Self {
            unicode: detect_unicode(),
            color: detect_color_depth(),
        }
    }

    /// The border style actually drawable on this terminal.
    pub fn border_style(&self, style: BorderStyle) -> BorderStyle {
        if style.is_visible() && !self.unicode {
            BorderStyle::Ascii
        } else {
            style
        }
    }

    /// Reduce a color to what the terminal can show.
    ///
    /// Terminal-default and palette colors pass through; RGB values
    /// quantize when the terminal cannot do 24-bit.
    pub fn quantize(&self, color: Rgba) -> Rgba {
        if color.is_terminal_default() || color.is_ansi() {
            return color;
        }
        match self.color {
            ColorDepth::TrueColor => color,
            ColorDepth::Ansi256 => Rgba::ansi(rgb_to_256(color)),
            ColorDepth::Ansi16 => Rgba::ansi(rgb_to_16(color)),
        }
    }
}

fn detect_unicode() -> bool {
    // LANG/LC_ALL mentioning UTF is the usual signal.
    env::var("LC_ALL")
        .or_else(|_| env::var("LANG"))
        .map(|v| v.to_lowercase().contains("utf"))
        .unwrap_or(false)
}

fn detect_color_depth() -> ColorDepth {
    if let Ok(colorterm) = env::var("COLORTERM") {
        if colorterm == "truecolor" || colorterm == "24bit" {
            return ColorDepth::TrueColor;
        }
    }
    if let Ok(term) = env::var("TERM") {
        let term = term.to_lowercase();
        if term.contains("truecolor") || term.contains("24bit") || term.contains("direct") {
            return ColorDepth::TrueColor;
        }
        if term.contains("256color") {
            return ColorDepth::Ansi256;
        }
        if term == "dumb" || term == "linux" {
            return ColorDepth::Ansi16;
        }
    }
    ColorDepth::Ansi256
}

/// Map RGB to the xterm 256 palette.
///
/// Near-gray values use the grayscale ramp (232..=255), everything else
/// the 6x6x6 color cube (16..=231).
fn rgb_to_256(color: Rgba) -> u8 {
    let (r, g, b) = (color.r as i32, color.g as i32, color.b as i32);

    let spread = r.max(g).max(b) - r.min(g).min(b);
    if spread < 10 {
        let v = (r + g + b) / 3;
        if v < 4 {
            return 16; // cube black
        }
        if v > 247 {
            return 231; // cube white
        }
        return 232 + ((v - 8) / 10).clamp(0, 23) as u8;
    }

    // Cube levels are 0, 95, 135, 175, 215, 255.
    let level = |v: i32| -> i32 {
        if v < 48 {
            0
        } else if v < 115 {
            1
        } else {
            (v - 35) / 40
        }
    };
    (16 + 36 * level(r) + 6 * level(g) + level(b)) as u8
}

/// Map RGB to the basic 16 palette by channel thresholding.
fn rgb_to_16(color: Rgba) -> u8 {
    let (r, g, b) = (color.r as i32, color.g as i32, color.b as i32);
    let index = u8::from(r >= 128) | (u8::from(g >= 128) << 1) | (u8::from(b >= 128) << 2);
    let bright = (r + g + b) / 3 > 180;
    if bright && index != 0 {
        index + 8
    } else {
        index
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truecolor_passes_rgb_through() {
        let caps = TermCaps {
            unicode: true,
            color: ColorDepth::TrueColor,
        };
        let c = Rgba::rgb(250, 100, 20);
        assert_eq!(caps.quantize(c), c);
    }

    #[test]
    fn special_colors_never_quantize() {
        let caps = TermCaps {
            unicode: true,
            color: ColorDepth::Ansi16,
        };
        assert_eq!(caps.quantize(Rgba::TERMINAL_DEFAULT), Rgba::TERMINAL_DEFAULT);
        assert_eq!(caps.quantize(Rgba::ansi(42)), Rgba::ansi(42));
    }

    #[test]
    fn grays_use_the_ramp() {
        let idx = rgb_to_256(Rgba::rgb(128, 128, 128));
        assert!((232..=255).contains(&idx), "got {idx}");
        assert_eq!(rgb_to_256(Rgba::rgb(0, 0, 0)), 16);
        assert_eq!(rgb_to_256(Rgba::rgb(255, 255, 255)), 231);
    }

    #[test]
    fn primaries_land_on_cube_corners() {
        assert_eq!(rgb_to_256(Rgba::rgb(255, 0, 0)), 16 + 36 * 5);
        assert_eq!(rgb_to_256(Rgba::rgb(0, 255, 0)), 16 + 6 * 5);
        assert_eq!(rgb_to_256(Rgba::rgb(0, 0, 255)), 16 + 5);
    }

    #[test]
    fn sixteen_color_thresholding() {
        assert_eq!(rgb_to_16(Rgba::rgb(200, 0, 0)), 1); // red
        assert_eq!(rgb_to_16(Rgba::rgb(0, 200, 0)), 2); // green
        assert_eq!(rgb_to_16(Rgba::rgb(255, 255, 255)), 15); // bright white
        assert_eq!(rgb_to_16(Rgba::rgb(10, 10, 10)), 0); // black
    }

    #[test]
    fn ascii_border_fallback_without_unicode() {
        let caps = TermCaps {
            unicode: false,
            color: ColorDepth::Ansi16,
        };
        assert_eq!(caps.border_style(BorderStyle::Rounded), BorderStyle::Ascii);
        assert_eq!(caps.border_style(BorderStyle::None), BorderStyle::None);

        let unicode_caps = TermCaps::default();
        assert_eq!(unicode_caps.border_style(BorderStyle::Rounded), BorderStyle::Rounded);
    }
}
