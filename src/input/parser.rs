//! Escape sequence decoder for the raw terminal byte stream.
//!
//! A finite-state parser: printable bytes and UTF-8 sequences are
//! literal characters; an ESC byte opens an accumulation that ends at a
//! recognized terminator. Understood grammars:
//! - CSI cursor/function keys, with the parameter-encoded modifier
//!   bitfield (`ESC [ 1 ; 5 A` is Ctrl+Up)
//! - SS3 keys (`ESC O P` is F1)
//! - SGR mouse (`ESC [ < b ; x ; y M/m`) and legacy X10 mouse
//! - Kitty keyboard protocol (`u` terminator: codepoint, modifiers,
//!   press/repeat/release)
//! - Alt-prefixed printables, focus in/out reports
//! - Bracketed paste: everything between the `200~`/`201~` delimiters
//!   becomes one [`InputEvent::Paste`] string
//!
//! Reads come off a pipe and may split a sequence anywhere, so an
//! unterminated accumulation is kept across [`InputParser::parse`] calls.
//! Two bail-outs keep it from wedging: a buffer longer than
//! [`MAX_SEQUENCE`] is dropped outright, and the caller flushes on a
//! short timeout via [`InputParser::flush_pending`], which turns a lone
//! ESC into a real Escape keypress and drops anything else.

use super::events::{InputEvent, KeyCode, KeyEvent, KeyState, Modifiers, MouseButton, MouseEvent, MouseKind};

/// Longest escape sequence the accumulation buffer will hold. Paste
/// bodies are exempt; they accumulate separately and are unbounded.
const MAX_SEQUENCE: usize = 64;

const PASTE_END: &[u8] = b"\x1b[201~";

// =============================================================================
// Parser
// =============================================================================

/// Input decoder state machine.
pub struct InputParser {
    buf: Vec<u8>,
    /// Paste body under accumulation, `Some` between the delimiters.
    paste: Option<Vec<u8>>,
}

impl InputParser {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
            paste: None,
        }
    }

    /// Feed raw bytes and collect every event they complete. Incomplete
    /// trailing sequences stay buffered for the next call.
    pub fn parse(&mut self, data: &[u8]) -> Vec<InputEvent> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();

        loop {
            if self.paste.is_some() {
                match self.take_paste() {
                    Some(ev) => events.push(ev),
                    None => break,
                }
                continue;
            }
            if self.buf.is_empty() {
                break;
            }
            match self.step() {
                Step::Event(ev) => events.push(ev),
                Step::Skip => {}
                Step::Incomplete => {
                    if self.buf.len() > MAX_SEQUENCE {
                        log::trace!("dropping {} bytes of unterminated escape input", self.buf.len());
                        self.buf.clear();
                    }
                    break;
                }
            }
        }

        events
    }

    /// Whether an incomplete escape accumulation is waiting on more
    /// bytes. The caller arms a short timeout when this is true.
    pub fn has_pending(&self) -> bool {
        self.paste.is_none() && !self.buf.is_empty()
    }

    /// Timeout expiry: a buffer holding exactly one ESC was a genuine
    /// Escape keypress; anything longer is a truncated sequence and is
    /// dropped. An active paste is left alone to wait for its
    /// terminator.
    pub fn flush_pending(&mut self) -> Vec<InputEvent> {
        if self.paste.is_some() {
            return Vec::new();
        }
        let lone_esc = self.buf == [0x1B];
        if !self.buf.is_empty() && !lone_esc {
            log::trace!("dropping {} bytes of stalled escape input", self.buf.len());
        }
        self.buf.clear();
        if lone_esc {
            vec![key(KeyCode::Escape, Modifiers::NONE)]
        } else {
            Vec::new()
        }
    }

    // -------------------------------------------------------------------------
    // Bracketed paste
    // -------------------------------------------------------------------------

    /// Move buffered bytes into the paste body; emit the finished paste
    /// once the end delimiter shows up.
    fn take_paste(&mut self) -> Option<InputEvent> {
        if let Some(pos) = find_marker(&self.buf, PASTE_END) {
            if let Some(body) = self.paste.as_mut() {
                body.extend_from_slice(&self.buf[..pos]);
            }
            self.buf.drain(..pos + PASTE_END.len());
            let body = self.paste.take().unwrap_or_default();
            Some(InputEvent::Paste(String::from_utf8_lossy(&body).into_owned()))
        } else {
            // Keep any tail that could be the start of the delimiter.
            let keep = trailing_marker_prefix(&self.buf, PASTE_END);
            let absorb = self.buf.len() - keep;
            if absorb > 0 {
                if let Some(body) = self.paste.as_mut() {
                    body.extend_from_slice(&self.buf[..absorb]);
                }
                self.buf.drain(..absorb);
            }
            None
        }
    }

    // -------------------------------------------------------------------------
    // One token
    // -------------------------------------------------------------------------

    fn step(&mut self) -> Step {
        let first = self.buf[0];

        match first {
            0x1B => self.escape(),
            0x00 => {
                self.consume(1);
                Step::Event(key(KeyCode::Null, Modifiers::CTRL))
            }
            0x01..=0x07 | 0x0B..=0x0C | 0x0E..=0x1A => {
                let ch = (first + b'a' - 1) as char;
                self.consume(1);
                Step::Event(key(KeyCode::Char(ch), Modifiers::CTRL))
            }
            0x08 | 0x7F => {
                self.consume(1);
                Step::Event(key(KeyCode::Backspace, Modifiers::NONE))
            }
            0x09 => {
                self.consume(1);
                Step::Event(key(KeyCode::Tab, Modifiers::NONE))
            }
            0x0A | 0x0D => {
                self.consume(1);
                Step::Event(key(KeyCode::Enter, Modifiers::NONE))
            }
            0x20..=0x7E => {
                let ch = first as char;
                self.consume(1);
                Step::Event(key(KeyCode::Char(ch), Modifiers::NONE))
            }
            0x80..=0xFF => self.utf8(),
            _ => {
                self.consume(1);
                Step::Skip
            }
        }
    }

    fn escape(&mut self) -> Step {
        if self.buf.len() < 2 {
            return Step::Incomplete;
        }

        match self.buf[1] {
            b'[' => self.csi(),
            b'O' => self.ss3(),
            // Alt+printable
            0x20..=0x7E => {
                let ch = self.buf[1] as char;
                self.consume(2);
                Step::Event(key(KeyCode::Char(ch), Modifiers::ALT))
            }
            0x1B => {
                self.consume(2);
                Step::Event(key(KeyCode::Escape, Modifiers::ALT))
            }
            _ => {
                self.consume(1);
                Step::Event(key(KeyCode::Escape, Modifiers::NONE))
            }
        }
    }

    fn csi(&mut self) -> Step {
        if self.buf.len() < 3 {
            return Step::Incomplete;
        }

        match self.buf[2] {
            b'<' => return self.sgr_mouse(),
            b'M' => return self.x10_mouse(),
            b'I' => {
                self.consume(3);
                return Step::Event(InputEvent::FocusGained);
            }
            b'O' => {
                self.consume(3);
                return Step::Event(InputEvent::FocusLost);
            }
            _ => {}
        }

        // Scan for the final byte.
        let mut end = 2;
        while end < self.buf.len() {
            if (0x40..=0x7E).contains(&self.buf[end]) {
                break;
            }
            end += 1;
        }
        if end >= self.buf.len() {
            return Step::Incomplete;
        }

        let final_byte = self.buf[end];
        let params_str = String::from_utf8_lossy(&self.buf[2..end]).to_string();
        let params: Vec<u32> = params_str
            .split(';')
            .map(|s| s.parse::<u32>().unwrap_or(0))
            .collect();
        let consumed = end + 1;

        // Paste delimiters switch the accumulation mode; everything in
        // between becomes one Paste event.
        if final_byte == b'~' && params.first() == Some(&200) {
            self.consume(consumed);
            self.paste = Some(Vec::new());
            return Step::Skip;
        }
        if final_byte == b'~' && params.first() == Some(&201) {
            // Stray end delimiter outside a paste.
            self.consume(consumed);
            return Step::Skip;
        }

        if final_byte == b'u' {
            self.consume(consumed);
            return self.kitty_key(&params);
        }

        let modifiers = if params.len() >= 2 && params[1] > 0 {
            decode_modifiers(params[1])
        } else {
            Modifiers::NONE
        };

        let event = match final_byte {
            b'A' => Some(key(KeyCode::Up, modifiers)),
            b'B' => Some(key(KeyCode::Down, modifiers)),
            b'C' => Some(key(KeyCode::Right, modifiers)),
            b'D' => Some(key(KeyCode::Left, modifiers)),
            b'H' => Some(key(KeyCode::Home, modifiers)),
            b'F' => Some(key(KeyCode::End, modifiers)),
            b'P' => Some(key(KeyCode::F(1), modifiers)),
            b'Q' => Some(key(KeyCode::F(2), modifiers)),
            b'R' => Some(key(KeyCode::F(3), modifiers)),
            b'S' => Some(key(KeyCode::F(4), modifiers)),
            b'Z' => Some(key(KeyCode::Tab, Modifiers::SHIFT)),
            b'~' => match params.first().copied().unwrap_or(0) {
                1 => Some(key(KeyCode::Home, modifiers)),
                2 => Some(key(KeyCode::Insert, modifiers)),
                3 => Some(key(KeyCode::Delete, modifiers)),
                4 => Some(key(KeyCode::End, modifiers)),
                5 => Some(key(KeyCode::PageUp, modifiers)),
                6 => Some(key(KeyCode::PageDown, modifiers)),
                15 => Some(key(KeyCode::F(5), modifiers)),
                17 => Some(key(KeyCode::F(6), modifiers)),
                18 => Some(key(KeyCode::F(7), modifiers)),
                19 => Some(key(KeyCode::F(8), modifiers)),
                20 => Some(key(KeyCode::F(9), modifiers)),
                21 => Some(key(KeyCode::F(10), modifiers)),
                23 => Some(key(KeyCode::F(11), modifiers)),
                24 => Some(key(KeyCode::F(12), modifiers)),
                _ => None,
            },
            _ => None,
        };

        self.consume(consumed);
        match event {
            Some(ev) => Step::Event(ev),
            None => Step::Skip,
        }
    }

    fn ss3(&mut self) -> Step {
        if self.buf.len() < 3 {
            return Step::Incomplete;
        }

        let event = match self.buf[2] {
            b'A' => Some(key(KeyCode::Up, Modifiers::NONE)),
            b'B' => Some(key(KeyCode::Down, Modifiers::NONE)),
            b'C' => Some(key(KeyCode::Right, Modifiers::NONE)),
            b'D' => Some(key(KeyCode::Left, Modifiers::NONE)),
            b'H' => Some(key(KeyCode::Home, Modifiers::NONE)),
            b'F' => Some(key(KeyCode::End, Modifiers::NONE)),
            b'P' => Some(key(KeyCode::F(1), Modifiers::NONE)),
            b'Q' => Some(key(KeyCode::F(2), Modifiers::NONE)),
            b'R' => Some(key(KeyCode::F(3), Modifiers::NONE)),
            b'S' => Some(key(KeyCode::F(4), Modifiers::NONE)),
            _ => None,
        };

        self.consume(3);
        match event {
            Some(ev) => Step::Event(ev),
            None => Step::Skip,
        }
    }

    /// SGR mouse: `ESC [ < Pb ; Px ; Py M/m`, `m` marks a release.
    fn sgr_mouse(&mut self) -> Step {
        let start = 3;
        let mut end = start;
        while end < self.buf.len() {
            if self.buf[end] == b'M' || self.buf[end] == b'm' {
                break;
            }
            end += 1;
        }
        if end >= self.buf.len() {
            return Step::Incomplete;
        }

        let is_release = self.buf[end] == b'm';
        let params_str = String::from_utf8_lossy(&self.buf[start..end]).to_string();
        let parts: Vec<u16> = params_str.split(';').map(|s| s.parse().unwrap_or(0)).collect();
        self.consume(end + 1);

        if parts.len() < 3 {
            return Step::Skip;
        }

        let cb = parts[0];
        // Reports are 1-indexed.
        let x = parts[1].saturating_sub(1);
        let y = parts[2].saturating_sub(1);
        let modifiers = mouse_modifiers(cb);

        let base = cb & 3;
        let kind = if cb & 64 != 0 {
            match base {
                0 => MouseKind::ScrollUp,
                _ => MouseKind::ScrollDown,
            }
        } else if cb & 32 != 0 {
            if base == 3 {
                MouseKind::Move
            } else {
                MouseKind::Drag(button_of(base))
            }
        } else if is_release {
            MouseKind::Release(button_of(base))
        } else {
            MouseKind::Press(button_of(base))
        };

        Step::Event(InputEvent::Mouse(MouseEvent { kind, x, y, modifiers }))
    }

    /// Legacy X10 mouse: `ESC [ M Cb Cx Cy`, six fixed bytes.
    fn x10_mouse(&mut self) -> Step {
        if self.buf.len() < 6 {
            return Step::Incomplete;
        }

        let cb = self.buf[3].wrapping_sub(32) as u16;
        let x = self.buf[4].wrapping_sub(33) as u16;
        let y = self.buf[5].wrapping_sub(33) as u16;
        self.consume(6);

        let modifiers = mouse_modifiers(cb);
        let base = cb & 3;
        let kind = if cb & 64 != 0 {
            match base {
                0 => MouseKind::ScrollUp,
                _ => MouseKind::ScrollDown,
            }
        } else if base == 3 {
            // X10 does not say which button was released.
            MouseKind::Release(MouseButton::Left)
        } else {
            MouseKind::Press(button_of(base))
        };

        Step::Event(InputEvent::Mouse(MouseEvent { kind, x, y, modifiers }))
    }

    /// Kitty `u` terminator: `codepoint ; modifiers ; state`.
    fn kitty_key(&self, params: &[u32]) -> Step {
        let codepoint = params.first().copied().unwrap_or(0);
        let modifiers = if params.len() >= 2 {
            decode_modifiers(params[1])
        } else {
            Modifiers::NONE
        };
        let state = if params.len() >= 3 {
            match params[2] {
                2 => KeyState::Repeat,
                3 => KeyState::Release,
                _ => KeyState::Press,
            }
        } else {
            KeyState::Press
        };

        let code = match codepoint {
            9 => KeyCode::Tab,
            13 => KeyCode::Enter,
            27 => KeyCode::Escape,
            127 => KeyCode::Backspace,
            cp => match char::from_u32(cp) {
                Some(ch) => KeyCode::Char(ch),
                None => KeyCode::Null,
            },
        };

        Step::Event(InputEvent::Key(KeyEvent { code, modifiers, state }))
    }

    fn utf8(&mut self) -> Step {
        let first = self.buf[0];
        let expected = if first & 0xE0 == 0xC0 {
            2
        } else if first & 0xF0 == 0xE0 {
            3
        } else if first & 0xF8 == 0xF0 {
            4
        } else {
            // Stray continuation byte.
            self.consume(1);
            return Step::Skip;
        };

        if self.buf.len() < expected {
            return Step::Incomplete;
        }

        let s = String::from_utf8_lossy(&self.buf[..expected]).to_string();
        self.consume(expected);

        match s.chars().next() {
            Some(ch) => Step::Event(key(KeyCode::Char(ch), Modifiers::NONE)),
            None => Step::Skip,
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
    }
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Helpers
// =============================================================================

enum Step {
    Event(InputEvent),
    /// Consumed bytes, nothing to report.
    Skip,
    /// Needs more bytes; buffer untouched.
    Incomplete,
}

fn key(code: KeyCode, modifiers: Modifiers) -> InputEvent {
    InputEvent::Key(KeyEvent::new(code, modifiers))
}

fn button_of(base: u16) -> MouseButton {
    match base {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        _ => MouseButton::Right,
    }
}

fn mouse_modifiers(cb: u16) -> Modifiers {
    let mut m = Modifiers::NONE;
    if cb & 4 != 0 {
        m |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        m |= Modifiers::ALT;
    }
    if cb & 16 != 0 {
        m |= Modifiers::CTRL;
    }
    m
}

/// Decode the CSI modifier parameter (1-based bitfield).
fn decode_modifiers(param: u32) -> Modifiers {
    let val = param.saturating_sub(1);
    let mut m = Modifiers::NONE;
    if val & 1 != 0 {
        m |= Modifiers::SHIFT;
    }
    if val & 2 != 0 {
        m |= Modifiers::ALT;
    }
    if val & 4 != 0 {
        m |= Modifiers::CTRL;
    }
    if val & 8 != 0 {
        m |= Modifiers::SUPER;
    }
    m
}

fn find_marker(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest proper suffix of `buf` that is a prefix of
/// `marker`.
fn trailing_marker_prefix(buf: &[u8], marker: &[u8]) -> usize {
    let max = marker.len().saturating_sub(1).min(buf.len());
    for len in (1..=max).rev() {
        if buf[buf.len() - len..] == marker[..len] {
            return len;
        }
    }
    0
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_bytes(data: &[u8]) -> Vec<InputEvent> {
        let mut parser = InputParser::new();
        parser.parse(data)
    }

    #[test]
    fn ascii_chars_parse_individually() {
        let events = parse_bytes(b"abc");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], key(KeyCode::Char('a'), Modifiers::NONE));
        assert_eq!(events[2], key(KeyCode::Char('c'), Modifiers::NONE));
    }

    #[test]
    fn control_bytes_map_to_named_keys() {
        assert_eq!(parse_bytes(b"\x03")[0], key(KeyCode::Char('c'), Modifiers::CTRL));
        assert_eq!(parse_bytes(b"\r")[0], key(KeyCode::Enter, Modifiers::NONE));
        assert_eq!(parse_bytes(b"\t")[0], key(KeyCode::Tab, Modifiers::NONE));
        assert_eq!(parse_bytes(b"\x7f")[0], key(KeyCode::Backspace, Modifiers::NONE));
    }

    #[test]
    fn arrow_keys_decode() {
        assert_eq!(parse_bytes(b"\x1b[A")[0], key(KeyCode::Up, Modifiers::NONE));
        assert_eq!(parse_bytes(b"\x1b[B")[0], key(KeyCode::Down, Modifiers::NONE));
        assert_eq!(parse_bytes(b"\x1b[C")[0], key(KeyCode::Right, Modifiers::NONE));
        assert_eq!(parse_bytes(b"\x1b[D")[0], key(KeyCode::Left, Modifiers::NONE));
    }

    #[test]
    fn function_keys_decode() {
        assert_eq!(parse_bytes(b"\x1bOP")[0], key(KeyCode::F(1), Modifiers::NONE));
        assert_eq!(parse_bytes(b"\x1b[15~")[0], key(KeyCode::F(5), Modifiers::NONE));
        assert_eq!(parse_bytes(b"\x1b[24~")[0], key(KeyCode::F(12), Modifiers::NONE));
    }

    #[test]
    fn csi_modifier_bitfield_decodes() {
        assert_eq!(parse_bytes(b"\x1b[1;5A")[0], key(KeyCode::Up, Modifiers::CTRL));
        assert_eq!(parse_bytes(b"\x1b[1;2C")[0], key(KeyCode::Right, Modifiers::SHIFT));
        assert_eq!(
            parse_bytes(b"\x1b[1;8D")[0],
            key(KeyCode::Left, Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL)
        );
    }

    #[test]
    fn shift_tab_decodes() {
        assert_eq!(parse_bytes(b"\x1b[Z")[0], key(KeyCode::Tab, Modifiers::SHIFT));
    }

    #[test]
    fn alt_prefixed_char_decodes() {
        assert_eq!(parse_bytes(b"\x1bx")[0], key(KeyCode::Char('x'), Modifiers::ALT));
    }

    #[test]
    fn utf8_multibyte_char_decodes() {
        let events = parse_bytes("é日".as_bytes());
        assert_eq!(events[0], key(KeyCode::Char('é'), Modifiers::NONE));
        assert_eq!(events[1], key(KeyCode::Char('日'), Modifiers::NONE));
    }

    #[test]
    fn sgr_mouse_press_and_release() {
        let events = parse_bytes(b"\x1b[<0;10;20M");
        assert_eq!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                kind: MouseKind::Press(MouseButton::Left),
                x: 9,
                y: 19,
                modifiers: Modifiers::NONE,
            })
        );

        let events = parse_bytes(b"\x1b[<2;1;1m");
        assert_eq!(
            events[0].as_mouse().map(|m| m.kind),
            Some(MouseKind::Release(MouseButton::Right))
        );
    }

    #[test]
    fn sgr_motion_splits_drag_from_move() {
        let events = parse_bytes(b"\x1b[<32;5;6M");
        assert_eq!(events[0].as_mouse().map(|m| m.kind), Some(MouseKind::Drag(MouseButton::Left)));

        let events = parse_bytes(b"\x1b[<35;5;6M");
        assert_eq!(events[0].as_mouse().map(|m| m.kind), Some(MouseKind::Move));
    }

    #[test]
    fn sgr_scroll_wheel_decodes() {
        assert_eq!(
            parse_bytes(b"\x1b[<64;10;20M")[0].as_mouse().map(|m| m.kind),
            Some(MouseKind::ScrollUp)
        );
        assert_eq!(
            parse_bytes(b"\x1b[<65;10;20M")[0].as_mouse().map(|m| m.kind),
            Some(MouseKind::ScrollDown)
        );
    }

    #[test]
    fn x10_mouse_decodes() {
        // Cb=32 (press left), Cx=43, Cy=53 → cell (10, 20).
        let events = parse_bytes(&[0x1B, b'[', b'M', 32, 43, 53]);
        assert_eq!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                kind: MouseKind::Press(MouseButton::Left),
                x: 10,
                y: 20,
                modifiers: Modifiers::NONE,
            })
        );
    }

    #[test]
    fn kitty_u_terminator_decodes() {
        assert_eq!(parse_bytes(b"\x1b[97;5u")[0], key(KeyCode::Char('a'), Modifiers::CTRL));

        let events = parse_bytes(b"\x1b[97;1;3u");
        assert_eq!(
            events[0],
            InputEvent::Key(KeyEvent {
                code: KeyCode::Char('a'),
                modifiers: Modifiers::NONE,
                state: KeyState::Release,
            })
        );
    }

    #[test]
    fn focus_reports_decode() {
        assert_eq!(parse_bytes(b"\x1b[I")[0], InputEvent::FocusGained);
        assert_eq!(parse_bytes(b"\x1b[O")[0], InputEvent::FocusLost);
    }

    #[test]
    fn bracketed_paste_is_one_event() {
        let events = parse_bytes(b"\x1b[200~hello\nworld\x1b[201~");
        assert_eq!(events, vec![InputEvent::Paste(String::from("hello\nworld"))]);
    }

    #[test]
    fn paste_survives_split_reads() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[200~abc").is_empty());
        // Split inside the end delimiter itself.
        assert!(parser.parse(b"def\x1b[20").is_empty());
        let events = parser.parse(b"1~x");
        assert_eq!(
            events,
            vec![
                InputEvent::Paste(String::from("abcdef")),
                key(KeyCode::Char('x'), Modifiers::NONE),
            ]
        );
    }

    #[test]
    fn incomplete_sequence_waits_for_more_bytes() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[").is_empty());
        assert!(parser.has_pending());
        assert_eq!(parser.parse(b"A")[0], key(KeyCode::Up, Modifiers::NONE));
        assert!(!parser.has_pending());
    }

    #[test]
    fn lone_escape_flushes_as_escape_key() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b").is_empty());
        assert!(parser.has_pending());
        assert_eq!(parser.flush_pending(), vec![key(KeyCode::Escape, Modifiers::NONE)]);
        assert!(!parser.has_pending());
    }

    #[test]
    fn truncated_sequence_drops_on_flush() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[1;2").is_empty());
        assert!(parser.flush_pending().is_empty());
        assert!(!parser.has_pending());
    }

    #[test]
    fn oversized_accumulation_is_dropped() {
        let mut parser = InputParser::new();
        let mut garbage = b"\x1b[".to_vec();
        garbage.extend(vec![b'1'; 80]);
        assert!(parser.parse(&garbage).is_empty());
        assert!(!parser.has_pending());
        // The decoder recovers for the next read.
        assert_eq!(parser.parse(b"a")[0], key(KeyCode::Char('a'), Modifiers::NONE));
    }

    #[test]
    fn modifier_decode_matches_bitfield() {
        assert_eq!(decode_modifiers(2), Modifiers::SHIFT);
        assert_eq!(decode_modifiers(3), Modifiers::ALT);
        assert_eq!(decode_modifiers(5), Modifiers::CTRL);
        assert_eq!(decode_modifiers(9), Modifiers::SUPER);
    }
}
