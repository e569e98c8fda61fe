//! Terminal mode control.
//!
//! Raw mode through termios, window size through `TIOCGWINSZ`, and the
//! escape-toggled protocols (alternate screen, cursor visibility, mouse
//! tracking, kitty keyboard, bracketed paste, focus reports). Setup
//! order reverses exactly on restore. Restore never fails: it runs
//! while the process is leaving, and a dead pipe must not mask the real
//! reason we are going.

use std::io;

use crate::render::ansi;
use crate::render::OutputBuffer;

use super::app::RunOptions;

/// Everything [`TerminalModes::setup`] changed, so restore can undo
/// exactly that and nothing else.
pub(crate) struct TerminalModes {
    #[cfg(unix)]
    saved: Option<libc::termios>,
    alt_screen: bool,
    mouse: bool,
    kitty_keyboard: bool,
    restored: bool,
}

impl TerminalModes {
    /// Switch the terminal into application mode per `options`.
    ///
    /// When stdin is not a TTY (piped input, CI) raw mode is skipped
    /// and the app still renders; it just won't receive keyboard input.
    pub(crate) fn setup(options: &RunOptions) -> io::Result<Self> {
        let mut modes = Self {
            #[cfg(unix)]
            saved: None,
            alt_screen: options.alt_screen,
            mouse: options.mouse,
            kitty_keyboard: options.kitty_keyboard,
            restored: false,
        };
        modes.enable_raw()?;

        let mut out = OutputBuffer::new();
        if options.alt_screen {
            ansi::enter_alt_screen(&mut out)?;
        }
        ansi::cursor_hide(&mut out)?;
        ansi::clear_screen(&mut out)?;
        if options.mouse {
            ansi::enable_mouse(&mut out)?;
        }
        if options.kitty_keyboard {
            ansi::enable_kitty_keyboard(&mut out)?;
        }
        ansi::enable_bracketed_paste(&mut out)?;
        ansi::enable_focus_reporting(&mut out)?;

        let mut stdout = io::stdout().lock();
        out.flush_to(&mut stdout)?;
        Ok(modes)
    }

    /// Undo setup in reverse order, best effort, idempotent.
    pub(crate) fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;

        let mut out = OutputBuffer::new();
        ansi::disable_focus_reporting(&mut out).ok();
        ansi::disable_bracketed_paste(&mut out).ok();
        if self.kitty_keyboard {
            ansi::disable_kitty_keyboard(&mut out).ok();
        }
        if self.mouse {
            ansi::disable_mouse(&mut out).ok();
        }
        ansi::reset(&mut out).ok();
        ansi::cursor_show(&mut out).ok();
        if self.alt_screen {
            ansi::exit_alt_screen(&mut out).ok();
        }
        let mut stdout = io::stdout().lock();
        out.flush_to(&mut stdout).ok();

        self.disable_raw();
    }

    fn enable_raw(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            let fd = io::stdin().as_raw_fd();
            if unsafe { libc::isatty(fd) } == 0 {
                return Ok(());
            }
            unsafe {
                let mut termios: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(fd, &mut termios) != 0 {
                    return Err(io::Error::last_os_error());
                }
                self.saved = Some(termios);

                termios.c_iflag &= !(libc::IGNBRK
                    | libc::BRKINT
                    | libc::PARMRK
                    | libc::ISTRIP
                    | libc::INLCR
                    | libc::IGNCR
                    | libc::ICRNL
                    | libc::IXON);
                termios.c_oflag &= !libc::OPOST;
                termios.c_lflag &=
                    !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
                termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
                termios.c_cflag |= libc::CS8;
                // The reader thread polls before reading, so reads may
                // block until a full byte arrives.
                termios.c_cc[libc::VMIN] = 1;
                termios.c_cc[libc::VTIME] = 0;

                if libc::tcsetattr(fd, libc::TCSAFLUSH, &termios) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }
        Ok(())
    }

    fn disable_raw(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            if let Some(saved) = self.saved.take() {
                let fd = io::stdin().as_raw_fd();
                unsafe {
                    libc::tcsetattr(fd, libc::TCSAFLUSH, &saved);
                }
            }
        }
    }
}

impl Drop for TerminalModes {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Probe the window size. Falls back to 80x24 when the terminal will
/// not say (not a TTY, or the ioctl failed).
pub(crate) fn terminal_size() -> (u16, u16) {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdout().as_raw_fd();
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } == 0
            && ws.ws_col > 0
            && ws.ws_row > 0
        {
            return (ws.ws_col, ws.ws_row);
        }
    }
    (80, 24)
}
