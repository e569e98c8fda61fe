//! The application driver.
//!
//! [`App`] wires the pieces together: a [`Runtime`] for reactive state,
//! an [`InputRouter`] for delivery, the terminal mode guard, the stdin
//! reader thread, and the diff renderer. [`App::run`] blocks the
//! calling thread and returns only after the root instance is destroyed
//! and the terminal restored.
//!
//! ```text
//! wait on the channel, bounded by the frame interval
//!   -> decode and dispatch input
//!   -> probe size, coalescing resizes
//!   -> when a render is owed and the rate cap allows:
//!        invoke root -> solve layout -> compose -> diff render
//!        -> drain the effect queue exactly once
//! ```
//!
//! A render becomes owed when anything the last invocation read is
//! written, when the terminal resizes, or on the first pass. Writes are
//! observed through a loop-owned external effect whose dependency set
//! is rebuilt around every root invocation.

use std::cell::{Cell as StdCell, RefCell};
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::input::{InputEvent, InputParser, InputRouter, MouseKind};
use crate::instance::{destroy_root, invoke_root};
use crate::layout::solve;
use crate::reactive::{with_runtime, EffectId, Runtime};
use crate::render::{compose, DiffRenderer, HitMap, TermCaps};
use crate::tree::UiNode;

use super::reader::{ReaderEvent, StdinReader};
use super::terminal::{terminal_size, TerminalModes};

// =============================================================================
// Options
// =============================================================================

/// Loop configuration consumed by [`App::new`]. Defaults describe a
/// full-screen application at 60 fps with mouse capture.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Upper bound on render frequency, frames per second.
    pub max_fps: u32,
    /// Capture mouse clicks, drags and wheel motion.
    pub mouse: bool,
    /// Ask for the kitty keyboard protocol (better modifier and
    /// release reporting on terminals that speak it).
    pub kitty_keyboard: bool,
    /// Render into the alternate screen buffer, restoring the shell's
    /// scrollback on exit.
    pub alt_screen: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_fps: 60,
            mouse: true,
            kitty_keyboard: true,
            alt_screen: true,
        }
    }
}

impl RunOptions {
    /// The shortest allowed gap between two renders.
    pub(crate) fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.max_fps.max(1)))
    }
}

// =============================================================================
// Exit
// =============================================================================

thread_local! {
    static EXIT_STACK: RefCell<Vec<Rc<StdCell<bool>>>> = const { RefCell::new(Vec::new()) };
}

/// Ask the running [`App`] to stop.
///
/// Callable from input handlers and effects. Only a flag is set here;
/// the current tick completes, and teardown (root disposal, terminal
/// restore) happens at the loop boundary. Panics when no app is
/// running on this thread.
pub fn exit() {
    EXIT_STACK.with(|stack| {
        let stack = stack.borrow();
        let flag = stack
            .last()
            .unwrap_or_else(|| panic!("no application is running; exit() works only under App::run"));
        flag.set(true);
    });
}

struct ExitGuard;

impl ExitGuard {
    fn push(flag: Rc<StdCell<bool>>) -> Self {
        EXIT_STACK.with(|stack| stack.borrow_mut().push(flag));
        ExitGuard
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        EXIT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// =============================================================================
// Loop state
// =============================================================================

/// Render loop state. Transitions are logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    /// Nothing owed; the loop is blocked on the channel.
    Idle,
    /// A render is owed: something was written, the terminal resized,
    /// or the first frame has not happened yet.
    Scheduled,
    /// Mid-tick.
    Rendering,
    /// [`exit`] was called; teardown runs at the loop boundary.
    Exited,
}

fn set_state(state: &mut LoopState, next: LoopState) {
    if *state != next {
        log::debug!("loop state {:?} -> {:?}", *state, next);
        *state = next;
    }
}

// =============================================================================
// App
// =============================================================================

/// One running application: root component, reactive runtime, input
/// router, and the render loop that drives them.
///
/// # Example
///
/// ```no_run
/// use glint_tui::input::{on_input, remove_handler};
/// use glint_tui::instance::{use_effect, use_state};
/// use glint_tui::pipeline::{exit, App, RunOptions};
/// use glint_tui::tree::{column, text};
///
/// let app = App::new(RunOptions::default(), || {
///     let count = use_state(|| 0u32);
///     use_effect(move || {
///         let id = on_input(move |ev| {
///             match ev.as_key() {
///                 Some(k) if k.is_char('+') => {
///                     count.update(|n| *n += 1);
///                     true
///                 }
///                 Some(k) if k.is_char('q') => {
///                     exit();
///                     true
///                 }
///                 _ => false,
///             }
///         });
///         move || remove_handler(id)
///     });
///     column()
///         .child(text(format!("count: {}", count.get())))
///         .child(text("press + to count, q to quit"))
/// });
/// app.run().unwrap();
/// ```
pub struct App {
    options: RunOptions,
    root: Box<dyn FnMut() -> UiNode>,
    runtime: Runtime,
    router: InputRouter,
    exit_flag: Rc<StdCell<bool>>,
}

impl App {
    /// Build an application around its root component. Nothing touches
    /// the terminal until [`App::run`].
    pub fn new(options: RunOptions, root: impl FnMut() -> UiNode + 'static) -> Self {
        let runtime = Runtime::new();
        // The router's focus signal lives in this app's runtime, so it
        // must be created with that runtime current.
        let router = runtime.enter(InputRouter::new);
        Self {
            options,
            root: Box::new(root),
            runtime,
            router,
            exit_flag: Rc::new(StdCell::new(false)),
        }
    }

    /// Run until [`exit`]. This is the await-completion call: it blocks
    /// the calling thread and returns only after every effect cleanup
    /// has run and the terminal modes are restored, so callers may
    /// print or exit unconditionally afterwards.
    pub fn run(mut self) -> io::Result<()> {
        let _exit_scope = ExitGuard::push(self.exit_flag.clone());

        let caps = TermCaps::detect();
        let mut modes = TerminalModes::setup(&self.options)?;
        let (tx, rx) = mpsc::channel();
        let mut reader = StdinReader::spawn(tx)?;

        let result = self.drive(&caps, &rx);

        // Teardown order matters: stop feeding input, run every effect
        // cleanup while the runtime and router are still current, then
        // hand the terminal back. Restore runs even when the loop
        // failed; its own errors are swallowed.
        reader.stop();
        self.runtime
            .enter(|| self.router.enter(|| with_runtime(|rt| destroy_root(rt))));
        modes.restore();
        result
    }

    /// The event loop proper. Returns on [`exit`] or I/O failure.
    fn drive(&mut self, caps: &TermCaps, rx: &Receiver<ReaderEvent>) -> io::Result<()> {
        let interval = self.options.frame_interval();
        let mut parser = InputParser::new();
        let mut renderer = DiffRenderer::new(*caps);
        let mut hits = HitMap::default();
        let mut state = LoopState::Scheduled; // first frame is owed
        let mut size = terminal_size();
        let mut resized = false;
        let mut last_tick: Option<Instant> = None;
        let mut last_clamped: u32 = 0;

        // Loop-owned marker: its dependency set is rebuilt around every
        // root invocation, so a write to anything the UI read lands
        // here at the drain and owes a render.
        let dirty = Rc::new(StdCell::new(false));
        let marker = {
            let dirty = dirty.clone();
            self.runtime
                .inner()
                .spawn_external_effect(move || dirty.set(true))
        };

        while state != LoopState::Exited {
            // One bounded wait covers input arrival, the rate cap, and
            // the escape-sequence decode timeout.
            let wait = match state {
                LoopState::Scheduled => {
                    let since = last_tick.map(|t| t.elapsed()).unwrap_or(interval);
                    interval.saturating_sub(since)
                }
                _ => interval,
            };
            match rx.recv_timeout(wait) {
                Ok(ReaderEvent::Input(bytes)) => {
                    let events = parser.parse(&bytes);
                    self.dispatch(&events, &hits);
                }
                Ok(ReaderEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                    // Stdin is gone for good; nothing can drive the app
                    // anymore.
                    self.exit_flag.set(true);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if parser.has_pending() {
                        let events = parser.flush_pending();
                        self.dispatch(&events, &hits);
                    }
                }
            }

            if self.exit_flag.get() {
                set_state(&mut state, LoopState::Exited);
                break;
            }

            // Sizes coalesce: however many resizes happened since the
            // last wake, only the latest probe is applied, at the tick
            // boundary.
            let probed = terminal_size();
            if probed != size {
                size = probed;
                resized = true;
            }

            if state == LoopState::Idle
                && (resized || dirty.get() || self.runtime.has_pending())
            {
                set_state(&mut state, LoopState::Scheduled);
            }

            if state == LoopState::Scheduled
                && last_tick.is_none_or(|t| t.elapsed() >= interval)
            {
                set_state(&mut state, LoopState::Rendering);
                dirty.set(false);
                if resized {
                    renderer.invalidate();
                    resized = false;
                }
                hits = self.tick(marker, caps, &mut renderer, size, &mut last_clamped)?;
                last_tick = Some(Instant::now());
                let next = if dirty.get() {
                    // An effect at the drain wrote something the UI
                    // reads; another render is already owed.
                    LoopState::Scheduled
                } else {
                    LoopState::Idle
                };
                set_state(&mut state, next);
            }

            if self.exit_flag.get() {
                set_state(&mut state, LoopState::Exited);
            }
        }
        Ok(())
    }

    /// One tick: invoke, layout, compose, render, drain once.
    fn tick(
        &mut self,
        marker: EffectId,
        caps: &TermCaps,
        renderer: &mut DiffRenderer,
        size: (u16, u16),
        last_clamped: &mut u32,
    ) -> io::Result<HitMap> {
        let (width, height) = size;

        let root = &mut self.root;
        let tree = self.runtime.enter(|| {
            self.router.enter(|| {
                with_runtime(|rt| {
                    // Withdraw the pre-tick notification, if any; this
                    // invocation observes what it reported.
                    rt.acknowledge(marker);
                    rt.run_tracked(marker, || invoke_root(|| root()))
                })
            })
        });

        let layout = solve(&tree, width, height);
        if layout.clamped != *last_clamped {
            if layout.clamped > 0 {
                log::warn!(
                    "layout clamped {} box(es) to zero size; constraints exceed the {}x{} terminal",
                    layout.clamped,
                    width,
                    height
                );
            }
            *last_clamped = layout.clamped;
        }

        let (frame, hit_map) = compose(&layout, caps, width, height);
        let mut stdout = io::stdout().lock();
        renderer.render(&frame, &mut stdout)?;
        drop(stdout);

        // Exactly one drain per tick: effects queued by this tick's
        // writes observe the frame that was just committed. The router
        // stays current because draining effects may register or
        // remove handlers.
        self.router.enter(|| self.runtime.flush());
        Ok(hit_map)
    }

    /// Deliver decoded events. Mouse presses run click-to-focus through
    /// the hit grid first; an unconsumed Ctrl+C asks the app to exit.
    fn dispatch(&self, events: &[InputEvent], hits: &HitMap) {
        self.runtime.enter(|| {
            for event in events {
                if let Some(mouse) = event.as_mouse() {
                    if matches!(mouse.kind, MouseKind::Press(_)) {
                        if let Some(id) = hits.hit(mouse.x, mouse.y) {
                            self.router.focus_click(id);
                        }
                    }
                }
                let consumed = self.router.route(event);
                if !consumed {
                    if let Some(key) = event.as_key() {
                        if key.is_press() && key.is_ctrl('c') {
                            self.exit_flag.set(true);
                        }
                    }
                }
            }
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        on_input_blocking, register_focusable, KeyCode, KeyEvent, Modifiers, MouseButton,
        MouseEvent,
    };
    use crate::tree::{container, text};

    fn test_app() -> App {
        App::new(RunOptions::default(), || text("x"))
    }

    fn ctrl_c() -> InputEvent {
        InputEvent::Key(KeyEvent::new(KeyCode::Char('c'), Modifiers::CTRL))
    }

    fn click(x: u16, y: u16) -> InputEvent {
        InputEvent::Mouse(MouseEvent {
            kind: MouseKind::Press(MouseButton::Left),
            x,
            y,
            modifiers: Modifiers::NONE,
        })
    }

    #[test]
    fn default_options_describe_a_fullscreen_60fps_app() {
        let options = RunOptions::default();
        assert_eq!(options.max_fps, 60);
        assert!(options.mouse);
        assert!(options.kitty_keyboard);
        assert!(options.alt_screen);
        assert_eq!(options.frame_interval(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn frame_interval_survives_a_zero_fps_cap() {
        let options = RunOptions {
            max_fps: 0,
            ..RunOptions::default()
        };
        assert_eq!(options.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    #[should_panic(expected = "no application is running")]
    fn exit_outside_an_app_panics() {
        exit();
    }

    #[test]
    fn exit_sets_the_scoped_flag() {
        let flag = Rc::new(StdCell::new(false));
        let _scope = ExitGuard::push(flag.clone());
        exit();
        assert!(flag.get());
    }

    #[test]
    fn unconsumed_ctrl_c_requests_exit() {
        let app = test_app();
        app.dispatch(&[ctrl_c()], &HitMap::default());
        assert!(app.exit_flag.get());
    }

    #[test]
    fn consumed_ctrl_c_keeps_running() {
        let app = test_app();
        app.runtime.enter(|| {
            app.router.enter(|| {
                on_input_blocking(|_| true);
            })
        });
        app.dispatch(&[ctrl_c()], &HitMap::default());
        assert!(!app.exit_flag.get());
    }

    #[test]
    fn mouse_press_focuses_the_hit_id() {
        let app = test_app();
        app.runtime.enter(|| {
            app.router.enter(|| {
                register_focusable("btn");
            })
        });

        let tree = container().child(text("B").id("btn"));
        let layout = solve(&tree, 10, 3);
        let (_, hits) = compose(&layout, &TermCaps::default(), 10, 3);
        assert_eq!(hits.hit(0, 0), Some("btn"));

        app.dispatch(&[click(0, 0)], &hits);
        assert_eq!(
            app.runtime.enter(|| app.router.focused()),
            Some("btn".to_string())
        );
    }

    #[test]
    fn press_elsewhere_leaves_focus_alone() {
        let app = test_app();
        app.runtime.enter(|| {
            app.router.enter(|| {
                register_focusable("btn");
            })
        });

        let tree = container().child(text("B").id("btn"));
        let layout = solve(&tree, 10, 3);
        let (_, hits) = compose(&layout, &TermCaps::default(), 10, 3);

        app.dispatch(&[click(9, 2)], &hits);
        assert_eq!(app.runtime.enter(|| app.router.focused()), None);
    }
}
