//! Handler registration and event delivery.
//!
//! Handlers join a router; delivery walks the blocking set first (most
//! recent first), then every other handler most-recently-registered
//! first. A handler returning `true` consumes the event and stops the
//! walk. Scoped handlers only see events while their id holds focus.
//! Tab and Shift+Tab that no handler consumed step the focus ring.
//!
//! Registration normally happens inside an effect, with a cleanup that
//! removes the handler, so handler lifetime follows the owning
//! component. The free functions resolve the router the same way the
//! reactive free functions resolve their runtime: through a scoped
//! stack pushed by [`InputRouter::enter`].

use std::cell::RefCell;
use std::rc::Rc;

use super::events::{InputEvent, KeyCode, Modifiers};
use super::focus::FocusRing;
use crate::reactive::Signal;

thread_local! {
    static CURRENT: RefCell<Vec<Rc<RefCell<RouterInner>>>> = const { RefCell::new(Vec::new()) };
}

/// Identity of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

type HandlerFn = Rc<RefCell<dyn FnMut(&InputEvent) -> bool>>;

struct HandlerRecord {
    id: HandlerId,
    /// Focus id gating delivery, if any.
    scope: Option<String>,
    /// Blocking handlers see events before the rest of the chain.
    blocking: bool,
    callback: HandlerFn,
}

struct RouterInner {
    handlers: Vec<HandlerRecord>,
    next_id: u64,
    ring: FocusRing,
}

impl RouterInner {
    fn register(
        &mut self,
        scope: Option<String>,
        blocking: bool,
        f: impl FnMut(&InputEvent) -> bool + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push(HandlerRecord {
            id,
            scope,
            blocking,
            callback: Rc::new(RefCell::new(f)),
        });
        id
    }
}

// =============================================================================
// Router
// =============================================================================

/// Event router for one running application.
///
/// Create inside [`Runtime::enter`](crate::reactive::Runtime::enter);
/// the focused id lives in a signal of that runtime, and delivery may
/// write it.
pub struct InputRouter {
    inner: Rc<RefCell<RouterInner>>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RouterInner {
                handlers: Vec::new(),
                next_id: 0,
                ring: FocusRing::new(),
            })),
        }
    }

    /// Run `f` with this router current, so the free registration
    /// functions resolve here. Nestable, panic-safe.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = EnterGuard::push(self.inner.clone());
        f()
    }

    /// Deliver one event through the handler chain. Returns whether a
    /// handler consumed it.
    pub fn dispatch(&self, event: &InputEvent) -> bool {
        self.enter(|| self.deliver(event))
    }

    /// Deliver one event, then apply the built-in fallback: an
    /// unconsumed Tab press steps the focus ring forward, Shift+Tab
    /// backward.
    pub fn route(&self, event: &InputEvent) -> bool {
        self.enter(|| {
            if self.deliver(event) {
                return true;
            }
            if let InputEvent::Key(k) = event {
                if k.code == KeyCode::Tab && k.is_press() {
                    let inner = self.inner.borrow();
                    if k.modifiers.contains(Modifiers::SHIFT) {
                        inner.ring.focus_prev();
                    } else {
                        inner.ring.focus_next();
                    }
                    return true;
                }
            }
            false
        })
    }

    fn deliver(&self, event: &InputEvent) -> bool {
        // Plan the walk up front; callbacks may register or remove
        // handlers while running. Scope gating uses the focus state at
        // arrival, not whatever a callback moves it to mid-walk.
        let plan: Vec<(HandlerId, Option<String>, HandlerFn)> = {
            let inner = self.inner.borrow();
            let blocking = inner.handlers.iter().rev().filter(|h| h.blocking);
            let rest = inner.handlers.iter().rev().filter(|h| !h.blocking);
            blocking
                .chain(rest)
                .map(|h| (h.id, h.scope.clone(), h.callback.clone()))
                .collect()
        };
        let focused = self.inner.borrow().ring.current();

        for (id, scope, callback) in plan {
            if let Some(scope) = &scope {
                if focused.as_deref() != Some(scope.as_str()) {
                    continue;
                }
            }
            // Skip handlers an earlier callback removed.
            if !self.inner.borrow().handlers.iter().any(|h| h.id == id) {
                continue;
            }
            if (callback.borrow_mut())(event) {
                return true;
            }
        }
        false
    }

    /// Click-to-focus: move focus to `id` if it is registered in the
    /// ring. Returns whether it is.
    pub fn focus_click(&self, id: &str) -> bool {
        self.inner.borrow().ring.focus(id)
    }

    /// The focused id right now, without subscribing.
    pub fn focused(&self) -> Option<String> {
        self.inner.borrow().ring.current()
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

struct EnterGuard;

impl EnterGuard {
    fn push(router: Rc<RefCell<RouterInner>>) -> Self {
        CURRENT.with(|stack| stack.borrow_mut().push(router));
        EnterGuard
    }
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn with_router<R>(f: impl FnOnce(&Rc<RefCell<RouterInner>>) -> R) -> R {
    CURRENT.with(|stack| {
        let stack = stack.borrow();
        let router = stack
            .last()
            .unwrap_or_else(|| panic!("no input router is current; wrap this call in InputRouter::enter"));
        let router = router.clone();
        drop(stack);
        f(&router)
    })
}

// =============================================================================
// Registration
// =============================================================================

/// Register a handler that sees every event. Later registrations are
/// asked first.
pub fn on_input(f: impl FnMut(&InputEvent) -> bool + 'static) -> HandlerId {
    with_router(|r| r.borrow_mut().register(None, false, f))
}

/// Register a handler that only sees events while `id` holds focus.
pub fn on_input_scoped(id: impl Into<String>, f: impl FnMut(&InputEvent) -> bool + 'static) -> HandlerId {
    with_router(|r| r.borrow_mut().register(Some(id.into()), false, f))
}

/// Register a handler in the blocking set. Blocking handlers see every
/// event before the rest of the chain; a modal overlay registers here
/// and consumes what it wants trapped.
pub fn on_input_blocking(f: impl FnMut(&InputEvent) -> bool + 'static) -> HandlerId {
    with_router(|r| r.borrow_mut().register(None, true, f))
}

pub fn remove_handler(id: HandlerId) {
    with_router(|r| r.borrow_mut().handlers.retain(|h| h.id != id));
}

// =============================================================================
// Focus
// =============================================================================

/// Join the focus ring. Ring order is registration order.
pub fn register_focusable(id: impl Into<String>) {
    with_router(|r| r.borrow_mut().ring.register(&id.into()));
}

pub fn unregister_focusable(id: &str) {
    with_router(|r| r.borrow_mut().ring.unregister(id));
}

/// Move focus to `id` if it is registered. Returns whether it is.
pub fn focus(id: &str) -> bool {
    with_router(|r| r.borrow().ring.focus(id))
}

pub fn blur() {
    with_router(|r| r.borrow().ring.blur());
}

pub fn focus_next() {
    with_router(|r| r.borrow().ring.focus_next());
}

pub fn focus_prev() {
    with_router(|r| r.borrow().ring.focus_prev());
}

/// The focused id as a reactive read; inside an effect this subscribes.
pub fn focused() -> Option<String> {
    focused_signal().get()
}

/// Whether `id` holds focus, as a reactive read.
pub fn is_focused(id: &str) -> bool {
    focused().as_deref() == Some(id)
}

/// The signal holding the focused id.
pub fn focused_signal() -> Signal<Option<String>> {
    with_router(|r| r.borrow().ring.focused())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::input::events::KeyEvent;
    use crate::reactive::Runtime;

    fn with_context(f: impl FnOnce(&InputRouter)) {
        let rt = Runtime::new();
        rt.enter(|| {
            let router = InputRouter::new();
            router.enter(|| f(&router));
        });
    }

    fn press(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code, Modifiers::NONE))
    }

    fn shift_tab() -> InputEvent {
        InputEvent::Key(KeyEvent::new(KeyCode::Tab, Modifiers::SHIFT))
    }

    /// Handler that records its label and reports `consume`.
    fn recording(
        log: Rc<RefCell<Vec<&'static str>>>,
        label: &'static str,
        consume: bool,
    ) -> impl FnMut(&InputEvent) -> bool {
        move |_| {
            log.borrow_mut().push(label);
            consume
        }
    }

    #[test]
    fn most_recent_registration_wins() {
        with_context(|router| {
            let log = Rc::new(RefCell::new(Vec::new()));
            on_input(recording(log.clone(), "older", false));
            on_input(recording(log.clone(), "newer", false));

            assert!(!router.dispatch(&press(KeyCode::Enter)));
            assert_eq!(*log.borrow(), ["newer", "older"]);
        });
    }

    #[test]
    fn consuming_stops_the_chain() {
        with_context(|router| {
            let log = Rc::new(RefCell::new(Vec::new()));
            on_input(recording(log.clone(), "older", false));
            on_input(recording(log.clone(), "newer", true));

            assert!(router.dispatch(&press(KeyCode::Enter)));
            assert_eq!(*log.borrow(), ["newer"]);
        });
    }

    #[test]
    fn blocking_set_goes_first() {
        with_context(|router| {
            let log = Rc::new(RefCell::new(Vec::new()));
            on_input(recording(log.clone(), "a", false));
            on_input_blocking(recording(log.clone(), "modal", false));
            on_input(recording(log.clone(), "c", false));

            router.dispatch(&press(KeyCode::Enter));
            assert_eq!(*log.borrow(), ["modal", "c", "a"]);
        });
    }

    #[test]
    fn scoped_handler_requires_focus() {
        with_context(|router| {
            let log = Rc::new(RefCell::new(Vec::new()));
            register_focusable("editor");
            on_input_scoped("editor", recording(log.clone(), "editor", true));

            assert!(!router.dispatch(&press(KeyCode::Enter)));
            assert!(log.borrow().is_empty());

            assert!(focus("editor"));
            assert!(router.dispatch(&press(KeyCode::Enter)));
            assert_eq!(*log.borrow(), ["editor"]);
        });
    }

    #[test]
    fn unconsumed_tab_steps_the_ring() {
        with_context(|router| {
            register_focusable("a");
            register_focusable("b");

            assert!(router.route(&press(KeyCode::Tab)));
            assert_eq!(router.focused().as_deref(), Some("a"));
            assert!(router.route(&press(KeyCode::Tab)));
            assert_eq!(router.focused().as_deref(), Some("b"));
            assert!(router.route(&shift_tab()));
            assert_eq!(router.focused().as_deref(), Some("a"));
        });
    }

    #[test]
    fn consumed_tab_leaves_focus_alone() {
        with_context(|router| {
            register_focusable("a");
            on_input_blocking(|ev| matches!(ev.as_key(), Some(k) if k.code == KeyCode::Tab));

            assert!(router.route(&press(KeyCode::Tab)));
            assert_eq!(router.focused(), None);
        });
    }

    #[test]
    fn removed_handler_stops_firing() {
        with_context(|router| {
            let log = Rc::new(RefCell::new(Vec::new()));
            let id = on_input(recording(log.clone(), "gone", false));
            remove_handler(id);

            router.dispatch(&press(KeyCode::Enter));
            assert!(log.borrow().is_empty());
        });
    }

    #[test]
    fn handler_removed_mid_walk_is_skipped() {
        with_context(|router| {
            let log = Rc::new(RefCell::new(Vec::new()));
            let older = on_input(recording(log.clone(), "older", false));
            let log2 = log.clone();
            on_input(move |_| {
                log2.borrow_mut().push("remover");
                remove_handler(older);
                false
            });

            router.dispatch(&press(KeyCode::Enter));
            assert_eq!(*log.borrow(), ["remover"]);
        });
    }

    #[test]
    fn click_focuses_registered_ids_only() {
        with_context(|router| {
            register_focusable("button");
            assert!(!router.focus_click("plain-box"));
            assert_eq!(router.focused(), None);
            assert!(router.focus_click("button"));
            assert_eq!(router.focused().as_deref(), Some("button"));
        });
    }
}
