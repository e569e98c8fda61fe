//! Logical focus: a registration-ordered ring of focusable ids.
//!
//! Each focusable id is either unfocused or the single focused one.
//! Transitions are explicit `focus`/`blur` calls or Tab/Shift+Tab
//! stepping the ring in registration order, wrapping at the ends. The
//! focused id lives in a reactive signal, so a component that reads it
//! re-renders when focus moves.
//!
//! All methods assume the owning runtime is entered.

use crate::reactive::{signal, Signal};

pub(crate) struct FocusRing {
    /// Focusable ids in registration order.
    order: Vec<String>,
    focused: Signal<Option<String>>,
}

impl FocusRing {
    pub(crate) fn new() -> Self {
        Self {
            order: Vec::new(),
            focused: signal(None),
        }
    }

    /// Join the ring. Re-registering an id keeps its original position.
    pub(crate) fn register(&mut self, id: &str) {
        if !self.order.iter().any(|f| f == id) {
            self.order.push(id.to_string());
        }
    }

    /// Leave the ring; an id that held focus drops it.
    pub(crate) fn unregister(&mut self, id: &str) {
        self.order.retain(|f| f != id);
        if self.current().as_deref() == Some(id) {
            self.focused.set(None);
        }
    }

    /// Move focus to `id` if it is registered. Returns whether it is.
    pub(crate) fn focus(&self, id: &str) -> bool {
        if self.order.iter().any(|f| f == id) {
            self.focused.set(Some(id.to_string()));
            true
        } else {
            false
        }
    }

    pub(crate) fn blur(&self) {
        self.focused.set(None);
    }

    /// The reactive handle; reading it inside an effect subscribes.
    pub(crate) fn focused(&self) -> Signal<Option<String>> {
        self.focused
    }

    /// The focused id right now, without subscribing.
    pub(crate) fn current(&self) -> Option<String> {
        self.focused.peek()
    }

    pub(crate) fn focus_next(&self) {
        self.step(1);
    }

    pub(crate) fn focus_prev(&self) {
        self.step(-1);
    }

    fn step(&self, dir: isize) {
        if self.order.is_empty() {
            return;
        }
        let fallback = if dir > 0 { 0 } else { self.order.len() - 1 };
        let next = match self.current() {
            Some(cur) => match self.order.iter().position(|f| *f == cur) {
                Some(i) => {
                    let len = self.order.len() as isize;
                    (i as isize + dir).rem_euclid(len) as usize
                }
                None => fallback,
            },
            None => fallback,
        };
        self.focused.set(Some(self.order[next].clone()));
    }
}

// =============================================================================
// Tests
// =============================================================================
