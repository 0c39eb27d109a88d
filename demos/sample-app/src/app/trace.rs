//! Per-thread record of advice and body events.

use std::cell::RefCell;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Appends an event.
pub fn record(event: impl Into<String>) {
    EVENTS.with(|e| e.borrow_mut().push(event.into()));
}

/// Drains the events recorded on this thread.
#[must_use]
pub fn take() -> Vec<String> {
    EVENTS.with(|e| std::mem::take(&mut *e.borrow_mut()))
}
