//! Process-wide interrupt flag.
//!
//! The Ctrl+C handler only sets a flag; whoever owns the output decides how
//! to surface the interruption. Streaming writers poll the flag so their
//! delivery tasks wind down instead of leaking.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(test)]
thread_local! {
    static TEST_INTERRUPT_OVERRIDE: std::cell::Cell<Option<bool>> = const { std::cell::Cell::new(None) };
}

/// Error signalling that the user interrupted the current operation.
#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Installs the Ctrl+C handler.
///
/// A second Ctrl+C while the flag is still set force-exits with 130.
pub fn init() {
    ctrlc::set_handler(move || {
        if INTERRUPTED.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        INTERRUPTED.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}

/// Checks whether an interrupt has been requested.
pub fn is_interrupted() -> bool {
    #[cfg(test)]
    if let Some(val) = TEST_INTERRUPT_OVERRIDE.with(|c| c.get()) {
        return val;
    }
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Forces `is_interrupted` for the current thread. Cleared by `reset`.
#[cfg(test)]
pub(crate) fn set_test_override(value: Option<bool>) {
    TEST_INTERRUPT_OVERRIDE.with(|c| c.set(value));
}

/// Clears the interrupt flag after it has been handled.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
    #[cfg(test)]
    TEST_INTERRUPT_OVERRIDE.with(|c| c.set(None));
}
