//! Utility functions and helper types.

use std::any::Any;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a registry mutex. A poisoned lock still holds a usable list, so the
/// guard is recovered instead of propagating the panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

const PREVIEW_CHARS: usize = 24;

/// Short `Debug` rendering of an item for log lines.
pub(crate) struct Preview<'a, T>(pub &'a T);

impl<T: fmt::Debug> fmt::Display for Preview<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = format!("{:?}", self.0);
        if rendered.chars().count() > PREVIEW_CHARS {
            let head: String = rendered.chars().take(PREVIEW_CHARS).collect();
            write!(f, "{}...", head)
        } else {
            f.write_str(&rendered)
        }
    }
}
