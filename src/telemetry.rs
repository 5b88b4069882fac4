//! Counters emitted through the `metrics` facade when the `metrics` feature
//! is enabled. Without it every function compiles to nothing.

/// Items that went through a full dispatch round.
pub const ITEMS_DISPATCHED: &str = "streamline_items_dispatched";
/// Items dropped because their source was closing or its relay was closed.
pub const ITEMS_DROPPED: &str = "streamline_items_dropped";
/// Errors returned by sinks and mappers.
pub const SINK_ERRORS: &str = "streamline_sink_errors";
/// Panics caught from sinks, hooks, mappers and start routines.
pub const PANICS: &str = "streamline_panics";
/// Failed polls of a generator.
pub const POLL_ERRORS: &str = "streamline_poll_errors";

#[inline]
pub(crate) fn item_dispatched() {
    #[cfg(feature = "metrics")]
    metrics::counter!(ITEMS_DISPATCHED).increment(1);
}

#[inline]
pub(crate) fn item_dropped() {
    #[cfg(feature = "metrics")]
    metrics::counter!(ITEMS_DROPPED).increment(1);
}

#[inline]
pub(crate) fn sink_error() {
    #[cfg(feature = "metrics")]
    metrics::counter!(SINK_ERRORS).increment(1);
}

#[inline]
pub(crate) fn panic_caught() {
    #[cfg(feature = "metrics")]
    metrics::counter!(PANICS).increment(1);
}

#[inline]
pub(crate) fn poll_error() {
    #[cfg(feature = "metrics")]
    metrics::counter!(POLL_ERRORS).increment(1);
}
