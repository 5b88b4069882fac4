//! Processors: sources derived from other sources.
//!
//! Each processor registers a sink and a close hook on its upstream, so it
//! receives every upstream item and closes after the upstream does.
//!
//! - [`map`] transforms items and drops the ones the mapper rejects.
//! - [`buffer`] decouples a slow consumer through a bounded queue.
//! - [`concurrent`] delivers each item to its sinks without waiting.

pub mod concurrent;
pub mod relay;

pub use concurrent::{concurrent, Concurrent};
pub use relay::{buffer, map, Derived};
