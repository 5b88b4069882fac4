//! Core traits and types for the streamline library.
//!
//! This module contains the engine every source is built on, the traits that
//! define sources and sinks, close hooks, the reporting port and the error
//! type.

pub mod engine;
pub mod error;
pub mod hook;
pub mod report;
pub mod traits;

// Re-export core items
pub use engine::Engine;
pub use error::{BoxError, Error, IntoError, Result};
pub use hook::Hook;
pub use report::{
    FnReporter, Level, MemoryReporter, Record, Reporter, SharedReporter, SourceId,
    TracingReporter,
};
pub use traits::{Item, SharedSink, Sink, Source, SourceExt};
