//! # Push-based event sources for Rust
//!
//! This crate provides in-process event sources that push every item they
//! produce to a set of registered sinks, then run their close hooks once
//! they are done.
//!
//! ## Core Concepts
//!
//! - **Source**: Produces items and dispatches each one to all of its sinks
//! - **Sink**: Receives items; errors and panics are reported, never fatal
//! - **Hook**: Runs once when its source closes
//! - **Processor**: A source derived from another (map, buffer, concurrent)
//!
//! ## Example
//!
//! ```rust
//! use streamline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let source = just(1..=5);
//!     let doubled = source.map(|x: i32| Ok(x * 2));
//!     let sink = CollectSink::<i32>::new();
//!     doubled.observe(std::sync::Arc::new(sink.clone()));
//!
//!     source.start();
//!     source.await_completion().await;
//!
//!     assert_eq!(sink.into_items().await, vec![2, 4, 6, 8, 10]);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod processors;
pub mod sinks;
pub mod sources;
pub mod telemetry;
mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::config::{BackoffConfig, SourceConfig};
    pub use crate::core::{
        Engine, Error, Hook, Item, Level, MemoryReporter, Reporter, Result, Sink, Source,
        SourceExt, TracingReporter,
    };
    pub use crate::processors::{Concurrent, Derived};
    pub use crate::sinks::{sink_fn, CollectSink, CountSink, FnSink};
    pub use crate::sources::{just, Generator, Literal, Polled, QueueSource};
}

// Re-export main error type
pub use crate::core::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
