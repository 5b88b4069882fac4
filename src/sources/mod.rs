//! Source implementations for the streamline library.
//!
//! - [`Literal`] emits a fixed sequence, then closes.
//! - [`QueueSource`] relays an external queue until it closes.
//! - [`Generator`] polls a function, backing off after failures, until the
//!   function reports it is finished or the generator is cancelled.

pub mod generator;
pub mod literal;
pub mod queue;

pub use generator::{Generator, Polled};
pub use literal::{just, Literal};
pub use queue::QueueSource;
