//! Core traits for the source/sink system.
//!
//! A [`Source`] pushes every item it produces to all of its registered
//! [`Sink`]s and runs its close [`Hook`]s once it is done. Pipelines are
//! built by observing one source from another: see [`SourceExt`].

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use crate::core::engine::Engine;
use crate::core::error::Result;
use crate::core::hook::Hook;
use crate::core::report::{SharedReporter, SourceId};
use crate::processors::{buffer, concurrent, map, Concurrent, Derived};
use crate::sinks::FnSink;

/// Bound shared by everything that flows through a source.
///
/// Items are cloned once per sink, and rendered with `Debug` in verbose
/// reports.
pub trait Item: Clone + Debug + Send + 'static {}

impl<T: Clone + Debug + Send + 'static> Item for T {}

/// A registered delivery target.
///
/// Sinks may be invoked concurrently for the same item, hence `&self`. An
/// error is reported by the source and otherwise ignored: there is no retry.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use streamline::core::{Result, Sink};
///
/// struct PrintSink;
///
/// #[async_trait]
/// impl Sink for PrintSink {
///     type Item = String;
///
///     async fn write(&self, item: Self::Item) -> Result<()> {
///         println!("{}", item);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// The type of items this sink accepts
    type Item: Send + 'static;

    /// Handle one item.
    async fn write(&self, item: Self::Item) -> Result<()>;
}

/// Shared handle to a sink as stored by a source.
pub type SharedSink<T> = Arc<dyn Sink<Item = T>>;

/// A producer of items.
///
/// Every source is built on an [`Engine`]; the provided methods delegate to
/// it, so implementations only supply the engine and their cancel policy.
#[async_trait]
pub trait Source: Send + Sync {
    /// The type of items this source produces
    type Item: Item;

    /// The engine holding this source's sinks, hooks and state.
    fn engine(&self) -> &Engine<Self::Item>;

    /// Request a cooperative stop.
    ///
    /// Sources whose lifetime is bounded by their input return
    /// [`Error::NotCancellable`](crate::core::Error::NotCancellable).
    fn cancel(&self) -> Result<()>;

    /// Identity used in reports.
    fn id(&self) -> SourceId {
        self.engine().id()
    }

    /// The reporter this source logs through.
    fn reporter(&self) -> SharedReporter {
        self.engine().reporter()
    }

    /// Register a sink for every item dispatched from now on.
    fn observe(&self, sink: SharedSink<Self::Item>) {
        self.engine().observe(sink)
    }

    /// Register a hook to run when this source closes.
    fn upon_close(&self, hook: Hook) {
        self.engine().upon_close(hook)
    }

    /// Begin producing. Only the first call has any effect.
    ///
    /// Needs a tokio runtime; without one the call is reported and ignored.
    fn start(&self) {
        self.engine().start()
    }

    /// Wait until the source is closed and every close hook has finished.
    async fn await_completion(&self) {
        self.engine().await_completion().await
    }
}

/// Extension trait for sources: closure registration and operators.
pub trait SourceExt: Source {
    /// Register an async closure as a sink.
    fn observe_fn<F, Fut>(&self, f: F)
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.observe(Arc::new(FnSink::<F, Self::Item>::new(f)))
    }

    /// Register an async closure as a close hook.
    fn upon_close_fn<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.upon_close(Hook::new(f))
    }

    /// Source of this source's items passed through `mapper`.
    fn map<F, V>(&self, mapper: F) -> Derived<V>
    where
        F: Fn(Self::Item) -> Result<V> + Send + Sync + 'static,
        V: Item,
    {
        map(self, mapper)
    }

    /// Source relaying this source's items through a queue of `capacity`.
    fn buffer(&self, capacity: usize) -> Result<Derived<Self::Item>> {
        buffer(self, capacity)
    }

    /// Source delivering each item to its sinks in independent tasks.
    fn concurrent(&self) -> Concurrent<Self::Item> {
        concurrent(self)
    }
}

impl<S: Source + ?Sized> SourceExt for S {}
