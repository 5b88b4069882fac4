//! Concurrent fan-out: every delivery runs on its own task.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::core::{Engine, Error, Hook, Item, Level, Result, Sink, Source};

/// A source that hands each upstream item to its sinks without waiting.
///
/// Upstream dispatch returns as soon as the deliveries are spawned, so items
/// may reach sinks out of order and a slow sink never holds up the upstream
/// source. When the upstream closes, every in-flight delivery is awaited
/// before this source closes and runs its own hooks.
pub struct Concurrent<T: Item> {
    engine: Engine<T>,
    tracker: TaskTracker,
}

impl<T: Item> Concurrent<T> {
    /// Number of deliveries still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

impl<T: Item> Source for Concurrent<T> {
    type Item = T;

    fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    fn cancel(&self) -> Result<()> {
        Err(Error::NotCancellable {
            reason: "a concurrent source closes when its upstream closes",
        })
    }
}

/// Concurrent fan-out of `upstream`'s items.
pub fn concurrent<S>(upstream: &S) -> Concurrent<S::Item>
where
    S: Source + ?Sized,
{
    let engine = Engine::new(upstream.reporter());
    let tracker = TaskTracker::new();

    upstream.observe(Arc::new(FanOut {
        engine: engine.clone(),
        tracker: tracker.clone(),
    }));

    let closing = engine.clone();
    let waiting = tracker.clone();
    upstream.upon_close(Hook::new(move || async move {
        waiting.close();
        closing.log(
            Level::Debug,
            format_args!("Waiting for {} deliveries to finish.", waiting.len()),
        );
        waiting.wait().await;
        closing.complete().await;
    }));

    engine.log(Level::Debug, format_args!("Created concurrent source."));
    Concurrent { engine, tracker }
}

struct FanOut<T> {
    engine: Engine<T>,
    tracker: TaskTracker,
}

#[async_trait]
impl<T: Item> Sink for FanOut<T> {
    type Item = T;

    async fn write(&self, item: T) -> Result<()> {
        self.engine.pump_detached(item, &self.tracker);
        Ok(())
    }
}
