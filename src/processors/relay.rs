//! Map and buffer: derived sources fed through an internal queue.
//!
//! Both register a relay sink on the upstream source that pushes into a
//! tokio channel, and a close hook that closes the channel and waits for the
//! derived source to drain it. The derived source is a [`QueueSource`] over
//! the channel and is started right away.

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::config::SourceConfig;
use crate::core::{Engine, Error, Hook, Item, Level, Result, Sink, Source};
use crate::sources::QueueSource;
use crate::telemetry;
use crate::util::{lock, panic_message, Preview};

/// A source derived from another one by [`map`] or [`buffer`].
///
/// It closes once its upstream has closed and every relayed item has been
/// delivered, so it cannot be cancelled on its own.
pub struct Derived<T: Item> {
    inner: QueueSource<T>,
}

impl<T: Item> Source for Derived<T> {
    type Item = T;

    fn engine(&self) -> &Engine<T> {
        self.inner.engine()
    }

    fn cancel(&self) -> Result<()> {
        Err(Error::NotCancellable {
            reason: "a derived source closes when its upstream closes",
        })
    }
}

/// Source of `upstream`'s items passed through `mapper`.
///
/// Items the mapper rejects are reported at `Warning` and dropped; a mapper
/// panic is reported at `Error` and drops the item too.
pub fn map<S, F, V>(upstream: &S, mapper: F) -> Derived<V>
where
    S: Source + ?Sized,
    F: Fn(S::Item) -> Result<V> + Send + Sync + 'static,
    V: Item,
{
    // Capacity 1 keeps the relay a near hand-off: upstream waits for the
    // derived source to take each value.
    let derived = relay(upstream, 1, mapper);
    derived
        .engine()
        .log(Level::Debug, format_args!("Created mapped source."));
    derived
}

/// Source relaying `upstream`'s items through a queue holding `capacity`.
///
/// When the queue is full the upstream dispatch waits, which slows the
/// upstream source down to the pace of this one's sinks.
pub fn buffer<S>(upstream: &S, capacity: usize) -> Result<Derived<S::Item>>
where
    S: Source + ?Sized,
{
    if capacity == 0 {
        return Err(Error::invalid_config("buffer capacity must be at least 1"));
    }
    let derived = relay(upstream, capacity, Ok);
    derived.engine().log(
        Level::Debug,
        format_args!("Created buffered source holding {} items.", capacity),
    );
    Ok(derived)
}

fn relay<S, F, V>(upstream: &S, capacity: usize, transform: F) -> Derived<V>
where
    S: Source + ?Sized,
    F: Fn(S::Item) -> Result<V> + Send + Sync + 'static,
    V: Item,
{
    let (sender, receiver) = mpsc::channel(capacity);
    let config = SourceConfig::new().shared_reporter(upstream.reporter());
    let inner = QueueSource::with_config(
        tokio_stream::wrappers::ReceiverStream::new(receiver),
        config,
    );
    let sender = Arc::new(Mutex::new(Some(sender)));

    upstream.observe(Arc::new(RelaySink::<S::Item, V, F> {
        sender: sender.clone(),
        transform,
        engine: inner.engine().clone(),
        _upstream: std::marker::PhantomData,
    }));

    let engine = inner.engine().clone();
    upstream.upon_close(Hook::new(move || async move {
        engine.log(Level::Debug, format_args!("Closing relay queue."));
        drop(lock(&sender).take());
        engine.await_completion().await;
    }));

    inner.start();
    Derived { inner }
}

struct RelaySink<T, V, F> {
    sender: Arc<Mutex<Option<mpsc::Sender<V>>>>,
    transform: F,
    engine: Engine<V>,
    _upstream: std::marker::PhantomData<fn(T)>,
}

#[async_trait]
impl<T, V, F> Sink for RelaySink<T, V, F>
where
    T: Item,
    V: Item,
    F: Fn(T) -> Result<V> + Send + Sync + 'static,
{
    type Item = T;

    async fn write(&self, item: T) -> Result<()> {
        let value = match catch_unwind(AssertUnwindSafe(|| (self.transform)(item))) {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                telemetry::sink_error();
                self.engine
                    .log(Level::Warning, format_args!("Error mapping item: [{}]", err));
                return Ok(());
            }
            Err(payload) => {
                telemetry::panic_caught();
                self.engine.log(
                    Level::Error,
                    format_args!("Panic from mapper! [{}]", panic_message(payload.as_ref())),
                );
                return Ok(());
            }
        };
        self.engine.log(
            Level::Verbose,
            format_args!("Relaying item ({})", Preview(&value)),
        );

        let sender = lock(&self.sender).clone();
        let delivered = match sender {
            Some(sender) => sender.send(value).await.is_ok(),
            None => false,
        };
        if !delivered {
            telemetry::item_dropped();
            self.engine.log(
                Level::Warning,
                format_args!("Dropping item. The relay queue is closed."),
            );
        }
        Ok(())
    }
}
