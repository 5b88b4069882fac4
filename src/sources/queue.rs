//! A source fed by an external queue.
//!
//! Anything that implements `Stream` works; tokio channel receivers have
//! their own constructors.

use futures::stream::{BoxStream, StreamExt};
use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};

use crate::config::SourceConfig;
use crate::core::{Engine, Error, Item, Level, Result, Source};

/// A source relaying items from an external FIFO queue.
///
/// Once started it takes items one at a time and dispatches each before
/// taking the next. It closes when the queue is closed and drained, which
/// for a tokio channel means every sender was dropped. Items queued before
/// [`Source::start`] are delivered once it runs, in queue order.
pub struct QueueSource<T: Item> {
    engine: Engine<T>,
}

impl<T: Item> QueueSource<T> {
    /// Source over a bounded tokio channel
    pub fn from_receiver(receiver: mpsc::Receiver<T>) -> Self {
        Self::from_stream(ReceiverStream::new(receiver))
    }

    /// Source over an unbounded tokio channel
    pub fn from_unbounded(receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self::from_stream(UnboundedReceiverStream::new(receiver))
    }

    /// Source over any stream; the stream ending closes the source
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::with_config(stream, SourceConfig::default())
    }

    pub fn with_config<S>(stream: S, config: SourceConfig) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let mut queue: BoxStream<'static, T> = stream.boxed();
        let engine = Engine::with_start(config.reporter, move |engine| async move {
            while let Some(item) = queue.next().await {
                engine.pump(item).await;
            }
            engine.log(Level::Debug, format_args!("Queue closed."));
        });
        Self { engine }
    }
}

impl<T: Item> Source for QueueSource<T> {
    type Item = T;

    fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    fn cancel(&self) -> Result<()> {
        Err(Error::NotCancellable {
            reason: "a queue source closes when its queue closes",
        })
    }
}
