//! A source over a fixed, finite sequence of items.

use crate::config::SourceConfig;
use crate::core::{Engine, Error, Item, Result, Source};

/// A source that emits a fixed sequence of items, in order, then closes.
///
/// It cannot be cancelled: the sequence is finite and known up front.
pub struct Literal<T: Item> {
    engine: Engine<T>,
    len: usize,
}

impl<T: Item> Literal<T> {
    /// Create a literal source from anything iterable
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::with_config(items, SourceConfig::default())
    }

    pub fn with_config<I>(items: I, config: SourceConfig) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        let len = items.len();
        let engine = Engine::with_start(config.reporter, move |engine| async move {
            for item in items {
                engine.pump(item).await;
            }
        });
        Self { engine, len }
    }

    /// Number of items this source emits
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Literal source over the given items.
///
/// ```rust
/// use streamline::prelude::*;
///
/// let source = just(["Hello", " ", "world"]);
/// assert_eq!(source.len(), 3);
/// ```
pub fn just<T: Item, I: IntoIterator<Item = T>>(items: I) -> Literal<T> {
    Literal::new(items)
}

impl<T: Item> Source for Literal<T> {
    type Item = T;

    fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    fn cancel(&self) -> Result<()> {
        Err(Error::NotCancellable {
            reason: "a literal source closes once every item is emitted",
        })
    }
}
