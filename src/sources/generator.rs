//! A source that polls a function for items.
//!
//! The generator calls its poll function in a loop on its own task:
//!
//! - [`Polled::Item`] is dispatched to every sink before the next poll;
//! - [`Polled::Empty`] means nothing is ready, poll again right away;
//! - [`Polled::Finished`] ends the source cleanly;
//! - `Err(_)` is a recoverable failure: the consecutive-error count grows and
//!   the next poll waits out the configured [`BackoffConfig`] delay.
//!
//! Any successful poll resets the error count. [`Source::cancel`] is
//! cooperative: it is observed between polls and during a backoff sleep,
//! never in the middle of a poll or a dispatch.

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::config::{BackoffConfig, SourceConfig};
use crate::core::{Engine, Item, Level, Result, Source};
use crate::telemetry;
use crate::util::Preview;

/// What a poll function returns when it does not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    /// An item is ready
    Item(T),
    /// Nothing ready this round
    Empty,
    /// No more items will ever be produced
    Finished,
}

impl<T> Polled<T> {
    pub fn is_finished(&self) -> bool {
        matches!(self, Polled::Finished)
    }
}

impl<T> From<Option<T>> for Polled<T> {
    fn from(item: Option<T>) -> Self {
        item.map_or(Polled::Empty, Polled::Item)
    }
}

/// A cancellable source driven by a poll function.
pub struct Generator<T: Item> {
    engine: Engine<T>,
    cancel: CancellationToken,
    backoff: BackoffConfig,
}

impl<T: Item> Generator<T> {
    /// Generator that polls without any backoff
    pub fn new<F, Fut>(poll: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Polled<T>>> + Send + 'static,
    {
        Self::with_config(poll, SourceConfig::default())
    }

    /// Generator using [`BackoffConfig::standard`]
    pub fn with_standard_backoff<F, Fut>(poll: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Polled<T>>> + Send + 'static,
    {
        Self::with_backoff(poll, BackoffConfig::standard())
    }

    pub fn with_backoff<F, Fut>(poll: F, backoff: BackoffConfig) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Polled<T>>> + Send + 'static,
    {
        Self::with_config(poll, SourceConfig::default().backoff(backoff))
    }

    pub fn with_config<F, Fut>(poll: F, config: SourceConfig) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Polled<T>>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let backoff = config.backoff;
        let token = cancel.clone();
        let engine = Engine::with_start(config.reporter, move |engine| {
            run(engine, poll, backoff, token)
        });
        engine.log(
            Level::Verbose,
            format_args!("Creating generator source with backoff {:?}.", backoff),
        );
        Self {
            engine,
            cancel,
            backoff,
        }
    }

    pub fn backoff(&self) -> BackoffConfig {
        self.backoff
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T: Item> Source for Generator<T> {
    type Item = T;

    fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    /// Stop polling. Returns at once; use [`Source::await_completion`] to
    /// know when the generator has actually stopped.
    fn cancel(&self) -> Result<()> {
        self.engine
            .log(Level::Debug, format_args!("Marking source as cancelled."));
        self.cancel.cancel();
        Ok(())
    }
}

async fn run<T, F, Fut>(
    engine: Engine<T>,
    mut poll: F,
    backoff: BackoffConfig,
    cancel: CancellationToken,
) where
    T: Item,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Polled<T>>> + Send + 'static,
{
    let mut consecutive_errors: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            engine.log(
                Level::Debug,
                format_args!("Discovered that source is cancelled."),
            );
            return;
        }

        let polled = match poll().await {
            Ok(polled) => {
                if consecutive_errors > 0 {
                    engine.log(Level::Verbose, format_args!("Error count reset."));
                }
                consecutive_errors = 0;
                polled
            }
            Err(err) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                telemetry::poll_error();
                engine.log(
                    Level::Info,
                    format_args!(
                        "Error from poll function ({} in a row): [{}]",
                        consecutive_errors, err
                    ),
                );
                let delay = backoff.delay(consecutive_errors);
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    engine.log(
                        Level::Verbose,
                        format_args!("Waiting {:?} before next poll.", delay),
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
                continue;
            }
        };

        match polled {
            Polled::Item(item) => {
                if cancel.is_cancelled() {
                    engine.log(
                        Level::Debug,
                        format_args!(
                            "Dropping item ({}) polled after cancellation.",
                            Preview(&item)
                        ),
                    );
                    return;
                }
                engine.pump(item).await;
            }
            Polled::Empty => tokio::task::yield_now().await,
            Polled::Finished => {
                engine.log(
                    Level::Debug,
                    format_args!("Poll function indicates completion."),
                );
                return;
            }
        }
    }
}
