//! The base source every producer and operator is built on.
//!
//! An [`Engine`] owns the sink list, the close hooks, the closing flag and
//! the start routine. Producers hand it a start routine; the engine runs it
//! on its own task, then completes: marks the source closing, runs every
//! hook and releases [`Engine::await_completion`] callers.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::task::TaskTracker;

use crate::core::hook::{Hook, HookRegistry, Registration};
use crate::core::report::{Level, SharedReporter, SourceId};
use crate::core::traits::{Item, SharedSink};
use crate::telemetry;
use crate::util::{lock, panic_message, Preview};

type StartRoutine<T> = Box<dyn FnOnce(Engine<T>) -> BoxFuture<'static, ()> + Send>;

struct Inner<T> {
    id: SourceId,
    reporter: SharedReporter,
    sinks: Mutex<Vec<SharedSink<T>>>,
    hooks: HookRegistry,
    routine: Mutex<Option<StartRoutine<T>>>,
    started: AtomicBool,
    closing: AtomicBool,
    completing: AtomicBool,
    closed: watch::Sender<bool>,
}

/// Sink registry, hook registry and lifecycle of one source.
///
/// Cloning an engine yields another handle to the same source.
pub struct Engine<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Engine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.inner.id)
            .field("closing", &self.inner.closing.load(Ordering::SeqCst))
            .field("closed", &*self.inner.closed.borrow())
            .finish()
    }
}

impl<T: Item> Engine<T> {
    /// Engine without a start routine. Something else must call
    /// [`Engine::complete`] to close it.
    pub fn new(reporter: SharedReporter) -> Self {
        Self::build(reporter, None)
    }

    /// Engine whose [`Engine::start`] runs `routine` and completes once it
    /// returns.
    pub fn with_start<F, Fut>(reporter: SharedReporter, routine: F) -> Self
    where
        F: FnOnce(Engine<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let routine: StartRoutine<T> = Box::new(move |engine| routine(engine).boxed());
        Self::build(reporter, Some(routine))
    }

    fn build(reporter: SharedReporter, routine: Option<StartRoutine<T>>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                id: SourceId::next(),
                reporter,
                sinks: Mutex::new(Vec::new()),
                hooks: HookRegistry::default(),
                routine: Mutex::new(routine),
                started: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                completing: AtomicBool::new(false),
                closed,
            }),
        }
    }

    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    pub fn reporter(&self) -> SharedReporter {
        self.inner.reporter.clone()
    }

    /// Report through this source's reporter.
    pub fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        let reporter = &self.inner.reporter;
        if reporter.enabled(level) {
            reporter.report(level, self.inner.id, message);
        }
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    pub fn sink_count(&self) -> usize {
        lock(&self.inner.sinks).len()
    }

    pub fn hook_count(&self) -> usize {
        self.inner.hooks.len()
    }

    pub fn observe(&self, sink: SharedSink<T>) {
        let mut sinks = lock(&self.inner.sinks);
        self.log(
            Level::Debug,
            format_args!("Registering sink ({:p}) as {}", Arc::as_ptr(&sink), sinks.len()),
        );
        sinks.push(sink);
    }

    /// Register a close hook.
    ///
    /// A hook registered after completion has finished runs right away on
    /// its own task.
    pub fn upon_close(&self, hook: Hook) {
        match self.inner.hooks.register(hook.clone()) {
            Registration::Queued(index) => {
                self.log(
                    Level::Debug,
                    format_args!("Registering close hook ({:?}) as {}", hook, index),
                );
            }
            Registration::Sealed => self.run_late_hook(hook),
        }
    }

    fn run_late_hook(&self, hook: Hook) {
        let Some(run) = hook.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.log(
                    Level::Debug,
                    format_args!("Source already closed, running late close hook now."),
                );
                let engine = self.clone();
                handle.spawn(async move { engine.contain("close hook", run).await });
            }
            Err(_) => self.log(
                Level::Warning,
                format_args!("Source already closed and no runtime to run late close hook."),
            ),
        }
    }

    /// Launch the start routine on its own task and return.
    ///
    /// Only the first call does anything. Calling this on an engine built
    /// without a routine is a no-op. Outside a tokio runtime the call is
    /// reported at Error and the source stays unstarted.
    pub fn start(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.log(
                Level::Error,
                format_args!("Cannot start source outside a tokio runtime."),
            );
            return;
        };
        if self.inner.started.swap(true, Ordering::SeqCst) {
            self.log(Level::Debug, format_args!("Ignoring repeated start."));
            return;
        }
        let Some(routine) = lock(&self.inner.routine).take() else {
            self.log(
                Level::Debug,
                format_args!("No start routine; this source is driven by its upstream."),
            );
            return;
        };
        self.log(Level::Info, format_args!("Starting source."));
        let engine = self.clone();
        handle.spawn(async move {
            engine.contain("start routine", routine(engine.clone())).await;
            engine.complete().await;
        });
    }

    /// Wait until [`Engine::complete`] has run every close hook.
    pub async fn await_completion(&self) {
        let mut closed = self.inner.closed.subscribe();
        // The sender lives in `inner`, which this handle keeps alive.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Deliver `item` to every registered sink and wait for all of them.
    ///
    /// Each sink runs on its own task. Failures and panics are reported and
    /// never reach the caller. A closing source drops the item.
    pub async fn pump(&self, item: T) {
        if self.is_closing() {
            self.log(
                Level::Warning,
                format_args!("Ignoring item ({}). This source is closing.", Preview(&item)),
            );
            telemetry::item_dropped();
            return;
        }
        let sinks = lock(&self.inner.sinks).clone();
        self.log(
            Level::Verbose,
            format_args!("Beginning to send item ({})", Preview(&item)),
        );
        let mut deliveries = JoinSet::new();
        for (index, sink) in sinks.into_iter().enumerate() {
            deliveries.spawn(self.clone().deliver(item.clone(), index, sink));
        }
        while deliveries.join_next().await.is_some() {}
        telemetry::item_dispatched();
        self.log(
            Level::Verbose,
            format_args!("Finished sending item ({})", Preview(&item)),
        );
    }

    /// Like [`Engine::pump`] but without waiting: every delivery is spawned
    /// on `tracker` and the call returns immediately.
    pub fn pump_detached(&self, item: T, tracker: &TaskTracker) {
        if self.is_closing() {
            self.log(
                Level::Warning,
                format_args!("Ignoring item ({}). This source is closing.", Preview(&item)),
            );
            telemetry::item_dropped();
            return;
        }
        let sinks = lock(&self.inner.sinks).clone();
        self.log(
            Level::Verbose,
            format_args!("Beginning to send item ({}) concurrently.", Preview(&item)),
        );
        for (index, sink) in sinks.into_iter().enumerate() {
            tracker.spawn(self.clone().deliver(item.clone(), index, sink));
        }
        telemetry::item_dispatched();
    }

    async fn deliver(self, item: T, index: usize, sink: SharedSink<T>) {
        self.log(
            Level::Verbose,
            format_args!("Sending item ({}) to sink {}", Preview(&item), index),
        );
        match AssertUnwindSafe(sink.write(item)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                telemetry::sink_error();
                self.log(
                    Level::Warning,
                    format_args!("Failed to write item to sink {}: [{}]", index, err),
                );
            }
            Err(payload) => {
                telemetry::panic_caught();
                self.log(
                    Level::Error,
                    format_args!(
                        "Panic from sink {}! [{}]",
                        index,
                        panic_message(payload.as_ref())
                    ),
                );
            }
        }
    }

    /// Run `fut`, reporting a panic instead of unwinding.
    pub(crate) async fn contain<F>(&self, what: &str, fut: F)
    where
        F: Future<Output = ()>,
    {
        if let Err(payload) = AssertUnwindSafe(fut).catch_unwind().await {
            telemetry::panic_caught();
            self.log(
                Level::Error,
                format_args!("Panic from {}! [{}]", what, panic_message(payload.as_ref())),
            );
        }
    }

    /// Mark the source closing, run every close hook concurrently, wait for
    /// them, then release [`Engine::await_completion`] callers.
    ///
    /// Hooks registered while this runs are picked up too. Calling it again
    /// runs no hook twice; later calls wait for the first one to finish.
    pub async fn complete(&self) {
        self.log(Level::Verbose, format_args!("Marking source as closing."));
        self.inner.closing.store(true, Ordering::SeqCst);
        if self.inner.completing.swap(true, Ordering::SeqCst) {
            self.log(
                Level::Debug,
                format_args!("Completion already running, waiting for it."),
            );
            self.await_completion().await;
            return;
        }

        while let Some(pending) = self.inner.hooks.drain() {
            self.log(
                Level::Verbose,
                format_args!("Running {} close hooks..", pending.len()),
            );
            let mut hooks = JoinSet::new();
            for (index, run) in pending {
                let engine = self.clone();
                hooks.spawn(async move {
                    engine.log(
                        Level::Verbose,
                        format_args!("Processing close hook {}", index),
                    );
                    engine.contain("close hook", run).await;
                });
            }
            while hooks.join_next().await.is_some() {}
        }

        self.log(Level::Info, format_args!("Source is closed."));
        self.inner.closed.send_replace(true);
    }
}
