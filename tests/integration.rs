//! Integration tests for sources, sinks, hooks and processors

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamline::core::{FnReporter, SourceId};
use streamline::prelude::*;
use tokio::sync::mpsc;
use tokio_test::assert_ok;

fn recorded(reporter: &MemoryReporter) -> SourceConfig {
    SourceConfig::new().reporter(reporter.clone())
}

#[tokio::test]
async fn test_every_sink_sees_every_item_in_order() {
    let source = just(1..=5);
    let first = CollectSink::<i32>::new();
    let second = CollectSink::<i32>::new();
    source.observe(Arc::new(first.clone()));
    source.observe(Arc::new(second.clone()));

    source.start();
    source.await_completion().await;

    assert_eq!(first.into_items().await, vec![1, 2, 3, 4, 5]);
    assert_eq!(second.into_items().await, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_failing_sink_does_not_disturb_others() {
    let reporter = MemoryReporter::new();
    let source = Literal::with_config(vec!["a", "b"], recorded(&reporter));
    let good = CollectSink::<&'static str>::new();
    source.observe_fn(|item: &'static str| async move {
        if item == "a" {
            return Err(Error::custom("rejected a"));
        }
        Ok(())
    });
    source.observe(Arc::new(good.clone()));

    source.start();
    source.await_completion().await;

    assert_eq!(good.into_items().await, vec!["a", "b"]);
    assert!(reporter.contains(Level::Warning, "rejected a"));
}

#[tokio::test]
async fn test_map_chain_preserves_order() {
    let source = just(1..=4);
    let sink = CollectSink::<String>::new();
    source
        .map(|x: i32| Ok(x * 3))
        .map(|x: i32| Ok(format!("#{}", x)))
        .observe(Arc::new(sink.clone()));

    source.start();
    source.await_completion().await;

    assert_eq!(sink.into_items().await, vec!["#3", "#6", "#9", "#12"]);
}

#[tokio::test]
async fn test_close_hooks_cascade_through_processors() {
    let (tx, rx) = mpsc::channel::<u32>(4);
    let source = QueueSource::from_receiver(rx);
    let mapped = source.map(|x: u32| Ok(x + 1));
    let buffered = assert_ok!(mapped.buffer(2));
    let fanned = buffered.concurrent();
    let sink = CollectSink::<u32>::new();
    fanned.observe(Arc::new(sink.clone()));
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();
    fanned.upon_close_fn(move || async move {
        flag.store(true, Ordering::SeqCst);
    });

    source.start();
    for x in 0..6 {
        tx.send(x).await.unwrap();
    }
    drop(tx);
    source.await_completion().await;

    assert!(closed.load(Ordering::SeqCst));
    let mut items = sink.into_items().await;
    items.sort();
    assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_generator_runs_until_finished() {
    let remaining = Arc::new(Mutex::new(vec![3, 2, 1]));
    let pool = remaining.clone();
    let source = Generator::new(move || {
        let next = pool.lock().unwrap().pop();
        async move { Ok(next.map_or(Polled::Finished, Polled::Item)) }
    });
    let sink = CollectSink::<i32>::new();
    source.observe(Arc::new(sink.clone()));

    source.start();
    tokio::time::timeout(Duration::from_secs(5), source.await_completion())
        .await
        .unwrap();

    assert_eq!(sink.into_items().await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_missing_item_means_poll_again() {
    assert_eq!(Polled::<u8>::from(None), Polled::Empty);
    assert_eq!(Polled::from(Some(4u8)), Polled::Item(4));

    // Nothing ready is not the end: the generator keeps polling until told
    // it is finished.
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let source = Generator::new(move || {
        let call = counter.fetch_add(1, Ordering::SeqCst);
        let next = if call < 3 { None } else { Some(call) };
        async move {
            Ok(match next {
                Some(item) if item >= 4 => Polled::Finished,
                other => Polled::from(other),
            })
        }
    });
    let sink = CollectSink::<usize>::new();
    source.observe(Arc::new(sink.clone()));

    source.start();
    tokio::time::timeout(Duration::from_secs(5), source.await_completion())
        .await
        .unwrap();

    assert_eq!(sink.into_items().await, vec![3]);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_generator_recovers_after_errors() {
    let reporter = MemoryReporter::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let config = recorded(&reporter).backoff(BackoffConfig::from_millis(1_000, 50));
    let source = Generator::with_config(
        move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match call {
                    0 | 1 => Err(Error::custom("not yet")),
                    2 => Ok(Polled::Item(call)),
                    _ => Ok(Polled::Finished),
                }
            }
        },
        config,
    );
    let sink = CollectSink::<usize>::new();
    source.observe(Arc::new(sink.clone()));

    source.start();
    source.await_completion().await;

    assert_eq!(sink.into_items().await, vec![2]);
    assert!(reporter.count(Level::Info) >= 2);
    assert!(reporter.contains(Level::Info, "not yet"));
}

#[tokio::test]
async fn test_cancelled_generator_runs_hooks() {
    let source = Generator::<u8>::new(|| async { Ok(Polled::Empty) });
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();
    source.upon_close(Hook::from_fn(move || flag.store(true, Ordering::SeqCst)));

    source.start();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_ok!(source.cancel());
    tokio::time::timeout(Duration::from_secs(5), source.await_completion())
        .await
        .unwrap();

    assert!(closed.load(Ordering::SeqCst));
    assert!(source.is_cancelled());
}

#[tokio::test]
async fn test_only_generators_can_be_cancelled() {
    let literal = just([1]);
    let (_tx, rx) = mpsc::channel::<i32>(1);
    let queue = QueueSource::from_receiver(rx);
    let mapped = literal.map(|x: i32| Ok(x));
    let fanned = literal.concurrent();

    assert!(matches!(literal.cancel(), Err(Error::NotCancellable { .. })));
    assert!(matches!(queue.cancel(), Err(Error::NotCancellable { .. })));
    assert!(matches!(mapped.cancel(), Err(Error::NotCancellable { .. })));
    assert!(matches!(fanned.cancel(), Err(Error::NotCancellable { .. })));
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let source = just(["once"]);
    let counter = CountSink::<&'static str>::new();
    source.observe(Arc::new(counter.clone()));

    source.start();
    source.start();
    source.await_completion().await;
    source.start();

    assert_eq!(counter.count(), 1);
}

#[tokio::test]
async fn test_custom_reporter_receives_source_ids() {
    let seen: Arc<Mutex<Vec<(Level, SourceId, String)>>> = Arc::default();
    let sink = seen.clone();
    let reporter = FnReporter::new(move |level, source, message| {
        sink.lock().unwrap().push((level, source, message.to_string()));
    });
    let source = Literal::with_config([7u8], SourceConfig::new().reporter(reporter));
    let id = source.id();

    source.start();
    source.await_completion().await;

    let seen = seen.lock().unwrap();
    assert!(seen.iter().all(|(_, source, _)| *source == id));
    assert!(seen
        .iter()
        .any(|(level, _, message)| *level == Level::Info && message == "Source is closed."));
}

#[tokio::test]
async fn test_verbose_trace_of_a_dispatch() {
    let reporter = MemoryReporter::new();
    let source = Literal::with_config(["test"], recorded(&reporter));
    source.observe(Arc::new(CountSink::<&'static str>::new()));

    source.start();
    source.await_completion().await;

    assert!(reporter.contains(Level::Verbose, "Beginning to send item (\"test\")"));
    assert!(reporter.contains(Level::Verbose, "Sending item (\"test\") to sink 0"));
    assert!(reporter.contains(Level::Verbose, "Finished sending item (\"test\")"));
    assert!(reporter.contains(Level::Info, "Starting source."));
}
