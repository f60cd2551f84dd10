//! Ordered queue behavior observed from outside the crate.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::oneshot;

use ordo_queue::{OrderedTaskQueue, TaskError, TaskPriority};

use crate::common::StartLog;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn start_order_matches_submission_order_under_load() {
    let queue = OrderedTaskQueue::with_label("load");
    let log = StartLog::default();

    let handles: Vec<_> = (0..64u64)
        .map(|i| {
            let log = log.clone();
            queue.submit(None, move || async move {
                log.record(i);
                if i % 3 == 0 {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                Ok::<_, Infallible>(i)
            })
        })
        .collect();

    let results = join_all(handles).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), i as u64);
    }
    assert_eq!(log.snapshot(), (0..64).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bodies_never_overlap() {
    let queue = OrderedTaskQueue::new();
    let running = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let running = running.clone();
            let overlapped = overlapped.clone();
            queue.submit(None, move || async move {
                if running.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlapped.store(true, Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            })
        })
        .collect();

    join_all(handles).await;
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failure_cancellation_and_panic_do_not_stall_the_chain() {
    let queue = OrderedTaskQueue::with_label("mixed");
    let (gate_tx, gate_rx) = oneshot::channel::<()>();

    let gated = queue.submit(None, move || async move {
        let _ = gate_rx.await;
        Ok::<u8, &'static str>(0)
    });
    let failing = queue.submit(None, || async { Err::<u8, _>("refused") });
    let cancelled = queue.submit(Some(TaskPriority::Low), || async { Ok::<u8, &str>(2) });
    let panicking = queue.submit(None, || async {
        if true {
            panic!("unit three exploded");
        }
        Ok::<u8, &str>(3)
    });
    let tail = queue.submit(None, || async { Ok::<u8, &str>(4) });

    cancelled.cancel();
    gate_tx.send(()).unwrap();

    assert_eq!(gated.await.unwrap(), 0);
    assert_eq!(failing.await.unwrap_err().into_failure(), Some("refused"));
    assert!(cancelled.await.unwrap_err().is_cancelled());
    match panicking.await {
        Err(TaskError::Panicked(message)) => assert!(message.contains("exploded")),
        other => panic!("expected a captured panic, got {other:?}"),
    }
    assert_eq!(tail.await.unwrap(), 4);
}

#[tokio::test]
async fn cancelling_one_handle_leaves_siblings_alone() {
    let queue = OrderedTaskQueue::new();
    let handles: Vec<_> = (0..5u8)
        .map(|i| queue.submit(None, move || async move { Ok::<_, Infallible>(i) }))
        .collect();
    handles[2].cancel();

    let outcomes = join_all(handles).await;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        if i == 2 {
            assert!(outcome.unwrap_err().is_cancelled());
        } else {
            assert_eq!(outcome.unwrap(), i as u8);
        }
    }
}
