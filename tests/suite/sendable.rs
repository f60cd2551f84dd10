//! Ownership transfer and unchecked escape hatches across queues.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use ordo_queue::{OrderedTaskQueue, TaskError};
use ordo_sendable::{
    BlockingPoolDispatch, DispatchQueue, OwnershipTransferBox, SerialDispatchQueue,
    UncheckedDispatch, UncheckedSendable,
};

#[tokio::test]
async fn boxed_value_reaches_exactly_one_queued_consumer() {
    let queue = OrderedTaskQueue::with_label("transfer");
    let payload = Arc::new(OwnershipTransferBox::new(String::from("report.csv")));

    let first = {
        let payload = payload.clone();
        queue.submit(None, move || async move {
            Ok::<_, Infallible>(payload.take_ownership())
        })
    };
    let second = {
        let payload = payload.clone();
        queue.submit(None, move || async move {
            Ok::<_, Infallible>(payload.take_ownership())
        })
    };

    assert_eq!(first.await.unwrap(), "report.csv");
    match second.await {
        Err(TaskError::Panicked(message)) => assert!(message.contains("already transferred")),
        other => panic!("second consumer should have hit the guard, got {other:?}"),
    }
    assert!(payload.has_ownership_been_transferred());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_send_future_runs_as_an_ordered_unit() {
    let queue = OrderedTaskQueue::new();
    let handles: Vec<_> = (0..3u32)
        .map(|i| {
            queue.submit(None, move || {
                let local = async move {
                    let scratch = Rc::new(RefCell::new(vec![i]));
                    tokio::task::yield_now().await;
                    scratch.borrow_mut().push(i * 10);
                    let collected = scratch.borrow().clone();
                    Ok::<_, Infallible>(collected)
                };
                // SAFETY: the Rc lives and dies inside this future.
                unsafe { UncheckedSendable::new(local) }
            })
        })
        .collect();

    for (i, handle) in (0..3u32).zip(handles) {
        assert_eq!(handle.await.unwrap(), vec![i, i * 10]);
    }
}

#[tokio::test]
async fn unchecked_dispatch_preserves_serial_order() {
    // SAFETY: serial queue; each Rc is moved into exactly one work item.
    let dispatch = unsafe { UncheckedDispatch::new(SerialDispatchQueue::new("ui").unwrap()) };
    let (tx, mut rx) = mpsc::unbounded_channel();

    for step in 0..4u8 {
        let tx = tx.clone();
        let local = Rc::new(RefCell::new(step));
        dispatch.dispatch_async(move || {
            *local.borrow_mut() *= 2;
            let _ = tx.send(*local.borrow());
        });
    }
    drop(tx);

    let mut seen = Vec::new();
    while let Some(value) = rx.recv().await {
        seen.push(value);
    }
    assert_eq!(seen, vec![0, 2, 4, 6]);
    dispatch.into_queue().close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_pool_dispatch_is_a_dispatch_queue() {
    let pool: Box<dyn DispatchQueue> = Box::new(BlockingPoolDispatch::current("pool"));
    let (tx, rx) = oneshot::channel();
    pool.dispatch(Box::new(move || {
        let _ = tx.send(21 * 2);
    }));
    assert_eq!(rx.await.unwrap(), 42);
    assert_eq!(pool.label(), "pool");
}
