//! End-to-end checks of each primitive against in-process collaborators.

use std::cell::RefCell;
use std::convert::Infallible;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use tokio::sync::{Notify, oneshot};

use ordo_bridge::{
    BridgeError, ContinuationSlot, LoopbackConnection, TransportError,
    bridge_with_optional_timeout,
};
use ordo_queue::{LaunchDomain, StreamKey, TaskError, TaskPriority};
use ordo_sendable::{
    OwnershipTransferBox, SerialDispatchQueue, UncheckedDispatch, UncheckedSendable,
};

const ORDERING_UNITS: u64 = 8;

pub struct CheckOutcome {
    pub name: &'static str,
    pub result: Result<String>,
}

pub async fn run(domain: &LaunchDomain, reply_timeout: Option<Duration>) -> Vec<CheckOutcome> {
    vec![
        outcome("ordering", check_ordering(domain).await),
        outcome("cancel", check_cancellation(domain).await),
        outcome("bridge", check_bridge(reply_timeout).await),
        outcome("transport", check_transport_failure(reply_timeout).await),
        outcome("transfer", check_transfer(domain).await),
        outcome("unchecked", check_unchecked(domain).await),
    ]
}

fn outcome(name: &'static str, result: Result<String>) -> CheckOutcome {
    match &result {
        Ok(detail) => tracing::debug!(check = name, "{detail}"),
        Err(err) => tracing::warn!(check = name, "Check failed: {err:#}"),
    }
    CheckOutcome { name, result }
}

async fn check_ordering(domain: &LaunchDomain) -> Result<String> {
    let stream = StreamKey::from("selfcheck.ordering");
    let started = Arc::new(Mutex::new(Vec::new()));

    // Earlier units sleep longer, so any reordering would show.
    let handles: Vec<_> = (0..ORDERING_UNITS)
        .map(|i| {
            let started = started.clone();
            domain.launch(Some(&stream), None, move || async move {
                started
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(i);
                tokio::time::sleep(Duration::from_millis(ORDERING_UNITS - i)).await;
                Ok::<_, Infallible>(i)
            })
        })
        .collect();
    for handle in handles {
        handle.await.context("ordered unit did not complete")?;
    }

    let order = started
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    ensure!(
        order == (0..ORDERING_UNITS).collect::<Vec<_>>(),
        "bodies started out of order: {order:?}"
    );
    Ok(format!(
        "{ORDERING_UNITS} units on stream {stream} started in submission order"
    ))
}

async fn check_cancellation(domain: &LaunchDomain) -> Result<String> {
    let stream = StreamKey::from("selfcheck.cancel");
    let (gate_tx, gate_rx) = oneshot::channel::<()>();

    let first = domain.launch(Some(&stream), None, move || async move {
        let _ = gate_rx.await;
        Ok::<_, Infallible>("first")
    });
    let skipped = domain.launch(Some(&stream), Some(TaskPriority::Background), || async {
        Ok::<_, Infallible>("skipped")
    });
    let last = domain.launch(Some(&stream), None, || async {
        Ok::<_, Infallible>("last")
    });

    skipped.cancel();
    let _ = gate_tx.send(());

    first.await.context("gated unit failed")?;
    match skipped.await {
        Err(TaskError::Cancelled) => {}
        other => bail!("cancelled unit resolved to {other:?}"),
    }
    last.await.context("unit behind a cancelled link failed")?;
    Ok("cancelled link skipped; chain kept draining".to_string())
}

type LegacyReply = Box<dyn FnOnce(Option<u64>, Option<io::Error>) + Send>;

/// Replies from a foreign thread, like a callback-era client library.
#[derive(Clone)]
struct DoublingService;

impl DoublingService {
    fn double(
        &self,
        input: u64,
        reply: impl FnOnce(Option<u64>, Option<io::Error>) + Send + 'static,
    ) {
        std::thread::spawn(move || match input.checked_mul(2) {
            Some(doubled) => reply(Some(doubled), None),
            None => reply(None, Some(io::Error::other("doubling overflowed"))),
        });
    }
}

/// Accepts calls and never answers until told to.
#[derive(Clone, Default)]
struct StalledService {
    parked: Arc<Mutex<Option<LegacyReply>>>,
    parked_signal: Arc<Notify>,
}

impl StalledService {
    fn double(
        &self,
        _input: u64,
        reply: impl FnOnce(Option<u64>, Option<io::Error>) + Send + 'static,
    ) {
        *self.parked.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(reply));
        self.parked_signal.notify_one();
    }

    fn release_late(&self) {
        let reply = self
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reply) = reply {
            reply(Some(0), None);
        }
    }
}

async fn check_bridge(reply_timeout: Option<Duration>) -> Result<String> {
    let connection = LoopbackConnection::new(DoublingService);

    let doubled = bridge_with_optional_timeout(
        &connection,
        reply_timeout,
        |service: DoublingService, slot: ContinuationSlot<u64>| {
            service.double(21, slot.value_reply());
        },
    )
    .await
    .context("bridged call failed")?;
    ensure!(doubled == 42, "expected 42, got {doubled}");

    let overflow = bridge_with_optional_timeout(
        &connection,
        reply_timeout,
        |service: DoublingService, slot: ContinuationSlot<u64>| {
            service.double(u64::MAX, slot.value_reply());
        },
    )
    .await;
    ensure!(
        matches!(overflow, Err(BridgeError::Remote(_))),
        "overflowing call resolved to {overflow:?}"
    );
    let outstanding = connection.outstanding();
    ensure!(
        outstanding == 0,
        "{outstanding} failure handlers still registered"
    );
    Ok("reply and remote error each resumed the caller once".to_string())
}

async fn check_transport_failure(reply_timeout: Option<Duration>) -> Result<String> {
    let service = StalledService::default();
    let connection = Arc::new(LoopbackConnection::new(service.clone()));

    let call = tokio::spawn({
        let connection = connection.clone();
        async move {
            bridge_with_optional_timeout(
                &*connection,
                reply_timeout,
                |service: StalledService, slot: ContinuationSlot<u64>| {
                    service.double(1, slot.value_reply());
                },
            )
            .await
        }
    });

    service.parked_signal.notified().await;
    connection.invalidate();

    let result = call.await.context("bridged call task panicked")?;
    ensure!(
        matches!(
            result,
            Err(BridgeError::Transport(TransportError::Invalidated))
        ),
        "stalled call resolved to {result:?}"
    );

    service.release_late();
    Ok("invalidated connection resumed the caller; late reply dropped".to_string())
}

async fn check_transfer(domain: &LaunchDomain) -> Result<String> {
    let stream = StreamKey::from("selfcheck.transfer");
    let payload = Arc::new(OwnershipTransferBox::new(vec![
        String::from("alpha"),
        String::from("beta"),
    ]));

    let consumer = {
        let payload = payload.clone();
        domain.launch(Some(&stream), None, move || async move {
            Ok::<_, Infallible>(payload.take_ownership().len())
        })
    };
    let taken = consumer.await.context("consuming unit failed")?;

    ensure!(taken == 2, "consumer saw {taken} items");
    ensure!(
        payload.has_ownership_been_transferred(),
        "box still reports an owner"
    );
    Ok(format!("{taken} items moved into a queued task exactly once"))
}

async fn check_unchecked(domain: &LaunchDomain) -> Result<String> {
    let queue = SerialDispatchQueue::new("selfcheck").context("failed to start dispatch worker")?;
    // SAFETY: the queue is serial and the `Rc` below is moved into the work item.
    let dispatch = unsafe { UncheckedDispatch::new(queue) };

    let (tx, rx) = oneshot::channel();
    let journal = Rc::new(RefCell::new(Vec::new()));
    dispatch.dispatch_async(move || {
        journal.borrow_mut().extend(["opened", "closed"]);
        let _ = tx.send(journal.borrow().len());
    });
    let entries = rx.await.context("dispatch worker dropped the work item")?;
    ensure!(entries == 2, "journal has {entries} entries");
    dispatch.into_queue().close().await;

    let stream = StreamKey::from("selfcheck.unchecked");
    let handle = domain.launch(Some(&stream), None, || {
        let local = async {
            let counter = Rc::new(RefCell::new(0u32));
            for _ in 0..3 {
                *counter.borrow_mut() += 1;
                tokio::task::yield_now().await;
            }
            let total = *counter.borrow();
            Ok::<_, Infallible>(total)
        };
        // SAFETY: the `Rc` is created inside the future and never escapes it.
        unsafe { UncheckedSendable::new(local) }
    });
    let total = handle.await.context("non-Send unit failed")?;
    ensure!(total == 3, "non-Send unit counted {total}");

    Ok("non-Send work ran on a dispatch queue and an ordered queue".to_string())
}
