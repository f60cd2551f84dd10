//! One link of an ordered chain.
//!
//! A link joins two independent signals: "my predecessor reached a terminal
//! state" (a oneshot the predecessor fires when it finishes or is dropped) and
//! "my handle asked me to stop" (a watch flag). Keeping them separate is what
//! lets a cancelled link still wait its turn, so cancelling never lets two
//! bodies of one queue overlap.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use tokio::sync::{oneshot, watch};

use ordo_types::{TaskError, panic_payload_to_string};

/// Fires the successor's predecessor signal when dropped.
///
/// Held by the link task for its whole life, so normal return, body error,
/// cancellation, panic unwinding and runtime shutdown all release the next link.
pub(crate) struct CompletionSignal {
    tx: Option<oneshot::Sender<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl CompletionSignal {
    pub(crate) fn new(tx: oneshot::Sender<()>, in_flight: Arc<AtomicUsize>) -> Self {
        in_flight.fetch_add(1, Ordering::AcqRel);
        Self {
            tx: Some(tx),
            in_flight,
        }
    }
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if let Some(tx) = self.tx.take() {
            // The successor may not exist yet or may be gone; either is fine.
            let _ = tx.send(());
        }
    }
}

/// Everything a link task needs, captured at submission time.
pub(crate) struct Link {
    pub(crate) predecessor: Option<oneshot::Receiver<()>>,
    pub(crate) completion: CompletionSignal,
    pub(crate) cancel: watch::Receiver<bool>,
}

impl Link {
    pub(crate) async fn run<T, E, F, Fut>(self, body: F) -> Result<T, TaskError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Link {
            predecessor,
            completion: _completion,
            mut cancel,
        } = self;

        if let Some(predecessor) = predecessor {
            // Err means the predecessor was dropped without sending, which is
            // just as terminal as a normal finish.
            let _ = predecessor.await;
        }

        if *cancel.borrow() {
            tracing::debug!("Ordered task cancelled before start");
            return Err(TaskError::Cancelled);
        }

        tracing::debug!("Ordered task started");

        let body = match std::panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(fut) => fut,
            Err(payload) => return Err(panicked(&payload)),
        };
        let body = AssertUnwindSafe(body).catch_unwind();

        let outcome = tokio::select! {
            biased;
            () = cancelled(&mut cancel) => {
                tracing::warn!("Ordered task cancelled while running");
                Err(TaskError::Cancelled)
            }
            result = body => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => {
                    tracing::warn!("Ordered task body returned an error");
                    Err(TaskError::Failed(err))
                }
                Err(payload) => Err(panicked(&payload)),
            },
        };

        tracing::debug!("Ordered task finished");
        outcome
    }
}

/// Resolves once the flag is set. Pends forever if the handle was dropped,
/// since a detached link can no longer be cancelled.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn panicked<E>(payload: &Box<dyn Any + Send>) -> TaskError<E> {
    let message = panic_payload_to_string(payload);
    tracing::error!("Ordered task panicked: {message}");
    TaskError::Panicked(message)
}
