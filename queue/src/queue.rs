//! Ordered task queue: FIFO body start on top of tokio's unordered scheduler.
//!
//! Every submission appends a link to a chain. The queue keeps only the tail,
//! the completion receiver of the most recent link; `submit` swaps it under a
//! mutex so concurrent submitters each capture a distinct predecessor. Links own
//! their predecessor receiver, so the chain keeps draining after the queue value
//! itself is dropped.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use ordo_types::{TaskError, TaskPriority, panic_payload_to_string};

use crate::link::{CompletionSignal, Link};

const DEFAULT_LABEL: &str = "ordered";

struct Chain {
    tail: Option<oneshot::Receiver<()>>,
    next_sequence: u64,
}

struct QueueInner {
    label: String,
    chain: Mutex<Chain>,
    in_flight: Arc<AtomicUsize>,
}

/// A queue whose submitted bodies start strictly in submission order, one at a
/// time.
///
/// Cloning is cheap and every clone feeds the same chain.
#[derive(Clone)]
pub struct OrderedTaskQueue {
    inner: Arc<QueueInner>,
}

impl Default for OrderedTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OrderedTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedTaskQueue")
            .field("label", &self.inner.label)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl OrderedTaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_label(DEFAULT_LABEL)
    }

    /// A queue whose tracing spans carry `label`.
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                label: label.into(),
                chain: Mutex::new(Chain {
                    tail: None,
                    next_sequence: 0,
                }),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Links submitted but not yet terminal.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Whether two handles feed the same chain.
    #[must_use]
    pub fn same_queue(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append `body` to the chain and return its handle immediately.
    ///
    /// `body` is not invoked until every earlier submission on this queue has
    /// finished, failed, panicked or been cancelled. Must be called from inside
    /// a tokio runtime; use [`submit_on`](Self::submit_on) otherwise.
    pub fn submit<T, E, F, Fut>(&self, priority: Option<TaskPriority>, body: F) -> TaskHandle<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.submit_on(&Handle::current(), priority, body)
    }

    /// Like [`submit`](Self::submit), spawning onto an explicit runtime.
    pub fn submit_on<T, E, F, Fut>(
        &self,
        runtime: &Handle,
        priority: Option<TaskPriority>,
        body: F,
    ) -> TaskHandle<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let priority = priority.unwrap_or_default();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();

        let (predecessor, sequence) = {
            let mut chain = self
                .inner
                .chain
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let predecessor = chain.tail.replace(done_rx);
            let sequence = chain.next_sequence;
            chain.next_sequence += 1;
            (predecessor, sequence)
        };

        let link = Link {
            predecessor,
            completion: CompletionSignal::new(done_tx, self.inner.in_flight.clone()),
            cancel: cancel_rx,
        };

        let span = tracing::debug_span!(
            "ordered_task",
            queue = %self.inner.label,
            seq = sequence,
            priority = %priority,
        );
        tracing::debug!(parent: &span, "Ordered task submitted");

        let join = runtime.spawn(link.run(body).instrument(span));

        TaskHandle {
            join,
            cancel: cancel_tx,
            priority,
            sequence,
        }
    }
}

/// Handle to one submitted unit of work.
///
/// Awaiting yields the body's result. Dropping the handle detaches the work; it
/// still runs in its turn. There is no `abort`: tearing a link down
/// mid-wait would release its successor early, so cancellation always goes
/// through [`cancel`](Self::cancel).
#[must_use = "dropping a TaskHandle detaches the task; await it or call cancel()"]
pub struct TaskHandle<T, E> {
    join: JoinHandle<Result<T, TaskError<E>>>,
    cancel: watch::Sender<bool>,
    priority: TaskPriority,
    sequence: u64,
}

impl<T, E> TaskHandle<T, E> {
    /// Request cancellation of this unit only.
    ///
    /// If the body hasn't started it never will; if it is running, it is
    /// dropped at its next await point. Either way the handle resolves to
    /// [`TaskError::Cancelled`] and later submissions proceed. Cancelling a
    /// finished task has no effect on its result.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Zero-based position of this submission within its queue.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("sequence", &self.sequence)
            .field("priority", &self.priority)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let joined = ready!(Pin::new(&mut this.join).poll(cx));
        Poll::Ready(joined.unwrap_or_else(join_error_to_task_error))
    }
}

fn join_error_to_task_error<T, E>(err: JoinError) -> Result<T, TaskError<E>> {
    if err.is_panic() {
        let payload = err.into_panic();
        Err(TaskError::Panicked(panic_payload_to_string(&payload)))
    } else {
        // Only runtime shutdown gets here; we never abort link tasks ourselves.
        Err(TaskError::Cancelled)
    }
}
