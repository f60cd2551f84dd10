//! Legacy dispatch queues and the unchecked submission wrapper.
//!
//! [`DispatchQueue`] is the callback-era execution primitive: hand it a
//! closure, it runs it later on a context of its choosing. Its scheduling policy
//! is opaque to this crate. Two in-process implementations are provided:
//!
//! - [`SerialDispatchQueue`] runs work one item at a time, in submission order,
//!   on a dedicated named thread.
//! - [`BlockingPoolDispatch`] forwards work to tokio's blocking pool with no
//!   ordering between items.
//!
//! [`UncheckedDispatch`] lifts the `Send` requirement on submitted closures for
//! callers that know their queue is serial.

use std::fmt;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use ordo_types::panic_payload_to_string;

use crate::unchecked::UncheckedSendable;

/// A unit of work for a dispatch queue.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

pub trait DispatchQueue: Send + Sync {
    fn label(&self) -> &str;

    /// Schedule `work`. Never blocks on the work itself.
    fn dispatch(&self, work: Work);
}

fn run_contained(label: &str, work: Work) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
        tracing::error!(
            queue = label,
            "Dispatched work panicked: {}",
            panic_payload_to_string(&payload)
        );
    }
}

/// FIFO queue drained by one dedicated thread.
///
/// A panicking work item is logged and does not stop the worker. Dropping the
/// queue lets already submitted work finish, then joins the thread, blocking
/// the dropping thread meanwhile. Async code should call
/// [`close`](Self::close) instead of dropping the queue on a runtime worker.
pub struct SerialDispatchQueue {
    label: String,
    tx: Option<mpsc::UnboundedSender<Work>>,
    worker: Option<JoinHandle<()>>,
}

impl SerialDispatchQueue {
    /// Start the worker thread, named after `label`.
    pub fn new(label: impl Into<String>) -> io::Result<Self> {
        let label = label.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Work>();
        let worker_label = label.clone();
        let worker = thread::Builder::new()
            .name(format!("dispatch:{label}"))
            .spawn(move || {
                while let Some(work) = rx.blocking_recv() {
                    tracing::trace!(queue = %worker_label, "Running dispatched work");
                    run_contained(&worker_label, work);
                }
                tracing::debug!(queue = %worker_label, "Dispatch worker exiting");
            })?;
        Ok(Self {
            label,
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Stop accepting work and wait for the backlog on tokio's blocking pool.
    ///
    /// # Panics
    ///
    /// Outside a tokio runtime.
    pub async fn close(mut self) {
        drop(self.tx.take());
        let Some(worker) = self.worker.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || worker.join()).await {
            Ok(Ok(())) => tracing::debug!(queue = %self.label, "Dispatch queue closed"),
            Ok(Err(_)) => tracing::warn!(queue = %self.label, "Dispatch worker panicked"),
            Err(err) => tracing::warn!(queue = %self.label, "Failed to join dispatch worker: {err}"),
        }
    }
}

impl DispatchQueue for SerialDispatchQueue {
    fn label(&self) -> &str {
        &self.label
    }

    fn dispatch(&self, work: Work) {
        tracing::trace!(queue = %self.label, "Dispatching work");
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(work).is_err() {
            tracing::warn!(queue = %self.label, "Dispatch worker is gone; work dropped");
        }
    }
}

impl Drop for SerialDispatchQueue {
    fn drop(&mut self) {
        drop(self.tx.take());
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Dropped from inside one of its own work items: the worker exits on
        // its own once the channel drains.
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            tracing::warn!(queue = %self.label, "Dispatch worker panicked");
        }
    }
}

impl fmt::Debug for SerialDispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialDispatchQueue")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Concurrent dispatch onto tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct BlockingPoolDispatch {
    label: String,
    handle: Handle,
}

impl BlockingPoolDispatch {
    pub fn new(label: impl Into<String>, handle: Handle) -> Self {
        Self {
            label: label.into(),
            handle,
        }
    }

    /// Use the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Outside a tokio runtime.
    pub fn current(label: impl Into<String>) -> Self {
        Self::new(label, Handle::current())
    }
}

impl DispatchQueue for BlockingPoolDispatch {
    fn label(&self) -> &str {
        &self.label
    }

    fn dispatch(&self, work: Work) {
        tracing::trace!(queue = %self.label, "Dispatching work to blocking pool");
        let label = self.label.clone();
        drop(self.handle.spawn_blocking(move || run_contained(&label, work)));
    }
}

/// A dispatch queue that accepts non-`Send` work.
///
/// No validation and no extra synchronization: each closure is wrapped in
/// [`UncheckedSendable`] and passed straight through.
#[derive(Debug)]
pub struct UncheckedDispatch<Q> {
    queue: Q,
}

impl<Q: DispatchQueue> UncheckedDispatch<Q> {
    /// Wrap `queue`.
    ///
    /// # Safety
    ///
    /// Every closure later passed to [`dispatch_async`](Self::dispatch_async)
    /// must be sound to run, and drop, on whatever thread `queue` picks. In
    /// practice: `queue` is serial, and no non-`Send` state captured by a work
    /// item is still reachable from the submitting thread or from work items
    /// that could run concurrently with it.
    pub const unsafe fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn into_queue(self) -> Q {
        self.queue
    }

    pub fn dispatch_async<F>(&self, work: F)
    where
        F: FnOnce() + 'static,
    {
        // SAFETY: delegated to the caller of `UncheckedDispatch::new`.
        let work = unsafe { UncheckedSendable::new(work) };
        self.queue.dispatch(Box::new(move || (work.into_inner())()));
    }
}
