//! Ordered launches keyed by stream.
//!
//! A [`LaunchDomain`] maps stream keys to lazily created queues. Work launched on
//! the same stream is serialized; different streams never wait on each other.
//! Launches without a stream go to one more queue that no [`StreamKey`] can
//! name, so a stream called `"default"` is just another stream.
//! The process-wide domain behind [`ordered_launch`] is created on first use and
//! lives until the process exits. Tests build their own with
//! [`LaunchDomain::new`] so they don't share ordering with the rest of the
//! process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, OnceLock, PoisonError};

use ordo_types::{StreamKey, TaskPriority};

use crate::queue::{OrderedTaskQueue, TaskHandle};

static GLOBAL_DOMAIN: OnceLock<LaunchDomain> = OnceLock::new();

const UNKEYED_LABEL: &str = "unkeyed";

#[derive(Debug)]
pub struct LaunchDomain {
    queues: Mutex<HashMap<StreamKey, OrderedTaskQueue>>,
    unkeyed: OrderedTaskQueue,
    default_priority: Option<TaskPriority>,
}

impl Default for LaunchDomain {
    fn default() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            unkeyed: OrderedTaskQueue::with_label(UNKEYED_LABEL),
            default_priority: None,
        }
    }
}

impl LaunchDomain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Priority used when a launch passes `None`.
    #[must_use]
    pub fn with_default_priority(mut self, priority: TaskPriority) -> Self {
        self.default_priority = Some(priority);
        self
    }

    /// The process-wide domain, created on first use.
    pub fn global() -> &'static LaunchDomain {
        GLOBAL_DOMAIN.get_or_init(LaunchDomain::new)
    }

    /// Install a configured domain as the process-wide one.
    ///
    /// Only possible before anything has touched [`global`](Self::global);
    /// afterwards the rejected domain is handed back.
    pub fn install_global(domain: LaunchDomain) -> Result<&'static LaunchDomain, LaunchDomain> {
        GLOBAL_DOMAIN.set(domain)?;
        Ok(Self::global())
    }

    /// The queue for `stream`, creating it if this is the first request.
    ///
    /// Racing first callers all receive the same queue.
    pub fn queue(&self, stream: &StreamKey) -> OrderedTaskQueue {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(queue) = queues.get(stream) {
            return queue.clone();
        }
        tracing::debug!(stream = %stream, "Creating ordered launch queue");
        let queue = OrderedTaskQueue::with_label(format!("stream:{stream}"));
        queues.insert(stream.clone(), queue.clone());
        queue
    }

    /// The queue shared by launches that name no stream.
    pub fn unkeyed_queue(&self) -> OrderedTaskQueue {
        self.unkeyed.clone()
    }

    /// Named streams that have been launched on so far, sorted.
    pub fn streams(&self) -> Vec<StreamKey> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<StreamKey> = queues.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Submit `body` to the queue for `stream`, or the unkeyed queue if `None`.
    pub fn launch<T, E, F, Fut>(
        &self,
        stream: Option<&StreamKey>,
        priority: Option<TaskPriority>,
        body: F,
    ) -> TaskHandle<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let queue = match stream {
            Some(stream) => self.queue(stream),
            None => self.unkeyed_queue(),
        };
        queue.submit(priority.or(self.default_priority), body)
    }
}

/// Launch `body` on the process-wide domain.
///
/// Calls without a stream share one ordering domain, so they observe global
/// FIFO order relative to each other.
pub fn ordered_launch<T, E, F, Fut>(
    stream: Option<&StreamKey>,
    priority: Option<TaskPriority>,
    body: F,
) -> TaskHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    LaunchDomain::global().launch(stream, priority, body)
}
