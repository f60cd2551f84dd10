//! Legacy connection abstraction.
//!
//! A legacy connection hands out a service proxy and promises to report
//! transport-level failure through a handler registered with that proxy. The
//! reply callback and the failure handler are separate paths; the bridge wires
//! both to the same continuation so whichever fires first settles the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use ordo_types::TransportError;

/// Called at most once, when the connection fails before a reply arrives.
pub type FailureHandler = Box<dyn FnOnce(TransportError) + Send + 'static>;

/// Identifies one registered [`FailureHandler`] on its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

pub trait LegacyConnection {
    type Service;

    /// Obtain a proxy for one call.
    ///
    /// Implementations must invoke `on_failure` if the connection becomes
    /// unusable before [`release`](Self::release) is called with the returned
    /// id. Returning `Err` means no call can be made at all; `on_failure` is
    /// then dropped uncalled.
    fn proxy(&self, on_failure: FailureHandler)
    -> Result<(Self::Service, HandlerId), TransportError>;

    /// The call registered under `id` has settled; its failure handler must
    /// not be kept or invoked any more. Unknown ids are ignored.
    fn release(&self, id: HandlerId) {
        let _ = id;
    }
}

struct LoopbackState {
    failed: Option<TransportError>,
    next_id: u64,
    handlers: HashMap<HandlerId, FailureHandler>,
}

/// In-process connection around a cloneable service value.
///
/// Every proxy is a clone of the service. [`invalidate`](Self::invalidate) and
/// friends fire each registered failure handler exactly once and refuse new
/// proxies from then on.
pub struct LoopbackConnection<S> {
    service: S,
    state: Mutex<LoopbackState>,
}

impl<S> fmt::Debug for LoopbackConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LoopbackConnection")
            .field("failed", &state.failed)
            .field("handlers", &state.handlers.len())
            .finish_non_exhaustive()
    }
}

impl<S: Clone> LoopbackConnection<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            state: Mutex::new(LoopbackState {
                failed: None,
                next_id: 0,
                handlers: HashMap::new(),
            }),
        }
    }

    pub fn invalidate(&self) {
        self.fail_with(TransportError::Invalidated);
    }

    pub fn interrupt(&self) {
        self.fail_with(TransportError::Interrupted);
    }

    /// Mark the connection failed and notify every outstanding proxy.
    /// Later calls are no-ops; the first failure reason sticks.
    pub fn fail_with(&self, err: TransportError) {
        let handlers = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.failed.is_some() {
                return;
            }
            state.failed = Some(err.clone());
            std::mem::take(&mut state.handlers)
        };
        tracing::info!(
            handlers = handlers.len(),
            "Loopback connection failed: {err}"
        );
        // Handlers run outside the lock; they may re-enter `proxy`.
        for handler in handlers.into_values() {
            handler(err.clone());
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failed
            .is_some()
    }

    /// Failure handlers registered and not yet released or fired.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }
}

impl<S: Clone> LegacyConnection for LoopbackConnection<S> {
    type Service = S;

    fn proxy(&self, on_failure: FailureHandler) -> Result<(S, HandlerId), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(err) = &state.failed {
            return Err(err.clone());
        }
        let id = HandlerId::new(state.next_id);
        state.next_id += 1;
        state.handlers.insert(id, on_failure);
        Ok((self.service.clone(), id))
    }

    fn release(&self, id: HandlerId) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .remove(&id);
    }
}
