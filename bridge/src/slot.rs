//! Checked, single-resume continuation slots.
//!
//! A slot is the callback side of a suspended async caller. It moves through
//! one transition only:
//!
//! ```text
//!            resume()                 close_with()
//! Resumed <----------- Pending -----------------> Closed
//!    |                                               |
//!    +-- resume() again: panic        resume(): logged, dropped
//! ```
//!
//! `Closed` is reached when the bridge itself settles the caller (transport
//! failure, timeout) before the legacy callback fires. A late reply is then
//! expected behavior, not misuse. Resuming a slot that was already resumed is a
//! logic error and panics at the violation site.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::oneshot;

use ordo_types::BridgeError;

use crate::reply::ReplyShape;

/// Source location that opened a continuation, used in diagnostics.
pub type CallSite = &'static Location<'static>;

const PENDING: u8 = 0;
const RESUMED: u8 = 1;
const CLOSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Resumed,
    Closed,
}

impl SlotState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            PENDING => Self::Pending,
            RESUMED => Self::Resumed,
            _ => Self::Closed,
        }
    }
}

type Reply<T> = Result<T, BridgeError>;

struct SlotInner<T> {
    state: AtomicU8,
    tx: Mutex<Option<oneshot::Sender<Reply<T>>>>,
    shape: OnceLock<ReplyShape>,
    site: CallSite,
}

impl<T> SlotInner<T> {
    fn deliver(&self, reply: Reply<T>) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx
            && tx.send(reply).is_err()
        {
            tracing::trace!(site = %self.site, "Continuation caller stopped waiting");
        }
    }

    fn close_with(&self, err: BridgeError) -> bool {
        if self
            .state
            .compare_exchange(PENDING, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        tracing::warn!(site = %self.site, "Continuation settled by bridge: {err}");
        self.deliver(Err(err));
        true
    }
}

/// The resumable half of a suspended call.
///
/// Clones share one state; exactly one successful resume is honoured across all
/// of them. When every clone is dropped without a resume, the waiting caller
/// gets [`BridgeError::Abandoned`] rather than hanging.
pub struct ContinuationSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Clone for ContinuationSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for ContinuationSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationSlot")
            .field("site", &format_args!("{}", self.inner.site))
            .field("state", &self.state())
            .field("shape", &self.shape())
            .finish()
    }
}

impl<T> ContinuationSlot<T> {
    pub(crate) fn open(site: CallSite) -> (Self, PendingResume<T>) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            inner: Arc::new(SlotInner {
                state: AtomicU8::new(PENDING),
                tx: Mutex::new(Some(tx)),
                shape: OnceLock::new(),
                site,
            }),
        };
        let pending = PendingResume {
            rx,
            slot: slot.downgrade(),
            site,
        };
        (slot, pending)
    }

    /// Resume the waiting caller with `reply`.
    ///
    /// # Panics
    ///
    /// If this slot (or a clone of it) was already resumed.
    pub fn resume(&self, reply: Result<T, BridgeError>) {
        match self.inner.state.compare_exchange(
            PENDING,
            RESUMED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => self.inner.deliver(reply),
            Err(CLOSED) => {
                tracing::warn!(
                    site = %self.inner.site,
                    "Reply arrived after the continuation was settled; dropping it"
                );
            }
            Err(_) => panic!(
                "continuation opened at {} resumed more than once",
                self.inner.site
            ),
        }
    }

    pub fn resume_returning(&self, value: T) {
        self.resume(Ok(value));
    }

    pub fn resume_throwing(&self, err: BridgeError) {
        self.resume(Err(err));
    }

    #[must_use]
    pub fn state(&self) -> SlotState {
        SlotState::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    /// The reply adapter this slot was handed to, if any.
    #[must_use]
    pub fn shape(&self) -> Option<ReplyShape> {
        self.inner.shape.get().copied()
    }

    #[must_use]
    pub fn site(&self) -> CallSite {
        self.inner.site
    }

    pub(crate) fn record_shape(&self, shape: ReplyShape) {
        if self.inner.shape.set(shape).is_err() {
            tracing::debug!(
                site = %self.inner.site,
                "Continuation handed to a second reply adapter ({shape})"
            );
        }
    }

    pub(crate) fn downgrade(&self) -> WeakSlot<T> {
        WeakSlot(Arc::downgrade(&self.inner))
    }
}

/// Non-owning slot reference for failure paths.
///
/// Holding one does not keep the caller waiting: if every strong slot is
/// dropped the caller is released with `Abandoned` regardless.
pub(crate) struct WeakSlot<T>(Weak<SlotInner<T>>);

impl<T> WeakSlot<T> {
    /// Settle the caller with `err` if nobody resumed it yet.
    pub(crate) fn close_with(&self, err: BridgeError) -> bool {
        match self.0.upgrade() {
            Some(inner) => inner.close_with(err),
            None => false,
        }
    }
}

/// The waiting half of a suspended call.
pub(crate) struct PendingResume<T> {
    rx: oneshot::Receiver<Reply<T>>,
    slot: WeakSlot<T>,
    site: CallSite,
}

impl<T> PendingResume<T> {
    pub(crate) async fn wait(self) -> Result<T, BridgeError> {
        Self::settle(self.rx.await, self.site)
    }

    pub(crate) async fn wait_timeout(self, timeout: Duration) -> Result<T, BridgeError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(received) => Self::settle(received, self.site),
            Err(_) => {
                self.slot.close_with(BridgeError::TimedOut(timeout));
                Err(BridgeError::TimedOut(timeout))
            }
        }
    }

    fn settle(
        received: Result<Reply<T>, oneshot::error::RecvError>,
        site: CallSite,
    ) -> Result<T, BridgeError> {
        match received {
            Ok(reply) => reply,
            Err(_) => {
                tracing::error!(%site, "Continuation dropped without being resumed");
                Err(BridgeError::Abandoned)
            }
        }
    }
}

/// Suspend until `body` resumes the slot it is given.
///
/// `body` runs when the returned future is first polled. Hand the slot (or one
/// of its reply adapters) to the legacy callback; dropping it instead resolves
/// the call with [`BridgeError::Abandoned`].
#[track_caller]
pub fn with_continuation<T, F>(body: F) -> impl Future<Output = Result<T, BridgeError>>
where
    F: FnOnce(ContinuationSlot<T>),
{
    let site = Location::caller();
    async move {
        let (slot, pending) = ContinuationSlot::open(site);
        body(slot);
        pending.wait().await
    }
}
