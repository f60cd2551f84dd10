//! Unchecked `Send`/`Sync` wrapper.
//!
//! The compiler rejects moving non-`Send` values across threads:
//!
//! ```compile_fail
//! use std::rc::Rc;
//!
//! fn require_send<T: Send>(_: T) {}
//!
//! require_send(Rc::new(5));
//! ```
//!
//! [`UncheckedSendable`] lifts that check for one value. Nothing is verified
//! at runtime; the `unsafe` constructor is where the caller takes on the proof.
//!
//! ```
//! use std::rc::Rc;
//!
//! use ordo_sendable::UncheckedSendable;
//!
//! fn require_send<T: Send>(_: T) {}
//!
//! // SAFETY: the only handle to this `Rc` moves with the wrapper.
//! require_send(unsafe { UncheckedSendable::new(Rc::new(5)) });
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A value asserted, without proof, to be safe to send and share.
///
/// When `T` is a future, the wrapper is itself a future with the same output.
/// This is how a future holding non-`Send` state is handed to an executor
/// that requires `Send`.
pub struct UncheckedSendable<T> {
    value: T,
}

// SAFETY: `new` is the only constructor and is unsafe; its caller guarantees
// the value is never accessed from two threads at once and that moving it
// to another thread does not split shared thread-local state.
unsafe impl<T> Send for UncheckedSendable<T> {}

// SAFETY: same obligation as `Send`; shared references are only used from one
// logical serial context at a time.
unsafe impl<T> Sync for UncheckedSendable<T> {}

impl<T> UncheckedSendable<T> {
    /// Wrap `value`.
    ///
    /// # Safety
    ///
    /// For the wrapper's whole life, `value` (and anything it shares state
    /// with, such as other clones of an `Rc`) must only be touched from one
    /// thread at a time, and dropping it on whichever thread ends up owning the
    /// wrapper must be sound.
    pub const unsafe fn new(value: T) -> Self {
        Self { value }
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Future> Future for UncheckedSendable<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `value` is structurally pinned. It is never moved out while
        // pinned (`into_inner` and `get_mut` need an unpinned `Self`) and there
        // is no `Drop` impl.
        let value = unsafe { self.map_unchecked_mut(|this| &mut this.value) };
        value.poll(cx)
    }
}

impl<T> fmt::Debug for UncheckedSendable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UncheckedSendable")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}
