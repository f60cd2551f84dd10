//! Runtime-enforced single transfer of ownership.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Holds a value until exactly one consumer takes it.
///
/// The box is `Send + Sync` whenever `T: Send`, so it can sit behind an `Arc`
/// that several tasks or threads see while only one of them ever gets the value.
/// A second [`take_ownership`](Self::take_ownership) is a bug in the caller and
/// panics; there is no fallible variant.
///
/// ```
/// use ordo_sendable::OwnershipTransferBox;
///
/// let slot = OwnershipTransferBox::new(vec![1, 2, 3]);
/// assert!(!slot.has_ownership_been_transferred());
/// let values = std::thread::scope(|s| s.spawn(|| slot.take_ownership()).join().unwrap());
/// assert_eq!(values, [1, 2, 3]);
/// assert!(slot.has_ownership_been_transferred());
/// ```
pub struct OwnershipTransferBox<T> {
    transferred: AtomicBool,
    value: Mutex<Option<T>>,
}

impl<T> OwnershipTransferBox<T> {
    pub const fn new(value: T) -> Self {
        Self {
            transferred: AtomicBool::new(false),
            value: Mutex::new(Some(value)),
        }
    }

    /// Move the value out.
    ///
    /// # Panics
    ///
    /// If ownership was already transferred, by this caller or any other.
    #[track_caller]
    pub fn take_ownership(&self) -> T {
        if self.transferred.swap(true, Ordering::AcqRel) {
            panic!(
                "ownership of {} was already transferred out of this box",
                type_name::<T>()
            );
        }
        let value = self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match value {
            Some(value) => value,
            None => unreachable!("transfer flag was clear but the value is gone"),
        }
    }

    #[must_use]
    pub fn has_ownership_been_transferred(&self) -> bool {
        self.transferred.load(Ordering::Acquire)
    }
}

impl<T> fmt::Debug for OwnershipTransferBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipTransferBox")
            .field("type", &type_name::<T>())
            .field("transferred", &self.has_ownership_been_transferred())
            .finish()
    }
}
