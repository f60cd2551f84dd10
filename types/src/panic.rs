//! Rendering caught panic payloads.

use std::any::Any;

/// Message carried by a payload from `catch_unwind` or `JoinError::into_panic`.
///
/// `panic!` with a literal yields `&str`, with format arguments `String`;
/// anything else is reported as `"unknown panic"`.
#[must_use]
#[allow(clippy::borrowed_box)] // `&dyn Any` would accept the Box itself and never downcast
pub fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
