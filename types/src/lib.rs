//! Core domain types for Ordo.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Every other Ordo crate speaks in these types: task priorities, stream keys for
//! ordering domains, and the error taxonomy shared by the queue and the bridge.

// Pedantic lint configuration
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod panic;
mod priority;
mod stream;

pub use error::{BoxError, BridgeError, TaskError, TransportError};
pub use panic::panic_payload_to_string;
pub use priority::{PriorityParseError, TaskPriority};
pub use stream::StreamKey;
