//! Checked continuations for legacy callback APIs.
//!
//! A legacy call site reports its result through a completion callback, possibly
//! on a foreign thread, and sometimes never at all when its connection dies.
//! This crate turns such a call into a future that resolves exactly once:
//!
//! - [`with_continuation`] suspends until the body resumes the
//!   [`ContinuationSlot`] it was given.
//! - The reply adapters on [`ContinuationSlot`] (see [`ReplyShape`]) decode the
//!   usual callback shapes into `Result<T, BridgeError>`.
//! - [`bridge`] also wires the connection's failure path to the same slot, so
//!   an invalidated connection resumes the caller with
//!   [`BridgeError::Transport`] instead of leaving it suspended.
//!
//! ```
//! use ordo_bridge::{ContinuationSlot, LoopbackConnection, bridge};
//!
//! #[derive(Clone)]
//! struct Counter;
//!
//! impl Counter {
//!     fn current(&self, reply: impl FnOnce(Option<u32>, Option<std::io::Error>)) {
//!         reply(Some(5), None);
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let connection = LoopbackConnection::new(Counter);
//! let value = bridge(&connection, |counter: Counter, slot: ContinuationSlot<u32>| {
//!     counter.current(slot.value_reply());
//! })
//! .await;
//! assert_eq!(value.unwrap(), 5);
//! # });
//! ```

mod bridge;
mod connection;
mod reply;
mod slot;

pub use bridge::{bridge, bridge_with_optional_timeout, bridge_with_timeout};
pub use connection::{FailureHandler, HandlerId, LegacyConnection, LoopbackConnection};
pub use reply::{ReplyShape, resolve_error, resolve_optional, resolve_payload, resolve_value};
pub use slot::{CallSite, ContinuationSlot, SlotState, with_continuation};

pub use ordo_types::{BoxError, BridgeError, TransportError};
