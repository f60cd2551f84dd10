//! Bridging one legacy call into an awaitable result.

use std::panic::Location;
use std::time::Duration;

use ordo_types::BridgeError;

use crate::connection::{FailureHandler, HandlerId, LegacyConnection};
use crate::slot::{CallSite, ContinuationSlot};

/// Perform one legacy call over `connection` and await its reply.
///
/// `body` receives the service proxy and the continuation slot; it must arrange
/// for the slot to be resumed, typically by passing one of the slot's reply
/// adapters as the legacy completion handler. If the connection fails before
/// the reply, the caller resumes with [`BridgeError::Transport`]. If the proxy
/// cannot be obtained at all, `body` is never called.
///
/// The failure handler is released back to the connection once the call
/// settles, times out or is dropped.
#[track_caller]
pub fn bridge<C, T, F>(
    connection: &C,
    body: F,
) -> impl Future<Output = Result<T, BridgeError>>
where
    C: LegacyConnection,
    F: FnOnce(C::Service, ContinuationSlot<T>),
    T: Send + 'static,
{
    call(connection, None, body, Location::caller())
}

/// [`bridge`], giving up with [`BridgeError::TimedOut`] after `timeout`.
///
/// A reply that arrives after the deadline is logged and discarded.
#[track_caller]
pub fn bridge_with_timeout<C, T, F>(
    connection: &C,
    timeout: Duration,
    body: F,
) -> impl Future<Output = Result<T, BridgeError>>
where
    C: LegacyConnection,
    F: FnOnce(C::Service, ContinuationSlot<T>),
    T: Send + 'static,
{
    call(connection, Some(timeout), body, Location::caller())
}

/// [`bridge`] or [`bridge_with_timeout`] depending on `timeout`.
#[track_caller]
pub fn bridge_with_optional_timeout<C, T, F>(
    connection: &C,
    timeout: Option<Duration>,
    body: F,
) -> impl Future<Output = Result<T, BridgeError>>
where
    C: LegacyConnection,
    F: FnOnce(C::Service, ContinuationSlot<T>),
    T: Send + 'static,
{
    call(connection, timeout, body, Location::caller())
}

async fn call<C, T, F>(
    connection: &C,
    timeout: Option<Duration>,
    body: F,
    site: CallSite,
) -> Result<T, BridgeError>
where
    C: LegacyConnection,
    F: FnOnce(C::Service, ContinuationSlot<T>),
    T: Send + 'static,
{
    let (slot, pending) = ContinuationSlot::open(site);
    let (service, id) = connection.proxy(failure_handler(&slot))?;
    let _registration = Registration { connection, id };
    body(service, slot);
    match timeout {
        Some(timeout) => pending.wait_timeout(timeout).await,
        None => pending.wait().await,
    }
}

/// Releases a failure handler when the awaiting side goes away.
struct Registration<'a, C: LegacyConnection> {
    connection: &'a C,
    id: HandlerId,
}

impl<C: LegacyConnection> Drop for Registration<'_, C> {
    fn drop(&mut self) {
        self.connection.release(self.id);
    }
}

fn failure_handler<T: Send + 'static>(slot: &ContinuationSlot<T>) -> FailureHandler {
    let weak = slot.downgrade();
    Box::new(move |err| {
        weak.close_with(BridgeError::Transport(err));
    })
}
