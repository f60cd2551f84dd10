//! Reply adapters for the common legacy callback shapes.
//!
//! Each adapter consumes a [`ContinuationSlot`] and returns the closure to pass
//! as the legacy completion handler. The decoding rules live in the `resolve_*`
//! functions so they can be used without a slot.
//!
//! | Callback shape                   | Adapter                  |
//! |----------------------------------|--------------------------|
//! | `(T)`                            | `raw_reply`              |
//! | `(Option<T>)`                    | `optional_value_reply`   |
//! | `(Option<T>, Option<E>)`         | `value_reply`            |
//! | `(Option<E>)`                    | `error_reply`            |
//! | `(Option<bytes>, Option<E>)`     | `decoding_reply`         |
//!
//! An error always wins over a value supplied alongside it.

use std::fmt;

use serde::de::DeserializeOwned;

use ordo_types::{BoxError, BridgeError};

use crate::slot::ContinuationSlot;

/// The closed set of reply decoding strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyShape {
    Raw,
    OptionalValue,
    ValueOrError,
    ErrorOnly,
    Decode,
}

impl ReplyShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::OptionalValue => "optional value",
            Self::ValueOrError => "value or error",
            Self::ErrorOnly => "error only",
            Self::Decode => "decode payload",
        }
    }
}

impl fmt::Display for ReplyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn empty_reply(shape: ReplyShape) -> BridgeError {
    tracing::error!(%shape, "Legacy reply carried neither a value nor an error");
    BridgeError::EmptyReply
}

/// `(Option<T>)`: a missing value is a contract violation.
pub fn resolve_optional<T>(value: Option<T>) -> Result<T, BridgeError> {
    value.ok_or_else(|| empty_reply(ReplyShape::OptionalValue))
}

/// `(Option<T>, Option<E>)`: error first, then value, else `EmptyReply`.
pub fn resolve_value<T, E>(value: Option<T>, error: Option<E>) -> Result<T, BridgeError>
where
    E: Into<BoxError>,
{
    match (value, error) {
        (_, Some(err)) => Err(BridgeError::remote(err)),
        (Some(value), None) => Ok(value),
        (None, None) => Err(empty_reply(ReplyShape::ValueOrError)),
    }
}

/// `(Option<E>)`: absence of an error is success.
pub fn resolve_error<E>(error: Option<E>) -> Result<(), BridgeError>
where
    E: Into<BoxError>,
{
    match error {
        Some(err) => Err(BridgeError::remote(err)),
        None => Ok(()),
    }
}

/// `(Option<bytes>, Option<E>)`: as [`resolve_value`], then JSON-decode.
///
/// A malformed payload yields [`BridgeError::Decode`], never `Remote`.
pub fn resolve_payload<T, P, E>(payload: Option<P>, error: Option<E>) -> Result<T, BridgeError>
where
    T: DeserializeOwned,
    P: AsRef<[u8]>,
    E: Into<BoxError>,
{
    match (payload, error) {
        (_, Some(err)) => Err(BridgeError::remote(err)),
        (Some(bytes), None) => serde_json::from_slice(bytes.as_ref()).map_err(|err| {
            tracing::debug!("Reply payload failed to decode: {err}");
            BridgeError::Decode(err)
        }),
        (None, None) => Err(empty_reply(ReplyShape::Decode)),
    }
}

impl<T: Send + 'static> ContinuationSlot<T> {
    pub fn raw_reply(self) -> impl FnOnce(T) + Send + 'static {
        self.record_shape(ReplyShape::Raw);
        move |value| self.resume(Ok(value))
    }

    pub fn optional_value_reply(self) -> impl FnOnce(Option<T>) + Send + 'static {
        self.record_shape(ReplyShape::OptionalValue);
        move |value| self.resume(resolve_optional(value))
    }

    pub fn value_reply<E>(self) -> impl FnOnce(Option<T>, Option<E>) + Send + 'static
    where
        E: Into<BoxError> + 'static,
    {
        self.record_shape(ReplyShape::ValueOrError);
        move |value, error| self.resume(resolve_value(value, error))
    }
}

impl<T: DeserializeOwned + Send + 'static> ContinuationSlot<T> {
    pub fn decoding_reply<P, E>(self) -> impl FnOnce(Option<P>, Option<E>) + Send + 'static
    where
        P: AsRef<[u8]> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.record_shape(ReplyShape::Decode);
        move |payload, error| self.resume(resolve_payload(payload, error))
    }
}

impl ContinuationSlot<()> {
    pub fn error_reply<E>(self) -> impl FnOnce(Option<E>) + Send + 'static
    where
        E: Into<BoxError> + 'static,
    {
        self.record_shape(ReplyShape::ErrorOnly);
        move |error| self.resume(resolve_error(error))
    }
}
