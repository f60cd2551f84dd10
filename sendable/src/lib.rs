//! Crossing thread boundaries that the type system cannot see.
//!
//! - [`OwnershipTransferBox`] hands a value to exactly one consumer and panics on
//!   a second take.
//! - [`UncheckedSendable`] and [`UncheckedDispatch`] remove the `Send` check for
//!   values the caller promises are only used from one serial context. They
//!   verify nothing.

mod dispatch;
mod transfer;
mod unchecked;

pub use dispatch::{
    BlockingPoolDispatch, DispatchQueue, SerialDispatchQueue, UncheckedDispatch, Work,
};
pub use transfer::OwnershipTransferBox;
pub use unchecked::UncheckedSendable;
