//! Ordered task execution on tokio.
//!
//! tokio makes no promise about the order in which spawned tasks start. This
//! crate adds that promise per queue:
//!
//! - [`OrderedTaskQueue`] starts submitted bodies strictly in submission order,
//!   one at a time, and returns a [`TaskHandle`] immediately.
//! - [`ordered_launch`] and [`LaunchDomain`] keep one queue per stream so related
//!   work serializes while unrelated work does not.
//!
//! A failed, panicked or cancelled unit never stalls the units behind it.

mod launch;
mod link;
mod queue;

pub use launch::{LaunchDomain, ordered_launch};
pub use queue::{OrderedTaskQueue, TaskHandle};

pub use ordo_types::{StreamKey, TaskError, TaskPriority};
