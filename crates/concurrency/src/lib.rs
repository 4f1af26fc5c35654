//! Concurrency primitives for the Gold trace store
//!
//! This crate provides:
//! - [`Context`]: cancellation flag plus optional deadline, passed to every
//!   blocking call (store reads/writes, VCS lookups)
//! - [`TaskGroup`]: fan-out/fan-in over OS threads that fails fast on the
//!   first error and cancels the remaining tasks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod group;

pub use context::{Context, ContextError};
pub use group::{fan_out, join, TaskGroup};
