//! Courier - in-process background jobs for web applications.
//!
//! A host creates one [`Courier`] at startup, registers a handler per job
//! type, hands clones of its [`JobQueue`](courier_runtime::JobQueue) to
//! request handlers for fire-and-forget work, and calls [`Courier::run`]
//! to drive the scheduler until shutdown.

pub mod demo;
mod runtime;

#[doc(hidden)]
pub use courier_core;
#[doc(hidden)]
pub use courier_runtime;

pub use runtime::prelude;
pub use runtime::{Courier, CourierBuilder};
