//! Courier runtime: the in-process job queue, its scheduler loop and the
//! tracing setup used by hosts.

pub mod jobs;
pub mod observability;

pub use jobs::{CycleReport, EnqueueOptions, JobQueue, JobRegistry, QueueStats};
pub use observability::init_tracing;
