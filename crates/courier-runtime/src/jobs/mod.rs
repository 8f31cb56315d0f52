mod executor;
mod queue;
mod registry;
mod scheduler;
mod stats;
mod store;

pub use executor::{ExecutionResult, JobExecutor};
pub use queue::{EnqueueOptions, JobQueue};
pub use registry::{BoxedJobFuture, BoxedJobHandler, JobEntry, JobRegistry};
pub use scheduler::{CycleReport, Scheduler};
pub use stats::QueueStats;
pub use store::{ClaimedBatch, JobStore};
