//! Core types for Courier: the job model, typed job trait, configuration,
//! clock abstraction and error type.

pub mod clock;
pub mod config;
pub mod error;
pub mod job;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CourierConfig, LoggingConfig, ObservabilityConfig, QueueConfig};
pub use error::{CourierError, HandlerError, Result};
pub use job::{CourierJob, Job, JobId, JobInfo, JobPriority, JobState};
