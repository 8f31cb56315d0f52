mod record;
mod traits;

pub use record::{Job, JobId, JobState};
pub use traits::{CourierJob, JobInfo, JobPriority};
