use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use courier_core::job::{Job, JobId};
use courier_core::CourierError;
use futures::FutureExt;
use tokio::time::timeout;

use super::registry::{JobEntry, JobRegistry};
use super::store::JobStore;

/// Executes a single job attempt and records its outcome in the store.
pub struct JobExecutor {
    store: Arc<JobStore>,
    registry: Arc<RwLock<JobRegistry>>,
    default_timeout: Option<Duration>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        store: Arc<JobStore>,
        registry: Arc<RwLock<JobRegistry>>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            registry,
            default_timeout,
        }
    }

    fn handler_for(&self, job_type: &str) -> Option<Arc<JobEntry>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_type)
    }

    /// Execute one attempt of a selected job.
    pub async fn execute(&self, job: &Job) -> ExecutionResult {
        let entry = match self.handler_for(&job.job_type) {
            Some(e) => e,
            None => {
                tracing::error!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    "No handler registered for job type"
                );
                return ExecutionResult::Unrouted;
            }
        };

        let job = match self.store.begin_attempt(job.id) {
            Some(job) => job,
            None => return ExecutionResult::Skipped,
        };

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Processing job"
        );

        let job_timeout = entry.timeout.or(self.default_timeout);
        let run = AssertUnwindSafe((entry.handler)(job.data.clone())).catch_unwind();

        let outcome = match job_timeout {
            Some(limit) => match timeout(limit, run).await {
                Ok(result) => Attempt::Finished(result),
                Err(_) => Attempt::TimedOut(limit),
            },
            None => Attempt::Finished(run.await),
        };

        match outcome {
            Attempt::Finished(Ok(Ok(()))) => {
                self.store.remove(job.id);
                tracing::info!(job_id = %job.id, job_type = %job.job_type, "Job completed");
                ExecutionResult::Completed
            }
            Attempt::Finished(Ok(Err(e))) => self.fail(job.id, failure_message(&e), false),
            Attempt::Finished(Err(panic)) => self.fail(job.id, panic_message(panic.as_ref()), false),
            Attempt::TimedOut(limit) => {
                self.fail(job.id, CourierError::Timeout(limit).to_string(), true)
            }
        }
    }

    fn fail(&self, id: JobId, error: String, timed_out: bool) -> ExecutionResult {
        let Some(job) = self.store.record_failure(id, error.clone()) else {
            return ExecutionResult::Skipped;
        };
        let retryable = !job.is_exhausted();

        if retryable {
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                error = %error,
                "Job failed, will retry"
            );
        } else {
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts = job.attempts,
                error = %error,
                "Job failed permanently"
            );
        }

        if timed_out {
            ExecutionResult::TimedOut { retryable }
        } else {
            ExecutionResult::Failed { error, retryable }
        }
    }
}

enum Attempt {
    Finished(std::thread::Result<Result<(), CourierError>>),
    TimedOut(Duration),
}

/// Message stored on the job for a failed attempt.
fn failure_message(e: &CourierError) -> String {
    let message = match e {
        CourierError::Handler(msg) | CourierError::Job(msg) => msg.clone(),
        other => other.to_string(),
    };
    if message.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        message
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown error".to_string());
    format!("Handler panicked: {}", detail)
}

/// Result of job execution.
#[derive(Debug)]
pub enum ExecutionResult {
    /// Handler succeeded and the job was removed.
    Completed,
    /// Handler returned an error or panicked.
    Failed { error: String, retryable: bool },
    /// Handler exceeded its timeout.
    TimedOut { retryable: bool },
    /// No handler registered; the job was left untouched.
    Unrouted,
    /// The job disappeared before it could be attempted.
    Skipped,
}

impl ExecutionResult {
    /// Check if execution was successful.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if the job will be attempted again.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Failed { retryable, .. } => *retryable,
            Self::TimedOut { retryable } => *retryable,
            _ => false,
        }
    }

    /// Check if this attempt used up the job's last try.
    pub fn is_exhausted(&self) -> bool {
        match self {
            Self::Failed { retryable, .. } => !*retryable,
            Self::TimedOut { retryable } => !*retryable,
            _ => false,
        }
    }
}
