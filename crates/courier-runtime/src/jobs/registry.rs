use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use courier_core::job::CourierJob;
use courier_core::{CourierError, HandlerError};
use serde_json::Value;

/// Future returned by a boxed job handler.
pub type BoxedJobFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// Type alias for boxed job handler function.
pub type BoxedJobHandler = Arc<dyn Fn(Value) -> BoxedJobFuture + Send + Sync>;

/// Entry in the job registry.
pub struct JobEntry {
    /// Job type this entry handles.
    pub job_type: String,
    /// Per-attempt timeout overriding the queue default.
    pub timeout: Option<Duration>,
    /// Job handler function.
    pub handler: BoxedJobHandler,
}

impl std::fmt::Debug for JobEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEntry")
            .field("job_type", &self.job_type)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Registry mapping job types to their handlers.
///
/// Registration is last-write-wins per type.
#[derive(Clone, Default, Debug)]
pub struct JobRegistry {
    jobs: HashMap<String, Arc<JobEntry>>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    /// Register an async closure for a job type, returning the entry it replaced.
    pub fn register_fn<F, Fut>(
        &mut self,
        job_type: impl Into<String>,
        handler: F,
    ) -> Option<Arc<JobEntry>>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handler: BoxedJobHandler =
            Arc::new(move |data: Value| -> BoxedJobFuture { Box::pin(handler(data)) });
        self.insert(job_type.into(), None, handler)
    }

    /// Register a typed job, returning the entry it replaced.
    pub fn register<J: CourierJob>(&mut self) -> Option<Arc<JobEntry>> {
        let info = J::info();

        let handler: BoxedJobHandler = Arc::new(|data: Value| -> BoxedJobFuture {
            Box::pin(async move {
                let args: J::Args = serde_json::from_value(data)
                    .map_err(|e| CourierError::Deserialization(e.to_string()))?;
                J::execute(args).await
            })
        });

        self.insert(info.name.to_string(), info.timeout, handler)
    }

    fn insert(
        &mut self,
        job_type: String,
        timeout: Option<Duration>,
        handler: BoxedJobHandler,
    ) -> Option<Arc<JobEntry>> {
        let entry = Arc::new(JobEntry {
            job_type: job_type.clone(),
            timeout,
            handler,
        });

        let previous = self.jobs.insert(job_type.clone(), entry);
        if previous.is_some() {
            tracing::warn!(job_type = %job_type, "Replaced existing job handler");
        } else {
            tracing::debug!(job_type = %job_type, "Registered job handler");
        }
        previous
    }

    /// Get a job entry by type.
    pub fn get(&self, job_type: &str) -> Option<Arc<JobEntry>> {
        self.jobs.get(job_type).cloned()
    }

    /// Check if a handler exists for a type.
    pub fn exists(&self, job_type: &str) -> bool {
        self.jobs.contains_key(job_type)
    }

    /// Get all registered job types.
    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(|s| s.as_str())
    }

    /// Get the number of registered job types.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
