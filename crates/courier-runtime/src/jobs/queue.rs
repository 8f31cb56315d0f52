use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use courier_core::job::{CourierJob, Job, JobId, JobPriority};
use courier_core::{Clock, HandlerError, QueueConfig, Result, SystemClock};
use futures::FutureExt;
use serde_json::Value;

use super::executor::JobExecutor;
use super::registry::JobRegistry;
use super::scheduler::{CycleReport, Scheduler};
use super::stats::QueueStats;
use super::store::JobStore;

/// Scheduling options for a single enqueue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Priority level.
    pub priority: JobPriority,
    /// Delay before the job becomes eligible.
    pub delay: Duration,
}

impl EnqueueOptions {
    /// Medium priority, no delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct QueueInner {
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    store: Arc<JobStore>,
    registry: Arc<RwLock<JobRegistry>>,
    scheduler: Scheduler,
    running: AtomicBool,
    epoch: AtomicU64,
}

/// In-process background job queue.
///
/// Cloning yields another handle to the same queue. The host creates one
/// queue at startup, hands clones to whatever enqueues work, and drives the
/// lifecycle with [`JobQueue::start`] and [`JobQueue::stop`].
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.inner.config)
            .field("jobs", &self.inner.store.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl JobQueue {
    /// Create a queue driven by the system clock.
    pub fn new(config: QueueConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a queue driven by the given clock.
    pub fn with_clock(config: QueueConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(JobStore::new());
        let registry = Arc::new(RwLock::new(JobRegistry::new()));
        let executor = JobExecutor::new(store.clone(), registry.clone(), config.job_timeout());
        let scheduler = Scheduler::new(store.clone(), executor, clock.clone(), &config);

        Self {
            inner: Arc::new(QueueInner {
                config,
                clock,
                store,
                registry,
                scheduler,
                running: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Get the queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Register an async handler for a job type, replacing any previous one.
    pub fn register_fn<F, Fut>(&self, job_type: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HandlerError>> + Send + 'static,
    {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_fn(job_type, handler);
    }

    /// Register a typed job, replacing any previous handler for its name.
    pub fn register<J: CourierJob>(&self) {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register::<J>();
    }

    /// Check if a handler is registered for a job type.
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .exists(job_type)
    }

    /// Enqueue a job at medium priority with no delay.
    pub fn enqueue(&self, job_type: impl Into<String>, data: Value) -> JobId {
        self.enqueue_with(job_type, data, EnqueueOptions::default())
    }

    /// Enqueue a job with explicit priority and delay.
    pub fn enqueue_with(
        &self,
        job_type: impl Into<String>,
        data: Value,
        options: EnqueueOptions,
    ) -> JobId {
        let job = Job::new(
            job_type,
            data,
            options.priority,
            self.inner.config.max_attempts,
            self.inner.clock.now(),
        )
        .with_delay(options.delay);
        let id = job.id;

        tracing::debug!(
            job_id = %id,
            job_type = %job.job_type,
            priority = %job.priority,
            scheduled_at = ?job.scheduled_at,
            "Enqueued job"
        );

        self.inner.store.insert(job);
        id
    }

    /// Enqueue a typed job using its default priority.
    pub fn dispatch<J: CourierJob>(&self, args: J::Args) -> Result<JobId> {
        self.dispatch_in::<J>(Duration::ZERO, args)
    }

    /// Enqueue a typed job after a delay.
    pub fn dispatch_in<J: CourierJob>(&self, delay: Duration, args: J::Args) -> Result<JobId> {
        let info = J::info();
        let data = serde_json::to_value(args)?;
        let options = EnqueueOptions::new()
            .with_priority(info.priority)
            .with_delay(delay);
        Ok(self.enqueue_with(info.name, data, options))
    }

    /// Get a copy of a stored job.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.inner.store.get(id)
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Check if the queue holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Aggregate statistics over the current queue contents.
    pub fn stats(&self) -> QueueStats {
        self.inner.store.read(|jobs| QueueStats::collect(jobs.values()))
    }

    /// Run a single scheduler cycle without sleeping.
    pub async fn tick(&self) -> CycleReport {
        self.inner.scheduler.run_cycle().await
    }

    /// Check if the polling loop is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run the polling loop until [`JobQueue::stop`] is called.
    ///
    /// Calling this while the loop is already running returns immediately.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Job queue already running");
            return;
        }
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let poll_interval = self.inner.config.poll_interval();

        tracing::info!(
            poll_interval = ?poll_interval,
            batch_size = self.inner.config.batch_size,
            max_concurrent = self.inner.config.max_concurrent,
            "Job queue started"
        );

        while self.owns_loop(epoch) {
            match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(report) if !report.is_idle() => {
                    tracing::debug!(
                        selected = report.selected,
                        succeeded = report.succeeded,
                        retried = report.retried,
                        exhausted = report.exhausted,
                        unrouted = report.unrouted,
                        purged = report.purged,
                        "Scheduler cycle finished"
                    );
                }
                Ok(_) => {}
                Err(_) => tracing::error!("Scheduler cycle panicked, continuing"),
            }

            tokio::time::sleep(poll_interval).await;
        }

        tracing::info!("Job queue stopped");
    }

    /// Stop the polling loop after its current sleep.
    ///
    /// In-flight handlers are neither cancelled nor awaited.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Job queue stop requested");
        }
    }

    fn owns_loop(&self, epoch: u64) -> bool {
        self.inner.running.load(Ordering::SeqCst)
            && self.inner.epoch.load(Ordering::SeqCst) == epoch
    }
}
