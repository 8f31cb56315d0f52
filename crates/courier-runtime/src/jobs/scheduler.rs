use std::sync::Arc;

use courier_core::{Clock, QueueConfig};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::executor::{ExecutionResult, JobExecutor};
use super::store::JobStore;

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Jobs taken into this cycle's batch.
    pub selected: usize,
    /// Jobs that completed and were removed.
    pub succeeded: usize,
    /// Failed attempts that left the job retryable.
    pub retried: usize,
    /// Failed attempts that used up the job's last try.
    pub exhausted: usize,
    /// Failed attempts caused by a timeout (also counted as retried/exhausted).
    pub timed_out: usize,
    /// Jobs left untouched because no handler is registered.
    pub unrouted: usize,
    /// Exhausted jobs purged after the retention window.
    pub purged: usize,
}

impl CycleReport {
    /// Check whether the cycle changed anything.
    pub fn is_idle(&self) -> bool {
        self.selected == 0 && self.purged == 0
    }

    fn record(&mut self, result: &ExecutionResult) {
        match result {
            ExecutionResult::Completed => self.succeeded += 1,
            ExecutionResult::Unrouted => self.unrouted += 1,
            ExecutionResult::Skipped => {}
            ExecutionResult::Failed { retryable, .. } => self.record_failure(*retryable),
            ExecutionResult::TimedOut { retryable } => {
                self.timed_out += 1;
                self.record_failure(*retryable);
            }
        }
    }

    fn record_failure(&mut self, retryable: bool) {
        if retryable {
            self.retried += 1;
        } else {
            self.exhausted += 1;
        }
    }
}

/// Selects, dispatches and evicts jobs, one cycle at a time.
pub struct Scheduler {
    store: Arc<JobStore>,
    executor: JobExecutor,
    clock: Arc<dyn Clock>,
    batch_size: usize,
    max_concurrent: usize,
    retention: chrono::Duration,
}

impl Scheduler {
    /// Create a new scheduler.
    pub fn new(
        store: Arc<JobStore>,
        executor: JobExecutor,
        clock: Arc<dyn Clock>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            store,
            executor,
            clock,
            batch_size: config.batch_size.max(1),
            max_concurrent: config.max_concurrent.max(1),
            retention: config.retention(),
        }
    }

    /// Run one select / dispatch / evict cycle.
    ///
    /// Batch jobs start in priority order; with `max_concurrent == 1` each
    /// handler finishes before the next one starts.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut claim = self.store.claim_ready(self.clock.now(), self.batch_size);
        let batch = claim.take_jobs();
        let mut report = CycleReport {
            selected: batch.len(),
            ..Default::default()
        };

        let executor = &self.executor;
        let results: Vec<ExecutionResult> = stream::iter(batch)
            .map(|job| async move { executor.execute(&job).await })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        drop(claim);

        for result in &results {
            report.record(result);
        }

        let purged = self.store.purge_expired(self.clock.now(), self.retention);
        for id in &purged {
            tracing::debug!(job_id = %id, "Purged exhausted job");
        }
        report.purged = purged.len();

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, RwLock};

    use chrono::Duration;
    use courier_core::job::{Job, JobPriority};
    use courier_core::{CourierError, ManualClock};

    use super::super::registry::JobRegistry;
    use super::*;

    fn scheduler(
        config: QueueConfig,
        registry: JobRegistry,
        clock: ManualClock,
    ) -> (Scheduler, Arc<JobStore>) {
        let store = Arc::new(JobStore::new());
        let executor = JobExecutor::new(
            store.clone(),
            Arc::new(RwLock::new(registry)),
            config.job_timeout(),
        );
        let scheduler = Scheduler::new(store.clone(), executor, Arc::new(clock), &config);
        (scheduler, store)
    }

    #[tokio::test]
    async fn test_idle_cycle() {
        let (scheduler, _) = scheduler(
            QueueConfig::default(),
            JobRegistry::new(),
            ManualClock::starting_now(),
        );
        let report = scheduler.run_cycle().await;
        assert!(report.is_idle());
        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn test_report_tallies_outcomes() {
        let clock = ManualClock::starting_now();
        let mut registry = JobRegistry::new();
        registry.register_fn("ok", |_| async { Ok(()) });
        registry.register_fn("bad", |_| async { Err(CourierError::handler("nope")) });
        let (scheduler, store) = scheduler(QueueConfig::default(), registry, clock.clone());

        let now = clock.now();
        store.insert(Job::new("ok", serde_json::json!({}), JobPriority::High, 3, now));
        store.insert(Job::new("bad", serde_json::json!({}), JobPriority::Medium, 3, now));
        store.insert(Job::new("last", serde_json::json!({}), JobPriority::Low, 3, now));
        store.insert(Job::new("bad", serde_json::json!({}), JobPriority::Low, 1, now));

        let report = scheduler.run_cycle().await;
        assert_eq!(report.selected, 4);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.retried, 1);
        assert_eq!(report.exhausted, 1);
        assert_eq!(report.unrouted, 1);
        assert_eq!(report.purged, 0);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_sequential_dispatch_order() {
        let clock = ManualClock::starting_now();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = JobRegistry::new();
        let seen = order.clone();
        registry.register_fn("track", move |data| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(data["name"].as_str().unwrap().to_string());
                Ok(())
            }
        });
        let (scheduler, store) = scheduler(QueueConfig::default(), registry, clock.clone());

        let t0 = clock.now();
        for (name, priority, offset) in [
            ("a", JobPriority::Low, 0),
            ("b", JobPriority::High, 1),
            ("c", JobPriority::Medium, 2),
            ("d", JobPriority::High, 3),
        ] {
            store.insert(Job::new(
                "track",
                serde_json::json!({ "name": name }),
                priority,
                3,
                t0 + Duration::seconds(offset),
            ));
        }
        clock.advance(Duration::seconds(5));

        scheduler.run_cycle().await;
        assert_eq!(*order.lock().unwrap(), vec!["b", "d", "c", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_concurrency_overlaps_handlers() {
        let clock = ManualClock::starting_now();
        let mut registry = JobRegistry::new();
        registry.register_fn("slow", |_| async {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            Ok(())
        });
        let config = QueueConfig {
            max_concurrent: 4,
            ..Default::default()
        };
        let (scheduler, store) = scheduler(config, registry, clock.clone());
        for _ in 0..4 {
            store.insert(Job::new(
                "slow",
                serde_json::json!({}),
                JobPriority::Medium,
                3,
                clock.now(),
            ));
        }

        let started = tokio::time::Instant::now();
        let report = scheduler.run_cycle().await;

        assert_eq!(report.succeeded, 4);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_dispatch_sums_latency() {
        let clock = ManualClock::starting_now();
        let mut registry = JobRegistry::new();
        registry.register_fn("slow", |_| async {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            Ok(())
        });
        let (scheduler, store) = scheduler(QueueConfig::default(), registry, clock.clone());
        for _ in 0..3 {
            store.insert(Job::new(
                "slow",
                serde_json::json!({}),
                JobPriority::Medium,
                3,
                clock.now(),
            ));
        }

        let started = tokio::time::Instant::now();
        scheduler.run_cycle().await;
        assert!(started.elapsed() >= std::time::Duration::from_secs(3));
    }
}
