use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use courier_core::job::{Job, JobId};

#[derive(Debug, Default)]
struct StoreState {
    jobs: HashMap<JobId, Job>,
    /// Jobs handed to a running cycle and not yet released.
    claimed: HashSet<JobId>,
}

impl StoreState {
    /// Ready, unclaimed jobs in dispatch order, truncated to `limit`.
    fn ready_batch(&self, now: DateTime<Utc>, limit: usize) -> Vec<&Job> {
        let mut ready: Vec<&Job> = self
            .jobs
            .values()
            .filter(|job| job.is_ready(now) && !self.claimed.contains(&job.id))
            .collect();

        ready.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        ready.truncate(limit);
        ready
    }
}

/// In-memory keyed collection of live jobs.
///
/// Every access goes through one mutex that is never held across an await,
/// so intake, dispatch and stats never observe a half-applied update.
#[derive(Debug, Default)]
pub struct JobStore {
    state: Mutex<StoreState>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new job.
    pub fn insert(&self, job: Job) {
        self.lock().jobs.insert(job.id, job);
    }

    /// Get a copy of a job.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.lock().jobs.get(&id).cloned()
    }

    /// Remove a job.
    pub fn remove(&self, id: JobId) -> Option<Job> {
        self.lock().jobs.remove(&id)
    }

    /// Ready jobs ordered by priority (highest first) then age (oldest first),
    /// truncated to `limit`. Jobs claimed by a running cycle are skipped.
    pub fn select_ready(&self, now: DateTime<Utc>, limit: usize) -> Vec<Job> {
        let state = self.lock();
        state
            .ready_batch(now, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Select a batch like [`JobStore::select_ready`] and claim it.
    ///
    /// Claimed jobs are invisible to other selections until the returned
    /// batch is dropped.
    pub fn claim_ready(&self, now: DateTime<Utc>, limit: usize) -> ClaimedBatch<'_> {
        let mut state = self.lock();
        let jobs: Vec<Job> = state
            .ready_batch(now, limit)
            .into_iter()
            .cloned()
            .collect();
        let ids: Vec<JobId> = jobs.iter().map(|job| job.id).collect();
        state.claimed.extend(ids.iter().copied());

        ClaimedBatch {
            store: self,
            ids,
            jobs,
        }
    }

    fn release(&self, ids: &[JobId]) {
        let mut state = self.lock();
        for id in ids {
            state.claimed.remove(id);
        }
    }

    /// Count an attempt against a job, returning the updated copy.
    pub fn begin_attempt(&self, id: JobId) -> Option<Job> {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&id)?;
        job.attempts += 1;
        Some(job.clone())
    }

    /// Record the message of a failed attempt, returning the updated copy.
    pub fn record_failure(&self, id: JobId, error: String) -> Option<Job> {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&id)?;
        job.error = Some(error);
        Some(job.clone())
    }

    /// Drop exhausted jobs older than the retention window.
    pub fn purge_expired(&self, now: DateTime<Utc>, retention: Duration) -> Vec<JobId> {
        let mut state = self.lock();
        let expired: Vec<JobId> = state
            .jobs
            .values()
            .filter(|job| job.is_expired(now, retention))
            .map(|job| job.id)
            .collect();

        for id in &expired {
            state.jobs.remove(id);
        }
        expired
    }

    /// Run a read-only view over every stored job.
    pub fn read<R>(&self, f: impl FnOnce(&HashMap<JobId, Job>) -> R) -> R {
        f(&self.lock().jobs)
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }
}

/// A batch of jobs claimed for one scheduler cycle.
///
/// Dropping the batch releases the claim, including when the cycle unwinds.
pub struct ClaimedBatch<'a> {
    store: &'a JobStore,
    ids: Vec<JobId>,
    jobs: Vec<Job>,
}

impl ClaimedBatch<'_> {
    /// Number of claimed jobs.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if nothing was claimed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Take the claimed job copies; the claim itself stays held.
    pub fn take_jobs(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.jobs)
    }
}

impl Drop for ClaimedBatch<'_> {
    fn drop(&mut self) {
        self.store.release(&self.ids);
    }
}
