use std::collections::BTreeMap;

use courier_core::job::Job;
use serde::{Deserialize, Serialize};

/// Snapshot of queue contents for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Jobs that still have attempts left, whether ready or delayed.
    pub pending: usize,
    /// In-flight jobs. Not tracked separately, always 0.
    pub processing: usize,
    /// Exhausted jobs awaiting purge.
    pub failed: usize,
    /// Every stored job tallied by type.
    pub by_type: BTreeMap<String, usize>,
}

impl QueueStats {
    /// Aggregate over a set of stored jobs.
    pub fn collect<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut stats = Self::default();
        for job in jobs {
            if job.is_exhausted() {
                stats.failed += 1;
            } else {
                stats.pending += 1;
            }
            *stats.by_type.entry(job.job_type.clone()).or_default() += 1;
        }
        stats
    }

    /// Total number of stored jobs.
    pub fn total(&self) -> usize {
        self.pending + self.failed
    }
}
