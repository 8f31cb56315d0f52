use std::sync::Arc;

use tokio::sync::broadcast;

use courier_core::config::CourierConfig;
use courier_core::error::{CourierError, Result};
use courier_core::{Clock, SystemClock};
use courier_runtime::JobQueue;

/// Prelude module for common imports.
pub mod prelude {
    pub use chrono::{DateTime, Utc};
    pub use serde_json::{json, Value};

    pub use courier_core::config::CourierConfig;
    pub use courier_core::error::{CourierError, HandlerError, Result};
    pub use courier_core::job::{CourierJob, Job, JobId, JobInfo, JobPriority};
    pub use courier_runtime::{EnqueueOptions, JobQueue, QueueStats};

    pub use crate::{Courier, CourierBuilder};
}

/// The Courier runtime: owns the queue and drives its lifecycle.
pub struct Courier {
    config: CourierConfig,
    queue: JobQueue,
    shutdown_tx: broadcast::Sender<()>,
}

impl Courier {
    /// Create a new builder for configuring Courier.
    pub fn builder() -> CourierBuilder {
        CourierBuilder::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Get a handle to the job queue.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Start the scheduler and block until Ctrl-C or [`Courier::shutdown`].
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let runner = self.queue.clone();
        let scheduler = tokio::spawn(async move { runner.start().await });

        tracing::info!(jobs = self.queue.len(), "Courier runtime started");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("Received shutdown notification");
            }
        }

        self.queue.stop();
        scheduler
            .await
            .map_err(|e| CourierError::Internal(format!("Scheduler task failed: {}", e)))?;

        let stats = self.queue.stats();
        tracing::info!(
            remaining = stats.total(),
            pending = stats.pending,
            failed = stats.failed,
            "Courier runtime stopped"
        );
        Ok(())
    }

    /// Request shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get a sender that triggers shutdown from another task.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }
}

/// Builder for configuring the Courier runtime.
pub struct CourierBuilder {
    config: Option<CourierConfig>,
    clock: Arc<dyn Clock>,
}

impl CourierBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: CourierConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Drive scheduling decisions from a custom clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the Courier runtime.
    pub fn build(self) -> Result<Courier> {
        let config = self
            .config
            .ok_or_else(|| CourierError::Config("Configuration is required".to_string()))?;
        config.validate()?;

        let queue = JobQueue::with_clock(config.queue.clone(), self.clock);
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Courier {
            config,
            queue,
            shutdown_tx,
        })
    }
}

impl Default for CourierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
