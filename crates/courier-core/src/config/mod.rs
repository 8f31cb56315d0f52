mod observability;

pub use observability::{LoggingConfig, ObservabilityConfig};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CourierError, Result};

/// Root configuration for Courier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Queue and scheduler configuration.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl CourierConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CourierError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        let config: Self = toml::from_str(&content)
            .map_err(|e| CourierError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CourierError::Serialization(format!("Failed to render config: {}", e)))
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.queue.validate()
    }
}

/// Queue and scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Sleep between scheduler cycles, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum jobs dispatched per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts granted to every new job.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long exhausted jobs stay visible, in seconds.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    /// Batch jobs allowed to run at once. 1 means strictly sequential.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-attempt timeout in seconds. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_timeout_secs: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retention_secs: default_retention(),
            max_concurrent: default_max_concurrent(),
            job_timeout_secs: None,
        }
    }
}

impl QueueConfig {
    /// Sleep between cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Retention window for exhausted jobs.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::from_std(Duration::from_secs(self.retention_secs))
            .unwrap_or_else(|_| chrono::Duration::days(365_000))
    }

    /// Per-attempt timeout, if any.
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(CourierError::Config(
                "queue.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CourierError::Config(
                "queue.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(CourierError::Config(
                "queue.max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(CourierError::Config(
                "queue.max_concurrent must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_batch_size() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retention() -> u64 {
    24 * 60 * 60 // 24 hours
}

fn default_max_concurrent() -> usize {
    1
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return result,
    };

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
