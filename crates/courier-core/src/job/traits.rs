use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CourierError, HandlerError};

/// Trait for typed Courier jobs.
///
/// Implementors describe their routing name and defaults in [`JobInfo`] and
/// receive their payload already deserialized into `Args`.
pub trait CourierJob: Send + Sync + 'static {
    /// Payload type.
    type Args: DeserializeOwned + Serialize + Send + Sync;

    /// Get job metadata.
    fn info() -> JobInfo;

    /// Execute the job.
    fn execute(args: Self::Args) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;
}

/// Job metadata.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job name (used for routing).
    pub name: &'static str,
    /// Default priority for jobs dispatched through the typed API.
    pub priority: JobPriority,
    /// Per-attempt timeout, overriding the queue-wide setting.
    pub timeout: Option<Duration>,
}

impl Default for JobInfo {
    fn default() -> Self {
        Self {
            name: "",
            priority: JobPriority::Medium,
            timeout: None,
        }
    }
}

/// Job priority levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl JobPriority {
    /// Get the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPriority {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CourierError::InvalidArgument(format!(
                "unknown priority '{}'",
                other
            ))),
        }
    }
}
