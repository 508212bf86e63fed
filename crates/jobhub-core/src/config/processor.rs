//! Job processor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Job processor configuration.
///
/// Intervals are configured in milliseconds so embedded test hosts can run
/// the loops at sub-second cadence; the accessor methods expose them as
/// [`Duration`] values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum number of jobs processed concurrently (worker-pool capacity).
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Interval in milliseconds between scheduled-job polls.
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Interval in milliseconds between recurring-definition polls.
    #[serde(default = "default_recurring_polling_interval_ms")]
    pub recurring_polling_interval_ms: u64,
    /// Maximum number of jobs fetched from storage per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retry delay in milliseconds applied when a failure outcome does not
    /// specify its own delay.
    #[serde(default = "default_retry_delay_ms")]
    pub default_retry_delay_ms: u64,
    /// Maximum time in milliseconds to wait for in-flight workers on stop.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl ProcessorConfig {
    /// Cadence of the scheduled-jobs loop.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Cadence of the recurring-jobs loop.
    pub fn recurring_polling_interval(&self) -> Duration {
        Duration::from_millis(self.recurring_polling_interval_ms)
    }

    /// Fallback retry delay for failure outcomes without an explicit delay.
    pub fn default_retry_delay(&self) -> Duration {
        Duration::from_millis(self.default_retry_delay_ms)
    }

    /// Grace period for in-flight workers during shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            polling_interval_ms: default_polling_interval_ms(),
            recurring_polling_interval_ms: default_recurring_polling_interval_ms(),
            batch_size: default_batch_size(),
            default_retry_delay_ms: default_retry_delay_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

fn default_max_concurrent_jobs() -> usize {
    10
}

fn default_polling_interval_ms() -> u64 {
    5_000
}

fn default_recurring_polling_interval_ms() -> u64 {
    60_000
}

fn default_batch_size() -> usize {
    100
}

fn default_retry_delay_ms() -> u64 {
    30_000
}

fn default_shutdown_timeout_ms() -> u64 {
    30_000
}
