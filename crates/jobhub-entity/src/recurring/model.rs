//! Recurring job definition model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring job definition: a job template plus a cron schedule.
///
/// The `id` is the idempotency key: storing a definition under an existing
/// id replaces the schedule and template in place. The processor's recurring
/// loop advances `last_execution` and `next_execution` on each fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringJob {
    /// Caller-chosen identifier (up to 200 bytes).
    pub id: String,
    /// Five-field cron expression controlling when instances materialize.
    pub cron_expression: String,
    /// Job type stamped onto materialized instances.
    pub job_type: String,
    /// Payload template stamped onto materialized instances.
    pub payload: Option<String>,
    /// Retry budget stamped onto materialized instances.
    pub max_retry_count: u32,
    /// Next instant the schedule is expected to fire.
    pub next_execution: Option<DateTime<Utc>>,
    /// Last instant the recurring loop materialized an instance.
    pub last_execution: Option<DateTime<Utc>>,
    /// Disabled definitions are preserved but never materialize.
    pub enabled: bool,
    /// When the definition was registered.
    pub created_at: DateTime<Utc>,
}
