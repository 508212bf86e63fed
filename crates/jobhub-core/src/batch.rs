//! Batch completion evaluation.
//!
//! Both the processor (when it writes a member's terminal state) and the
//! client (when it cancels a member that was never dispatched) can produce
//! the batch's last terminal write, so the release step lives here and is
//! shared by both.

use chrono::Utc;

use jobhub_entity::job::{Job, JobState};

use crate::result::AppResult;
use crate::traits::storage::JobStorage;

/// A batch is complete when every regular member has terminated. Members
/// still in `awaiting_batch` are the batch continuations themselves and do
/// not count.
pub fn batch_complete(members: &[Job]) -> bool {
    members
        .iter()
        .filter(|job| job.state != JobState::AwaitingBatch)
        .all(|job| job.state.is_terminal())
}

/// Release the batch continuations once every regular member has
/// terminated. Returns the ids of the continuations that were released,
/// empty when the batch is still in flight.
pub async fn release_completed_batch(
    storage: &dyn JobStorage,
    batch_id: &str,
) -> AppResult<Vec<String>> {
    let members = storage.get_batch_jobs(batch_id).await?;
    if !batch_complete(&members) {
        return Ok(Vec::new());
    }

    let now = Utc::now();
    let mut released = Vec::new();
    for member in members {
        if member.state != JobState::AwaitingBatch {
            continue;
        }
        // Two writers finishing concurrently can both reach this point;
        // re-fetch so an already-released continuation is not written twice.
        let Some(current) = storage.get_job(&member.id).await? else {
            continue;
        };
        if current.state != JobState::AwaitingBatch {
            continue;
        }

        let mut releasing = current;
        releasing.state = JobState::Scheduled;
        releasing.scheduled_at = Some(now);
        storage.update_job(&releasing).await?;
        released.push(releasing.id);
    }

    Ok(released)
}
