//! Job-facing collaborator contracts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Aggregate progress snapshot emitted once per scheduler loop iteration.
///
/// Snapshots coalesce bursts of completions; consumers see `completed` and
/// `running` move monotonically towards the final `{total, 0}` state.
pub struct JobProgress {
    /// Total number of shards in the job.
    pub total: usize,
    /// Shards in a terminal state (completed or failed).
    pub completed: usize,
    /// Shards currently executing.
    pub running: usize,
}

/// Job specification the scheduler reports into.
///
/// `update_progress` is serialised by the scheduler's own lock and needs no
/// internal synchronisation against itself; `send_result` may be called
/// concurrently from worker threads.
pub trait JobSpec: Send + Sync {
    /// Stable job identifier used in log fields and metrics labels.
    fn job_id(&self) -> &str;

    /// Receive one progress snapshot.
    fn update_progress(&self, progress: &JobProgress);

    /// Receive one key/value output produced by a shard task.
    fn send_result(&self, key: &str, value: &str);
}
