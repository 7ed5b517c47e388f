//! Mutable per-shard bookkeeping owned by the scheduler's mutex.

use crate::shard::{ShardResult, ShardStatus};

/// Plain shard-state data; every field is read and written only while the
/// scheduler's mutex is held.
///
/// Invariants maintained by the scheduler:
/// - `results[i]` is written at most once, during the transition of shard
///   `i` into a terminal state;
/// - `num_running` / `num_completed` always equal the number of shards in
///   `Running` / terminal states;
/// - `error` is monotonic and `errors` grows in completion order.
pub(crate) struct ShardStateTable {
    pub(crate) statuses: Vec<ShardStatus>,
    pub(crate) results: Vec<Option<ShardResult>>,
    pub(crate) errors: Vec<String>,
    pub(crate) num_running: usize,
    pub(crate) num_completed: usize,
    pub(crate) error: bool,
    pub(crate) done: bool,
}

impl ShardStateTable {
    pub(crate) fn new(num_shards: usize) -> Self {
        Self {
            statuses: vec![ShardStatus::Pending; num_shards],
            results: vec![None; num_shards],
            errors: Vec::new(),
            num_running: 0,
            num_completed: 0,
            error: false,
            // An empty graph has nothing left to complete.
            done: num_shards == 0,
        }
    }
}
