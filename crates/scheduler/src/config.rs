//! Scheduler configuration knobs.

use serde::{Deserialize, Serialize};

/// Default cap on simultaneously running shards.
pub const DEFAULT_MAX_CONCURRENT_SHARDS: usize = 32;

fn default_max_concurrent_shards() -> usize {
    DEFAULT_MAX_CONCURRENT_SHARDS
}

fn default_download_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Scheduler behavior/configuration knobs.
pub struct SchedulerConfig {
    /// Max shards allowed to run at once. Must be at least 1.
    #[serde(default = "default_max_concurrent_shards")]
    pub max_concurrent_shards: usize,
    /// Result download timeout in milliseconds.
    ///
    /// `0` disables the timeout.
    #[serde(default = "default_download_timeout_ms")]
    pub download_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_shards: default_max_concurrent_shards(),
            download_timeout_ms: default_download_timeout_ms(),
        }
    }
}
