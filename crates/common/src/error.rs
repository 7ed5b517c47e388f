use thiserror::Error;

/// Canonical mapflow error taxonomy used across crates.
///
/// Classification guidance:
/// - [`MapFlowError::Configuration`]: shard-graph/config contract violations caught at construction
/// - [`MapFlowError::JobFailed`]: one or more shards terminated in error during a run
/// - [`MapFlowError::Task`]: failure raised inside a shard task body, recorded per shard
/// - [`MapFlowError::Index`]: result lookups against out-of-range or non-completed shards
/// - [`MapFlowError::Download`]: result fetches that returned a non-200 status or failed in transit
/// - [`MapFlowError::Infrastructure`]: worker-pool submission failures (queue closed, pool shut down)
/// - [`MapFlowError::Io`]: raw filesystem IO failures from std APIs
#[derive(Debug, Error)]
pub enum MapFlowError {
    /// Invalid scheduler or shard-graph configuration.
    ///
    /// Examples:
    /// - cyclic shard dependency graph
    /// - dependency index outside `[0, N)`
    /// - `max_concurrent_shards == 0`
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The job terminated with at least one failed shard.
    ///
    /// Payload: the failed shards' error messages joined in completion
    /// order, comma-separated.
    #[error("mapreduce execution failed: {0}")]
    JobFailed(String),

    /// Failure raised by a shard task body.
    ///
    /// The display is the bare message: it is recorded verbatim in the
    /// scheduler's per-job error list and surfaced through
    /// [`MapFlowError::JobFailed`].
    #[error("{0}")]
    Task(String),

    /// Result lookup against an invalid shard index.
    ///
    /// Examples:
    /// - index outside `[0, N)`
    /// - shard has not reached `Completed`
    #[error("index error: {0}")]
    Index(String),

    /// Result download failed.
    ///
    /// Examples:
    /// - remote node answered with a non-200 status
    /// - the HTTP request itself failed in transit
    #[error("result download failed: {0}")]
    Download(String),

    /// The worker-pool infrastructure rejected a submission.
    #[error("worker pool failure: {0}")]
    Infrastructure(String),

    /// Transparent std IO failures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Standard mapflow result alias.
pub type Result<T> = std::result::Result<T, MapFlowError>;
