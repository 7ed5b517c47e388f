//! Shard model shared by the graph and the scheduler.

use std::sync::Arc;

use mapflow_common::{Result, ResultId};
use serde::{Deserialize, Serialize};

use crate::scheduler::SchedulerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Shard lifecycle states tracked by the scheduler.
///
/// Legal transitions: `Pending -> Running -> {Completed, Error}`. There is
/// no transition out of a terminal state.
pub enum ShardStatus {
    /// Shard is waiting for admission.
    Pending,
    /// Shard is currently executing on a pool thread.
    Running,
    /// Shard completed successfully.
    Completed,
    /// Shard execution failed.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Address of the node holding a shard's result payload.
pub struct HostRef {
    /// Node IP address or hostname.
    pub ip: String,
    /// Node HTTP port.
    pub port: u16,
}

impl HostRef {
    /// `ip:port` rendering used in result URLs.
    pub fn ip_and_port(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Descriptor of a remotely stored artifact produced by a completed shard.
pub struct ShardResult {
    /// Content-addressed identifier of the artifact.
    pub result_id: ResultId,
    /// Node holding the artifact payload.
    pub host: HostRef,
}

/// Executable body of a shard.
///
/// The scheduler treats the task as opaque: when invoked it either returns
/// an optional result descriptor or fails, and the failure message is
/// recorded verbatim in the job's error list. A successful task may return
/// `None`, meaning "no artifact to fetch".
pub trait ShardTask: Send + Sync {
    /// Run the shard. `scheduler` lets the task forward key/value outputs
    /// back to the job while it executes.
    fn execute(&self, shard: &Shard, scheduler: &SchedulerHandle) -> Result<Option<ShardResult>>;
}

#[derive(Clone)]
/// One unit of MapReduce work plus its dependency edges.
pub struct Shard {
    /// Indices of shards that must complete before this one may start.
    pub dependencies: Vec<usize>,
    /// Executable task body.
    pub task: Arc<dyn ShardTask>,
}

impl Shard {
    /// Build a shard from its dependency edges and task body.
    pub fn new(dependencies: Vec<usize>, task: Arc<dyn ShardTask>) -> Self {
        Self { dependencies, task }
    }
}
