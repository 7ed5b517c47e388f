//! Shard dependency-graph construction and validation.
//!
//! Contract:
//! - shards are identified by their zero-based position in the input
//!   sequence; the sequence is frozen at construction;
//! - every dependency index must lie in `[0, N)` (forward references are
//!   allowed, the graph need not be index-ordered);
//! - the dependency relation must be acyclic.

use mapflow_common::{MapFlowError, Result};

use crate::shard::Shard;

/// Immutable, validated DAG of shards.
pub struct ShardGraph {
    shards: Vec<Shard>,
}

impl std::fmt::Debug for ShardGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardGraph")
            .field("shard_count", &self.shards.len())
            .finish()
    }
}

impl ShardGraph {
    /// Validate dependency ranges and acyclicity, then freeze the sequence.
    pub fn new(shards: Vec<Shard>) -> Result<Self> {
        for (i, shard) in shards.iter().enumerate() {
            for &dep in &shard.dependencies {
                if dep >= shards.len() {
                    return Err(MapFlowError::Configuration(format!(
                        "shard {i} depends on out-of-range shard {dep}"
                    )));
                }
            }
        }
        check_acyclic(&shards)?;
        Ok(Self { shards })
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Whether the graph holds no shards.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Borrow shard `index`. Panics on out-of-range indices; scheduler
    /// indices are valid by construction.
    pub fn shard(&self, index: usize) -> &Shard {
        &self.shards[index]
    }

    /// Dependency indices of shard `index`. Panics like [`Self::shard`].
    pub fn dependencies_of(&self, index: usize) -> &[usize] {
        &self.shards[index].dependencies
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

// Iterative three-color DFS; recursion would overflow on deep chains.
fn check_acyclic(shards: &[Shard]) -> Result<()> {
    let mut marks = vec![Mark::Unvisited; shards.len()];

    for root in 0..shards.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, pos) = *frame;
            if pos < shards[node].dependencies.len() {
                frame.1 += 1;
                let dep = shards[node].dependencies[pos];
                match marks[dep] {
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                    Mark::InProgress => {
                        return Err(MapFlowError::Configuration(format!(
                            "shard dependency cycle through shard {dep}"
                        )));
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    Ok(())
}
