//! Shard scheduler control loop.
//!
//! Responsibilities:
//! - admit ready shards onto the worker pool, index-ordered, capped at
//!   `max_concurrent_shards`;
//! - record each shard's terminal status and result slot exactly once;
//! - aggregate progress snapshots into the job specification;
//! - answer post-run result-location and download queries over the state
//!   table.
//!
//! Failure semantics:
//! - the first shard error marks the job failed but does not cancel
//!   anything: in-flight shards drain, and independent branches that are
//!   still ready keep getting admitted;
//! - `run` reports `JobFailed` only once nothing is running and nothing is
//!   admissible, so every started shard has a recorded terminal status;
//! - shards depending on a failed shard never become ready and stay
//!   `Pending`.

use std::path::PathBuf;
use std::sync::Arc;

use mapflow_common::{MapFlowError, Result, global_metrics};
use mapflow_pool::WorkerPool;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::auth::{AuthProvider, Session};
use crate::config::SchedulerConfig;
use crate::graph::ShardGraph;
use crate::job::{JobProgress, JobSpec};
use crate::results;
use crate::shard::{ShardResult, ShardStatus};
use crate::state::ShardStateTable;

#[derive(Clone)]
/// Non-owning capability handed to shard tasks.
///
/// Lets a task forward key/value outputs to the job mid-execution without
/// taking ownership of the scheduler; the `run` frame is guaranteed to
/// outlive every dispatched task.
pub struct SchedulerHandle {
    job: Arc<dyn JobSpec>,
}

impl SchedulerHandle {
    /// Forward one key/value output to the job. Thread-safe.
    pub fn send_result(&self, key: &str, value: &str) {
        self.job.send_result(key, value);
    }
}

struct SchedulerShared {
    job: Arc<dyn JobSpec>,
    graph: Arc<ShardGraph>,
    pool: Arc<dyn WorkerPool>,
    state: Mutex<ShardStateTable>,
    shard_done: Condvar,
}

/// Drives one MapReduce job's shard DAG to completion over a worker pool.
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
    session: Session,
    auth: Arc<dyn AuthProvider>,
    cachedir: PathBuf,
    config: SchedulerConfig,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("session", &self.session)
            .field("cachedir", &self.cachedir)
            .field("config", &self.config)
            .finish()
    }
}

impl Scheduler {
    /// Construct a scheduler for one job.
    ///
    /// Fails with a configuration error if `max_concurrent_shards` is zero.
    pub fn new(
        session: Session,
        job: Arc<dyn JobSpec>,
        graph: ShardGraph,
        pool: Arc<dyn WorkerPool>,
        auth: Arc<dyn AuthProvider>,
        cachedir: impl Into<PathBuf>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        if config.max_concurrent_shards == 0 {
            return Err(MapFlowError::Configuration(
                "max_concurrent_shards must be at least 1".to_string(),
            ));
        }

        let num_shards = graph.len();
        Ok(Self {
            shared: Arc::new(SchedulerShared {
                job,
                graph: Arc::new(graph),
                pool,
                state: Mutex::new(ShardStateTable::new(num_shards)),
                shard_done: Condvar::new(),
            }),
            session,
            auth,
            cachedir: cachedir.into(),
            config,
        })
    }

    /// Block until every shard reached a terminal state or the job failed.
    ///
    /// Each loop iteration emits one progress snapshot before any
    /// termination check, so the job always observes the final counts.
    pub fn run(&self) -> Result<()> {
        let shared = &self.shared;
        let total = shared.graph.len();
        let mut state = shared.state.lock();

        loop {
            debug!(
                job_id = %shared.job.job_id(),
                completed = state.num_completed,
                total,
                running = state.num_running,
                "running job"
            );
            self.publish_progress(&state, total);

            if state.done {
                if state.error {
                    return Err(job_failed(&state));
                }
                info!(
                    job_id = %shared.job.job_id(),
                    shards = total,
                    "job completed"
                );
                return Ok(());
            }

            if self.start_shards(&mut state)? > 0 {
                continue;
            }

            // Nothing admissible and nothing running: the remaining pending
            // shards sit behind a failed dependency, and no future signal
            // will arrive.
            if state.num_running == 0 {
                return Err(job_failed(&state));
            }

            shared.shard_done.wait(&mut state);
        }
    }

    /// Forward one key/value output to the job. Thread-safe; callable from
    /// within a task via [`SchedulerHandle`] or directly by the caller.
    pub fn send_result(&self, key: &str, value: &str) {
        self.shared.job.send_result(key, value);
    }

    /// Current status of shard `index`.
    ///
    /// Intended for post-`run` inspection, including partial results of a
    /// failed job. Fails with an index error if `index` is out of range.
    pub fn shard_status(&self, index: usize) -> Result<ShardStatus> {
        let state = self.shared.state.lock();
        if index >= self.shared.graph.len() {
            return Err(invalid_index(index));
        }
        Ok(state.statuses[index])
    }

    /// Result descriptor recorded for terminal shard `index`, if any.
    ///
    /// Fails with an index error if `index` is out of range or the shard
    /// has not reached a terminal state.
    pub fn shard_result(&self, index: usize) -> Result<Option<ShardResult>> {
        let state = self.shared.state.lock();
        if index >= self.shared.graph.len() {
            return Err(invalid_index(index));
        }
        match state.statuses[index] {
            ShardStatus::Completed | ShardStatus::Error => Ok(state.results[index].clone()),
            _ => Err(MapFlowError::Index(format!(
                "task is not finished: {index}"
            ))),
        }
    }

    /// URL of the artifact produced by completed shard `index`.
    ///
    /// Returns `None` if the shard completed without producing a result.
    /// Fails with an index error if `index` is out of range or the shard is
    /// not `Completed`.
    pub fn result_url(&self, index: usize) -> Result<Option<String>> {
        Ok(self
            .completed_result(index)?
            .map(|result| results::result_url(&result)))
    }

    /// Fetch the artifact of completed shard `index` into the cache
    /// directory and return the local path.
    ///
    /// The path is deterministic from the result id. Returns `None` if the
    /// shard completed without producing a result. Fails with an index
    /// error under the same conditions as [`Self::result_url`], or with a
    /// download error if the fetch does not answer HTTP 200.
    pub fn download_result(&self, index: usize) -> Result<Option<PathBuf>> {
        let Some(result) = self.completed_result(index)? else {
            return Ok(None);
        };

        let url = results::result_url(&result);
        let path = results::cache_path(&self.cachedir, &result.result_id);
        let api_token = self.auth.encode_auth_token(&self.session)?;
        results::download_to_cache(&url, &api_token, &path, self.config.download_timeout_ms)?;

        global_metrics().inc_result_downloads(self.shared.job.job_id());
        debug!(
            job_id = %self.shared.job.job_id(),
            shard = index,
            path = %path.display(),
            "result downloaded"
        );
        Ok(Some(path))
    }

    fn completed_result(&self, index: usize) -> Result<Option<ShardResult>> {
        let state = self.shared.state.lock();
        if index >= self.shared.graph.len() {
            return Err(invalid_index(index));
        }
        if state.statuses[index] != ShardStatus::Completed {
            return Err(MapFlowError::Index(format!(
                "task is not completed: {index}"
            )));
        }
        Ok(state.results[index].clone())
    }

    fn publish_progress(&self, state: &ShardStateTable, total: usize) {
        let progress = JobProgress {
            total,
            completed: state.num_completed,
            running: state.num_running,
        };
        self.shared.job.update_progress(&progress);

        let pending = total - state.num_completed - state.num_running;
        global_metrics().set_job_shards(
            self.shared.job.job_id(),
            pending as u64,
            state.num_running as u64,
            state.num_completed as u64,
            state.errors.len() as u64,
        );
    }

    /// Index-ordered admission scan. Dispatches every ready shard up to the
    /// concurrency cap and returns how many were started.
    fn start_shards(&self, state: &mut ShardStateTable) -> Result<usize> {
        let total = self.shared.graph.len();
        if state.num_running >= self.config.max_concurrent_shards {
            return Ok(0);
        }
        if state.num_completed + state.num_running >= total {
            return Ok(0);
        }

        let mut num_started = 0;
        for i in 0..total {
            if state.statuses[i] != ShardStatus::Pending {
                continue;
            }

            let ready = self
                .shared
                .graph
                .dependencies_of(i)
                .iter()
                .all(|&dep| state.statuses[dep] == ShardStatus::Completed);
            if !ready {
                continue;
            }

            state.statuses[i] = ShardStatus::Running;
            state.num_running += 1;
            num_started += 1;
            debug!(job_id = %self.shared.job.job_id(), shard = i, "shard admitted");

            let shared = Arc::clone(&self.shared);
            self.shared
                .pool
                .submit(Box::new(move || run_shard(shared, i)))?;

            if state.num_running >= self.config.max_concurrent_shards {
                break;
            }
        }

        Ok(num_started)
    }
}

/// Dispatched unit: executes the task outside the lock, then performs the
/// completion protocol in one critical section and signals the main loop.
fn run_shard(shared: Arc<SchedulerShared>, index: usize) {
    let shard = shared.graph.shard(index);
    let handle = SchedulerHandle {
        job: Arc::clone(&shared.job),
    };

    let (result, failure) = match shard.task.execute(shard, &handle) {
        Ok(result) => (result, None),
        Err(e) => {
            error!(
                job_id = %shared.job.job_id(),
                shard = index,
                error = %e,
                "shard task failed"
            );
            global_metrics().inc_shard_failures(shared.job.job_id());
            (None, Some(e.to_string()))
        }
    };

    {
        let mut state = shared.state.lock();

        state.results[index] = result;
        state.statuses[index] = if failure.is_some() {
            ShardStatus::Error
        } else {
            ShardStatus::Completed
        };

        state.num_running -= 1;
        state.num_completed += 1;
        if state.num_completed == shared.graph.len() {
            state.done = true;
        }

        if let Some(message) = failure {
            state.error = true;
            state.errors.push(message);
        }
    }
    shared.shard_done.notify_all();
}

fn job_failed(state: &ShardStateTable) -> MapFlowError {
    MapFlowError::JobFailed(state.errors.join(", "))
}

fn invalid_index(index: usize) -> MapFlowError {
    MapFlowError::Index(format!("invalid task index: {index}"))
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
