//! End-to-end scheduler scenarios over the real thread pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mapflow_common::{MapFlowError, Result, ResultId};
use mapflow_pool::{ThreadPool, WorkerPool};
use mapflow_scheduler::{
    AuthProvider, HostRef, JobProgress, JobSpec, Scheduler, SchedulerConfig, SchedulerHandle,
    Session, Shard, ShardGraph, ShardResult, ShardStatus, ShardTask,
};

struct TestJob {
    id: String,
    snapshots: Mutex<Vec<JobProgress>>,
    results: Mutex<Vec<(String, String)>>,
}

impl TestJob {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            snapshots: Mutex::new(Vec::new()),
            results: Mutex::new(Vec::new()),
        })
    }
}

impl JobSpec for TestJob {
    fn job_id(&self) -> &str {
        &self.id
    }

    fn update_progress(&self, progress: &JobProgress) {
        self.snapshots.lock().expect("snapshots").push(*progress);
    }

    fn send_result(&self, key: &str, value: &str) {
        self.results
            .lock()
            .expect("results")
            .push((key.to_string(), value.to_string()));
    }
}

struct StaticAuth;

impl AuthProvider for StaticAuth {
    fn encode_auth_token(&self, _session: &Session) -> Result<String> {
        Ok("test-token".to_string())
    }
}

struct FnTask<F>(F);

impl<F> ShardTask for FnTask<F>
where
    F: Fn(&Shard, &SchedulerHandle) -> Result<Option<ShardResult>> + Send + Sync,
{
    fn execute(&self, shard: &Shard, scheduler: &SchedulerHandle) -> Result<Option<ShardResult>> {
        (self.0)(shard, scheduler)
    }
}

fn task(
    f: impl Fn(&Shard, &SchedulerHandle) -> Result<Option<ShardResult>> + Send + Sync + 'static,
) -> Arc<dyn ShardTask> {
    Arc::new(FnTask(f))
}

fn named_result(id: &str) -> Option<ShardResult> {
    Some(ShardResult {
        result_id: ResultId::new(id),
        host: HostRef {
            ip: "127.0.0.1".to_string(),
            port: 7777,
        },
    })
}

fn scheduler(job: Arc<TestJob>, shards: Vec<Shard>, max_concurrent: usize) -> Scheduler {
    let graph = ShardGraph::new(shards).expect("valid graph");
    let pool: Arc<dyn WorkerPool> = Arc::new(ThreadPool::new(8).expect("pool"));
    Scheduler::new(
        Session {
            customer: "acme".to_string(),
            userid: "dev".to_string(),
        },
        job,
        graph,
        pool,
        Arc::new(StaticAuth),
        std::env::temp_dir(),
        SchedulerConfig {
            max_concurrent_shards: max_concurrent,
            ..SchedulerConfig::default()
        },
    )
    .expect("scheduler")
}

#[test]
fn linear_chain_completes_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut shards = Vec::new();
    for (i, name) in ["A", "B", "C"].into_iter().enumerate() {
        let order = Arc::clone(&order);
        let dependencies = if i == 0 { Vec::new() } else { vec![i - 1] };
        shards.push(Shard::new(
            dependencies,
            task(move |_, _| {
                order.lock().expect("order").push(name);
                Ok(named_result(name))
            }),
        ));
    }

    let job = TestJob::new("job-chain");
    let s = scheduler(Arc::clone(&job), shards, 4);
    s.run().expect("chain succeeds");

    assert_eq!(*order.lock().expect("order"), vec!["A", "B", "C"]);
    assert_eq!(
        s.result_url(2).expect("url"),
        Some("http://127.0.0.1:7777/api/v1/mapreduce/result/C".to_string())
    );

    let snapshots = job.snapshots.lock().expect("snapshots");
    assert!(snapshots.len() >= 3);
    assert_eq!(snapshots[0].completed, 0);
    for pair in snapshots.windows(2) {
        assert!(pair[1].completed >= pair[0].completed);
    }
    assert_eq!(
        *snapshots.last().expect("snapshots"),
        JobProgress {
            total: 3,
            completed: 3,
            running: 0
        }
    );
}

#[test]
fn parallel_fan_out_respects_concurrency_cap() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut shards = Vec::new();
    for _ in 0..10 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        shards.push(Shard::new(
            vec![],
            task(move |_, _| {
                let current = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(None)
            }),
        ));
    }

    let job = TestJob::new("job-fanout");
    let s = scheduler(Arc::clone(&job), shards, 3);
    s.run().expect("fan-out succeeds");

    assert!(peak.load(Ordering::SeqCst) <= 3);
    for i in 0..10 {
        assert_eq!(s.shard_status(i).expect("status"), ShardStatus::Completed);
    }
    assert_eq!(
        *job.snapshots
            .lock()
            .expect("snapshots")
            .last()
            .expect("snapshots"),
        JobProgress {
            total: 10,
            completed: 10,
            running: 0
        }
    );
}

#[test]
fn dependent_shard_waits_for_all_dependencies() {
    let a_done = Arc::new(AtomicBool::new(false));
    let b_done = Arc::new(AtomicBool::new(false));
    let gate_held = Arc::new(AtomicBool::new(false));

    let a_flag = Arc::clone(&a_done);
    let b_flag = Arc::clone(&b_done);
    let a_seen = Arc::clone(&a_done);
    let b_seen = Arc::clone(&b_done);
    let gate = Arc::clone(&gate_held);

    let shards = vec![
        Shard::new(
            vec![],
            task(move |_, _| {
                thread::sleep(Duration::from_millis(80));
                a_flag.store(true, Ordering::SeqCst);
                Ok(None)
            }),
        ),
        Shard::new(
            vec![],
            task(move |_, _| {
                thread::sleep(Duration::from_millis(10));
                b_flag.store(true, Ordering::SeqCst);
                Ok(None)
            }),
        ),
        Shard::new(
            vec![0, 1],
            task(move |_, _| {
                gate.store(
                    a_seen.load(Ordering::SeqCst) && b_seen.load(Ordering::SeqCst),
                    Ordering::SeqCst,
                );
                Ok(None)
            }),
        ),
    ];

    let s = scheduler(TestJob::new("job-gate"), shards, 4);
    s.run().expect("gated job succeeds");
    assert!(gate_held.load(Ordering::SeqCst));
}

#[test]
fn independent_branches_finish_despite_failure() {
    let shards = vec![
        Shard::new(vec![], task(|_, _| Ok(None))),
        Shard::new(
            vec![],
            task(|_, _| Err(MapFlowError::Task("boom".to_string()))),
        ),
        Shard::new(vec![], task(|_, _| Ok(None))),
    ];

    let s = scheduler(TestJob::new("job-branch"), shards, 4);
    let err = s.run().expect_err("job fails");
    match err {
        MapFlowError::JobFailed(msg) => assert_eq!(msg, "boom"),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(s.shard_status(0).expect("status"), ShardStatus::Completed);
    assert_eq!(s.shard_status(1).expect("status"), ShardStatus::Error);
    assert_eq!(s.shard_status(2).expect("status"), ShardStatus::Completed);
}

#[test]
fn failed_dependency_keeps_dependent_pending() {
    let shards = vec![
        Shard::new(
            vec![],
            task(|_, _| Err(MapFlowError::Task("upstream boom".to_string()))),
        ),
        Shard::new(vec![0], task(|_, _| Ok(None))),
    ];

    let s = scheduler(TestJob::new("job-cascade"), shards, 4);
    let err = s.run().expect_err("job fails");
    match err {
        MapFlowError::JobFailed(msg) => assert_eq!(msg, "upstream boom"),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(s.shard_status(0).expect("status"), ShardStatus::Error);
    assert_eq!(s.shard_status(1).expect("status"), ShardStatus::Pending);
}

#[test]
fn completed_shard_without_result_yields_none() {
    let s = scheduler(
        TestJob::new("job-noresult"),
        vec![Shard::new(vec![], task(|_, _| Ok(None)))],
        2,
    );
    s.run().expect("job succeeds");

    assert_eq!(s.shard_status(0).expect("status"), ShardStatus::Completed);
    assert_eq!(s.result_url(0).expect("url"), None);
    assert_eq!(s.download_result(0).expect("download"), None);
}
