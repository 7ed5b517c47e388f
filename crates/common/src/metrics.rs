use std::sync::{Arc, OnceLock};

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// Process-wide metrics registry for scheduler observability.
///
/// All series are labelled by job id so concurrent jobs sharing one process
/// stay distinguishable.
#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    job_shards_pending: GaugeVec,
    job_shards_running: GaugeVec,
    job_shards_completed: GaugeVec,
    job_shards_failed: GaugeVec,
    shard_failures: CounterVec,
    result_downloads: CounterVec,
}

impl MetricsRegistry {
    /// Create an empty registry with all metric families registered.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    /// Update the per-job shard-state gauges from one progress snapshot.
    pub fn set_job_shards(
        &self,
        job_id: &str,
        pending: u64,
        running: u64,
        completed: u64,
        failed: u64,
    ) {
        let labels = [job_id];
        self.inner
            .job_shards_pending
            .with_label_values(&labels)
            .set(pending as f64);
        self.inner
            .job_shards_running
            .with_label_values(&labels)
            .set(running as f64);
        self.inner
            .job_shards_completed
            .with_label_values(&labels)
            .set(completed as f64);
        self.inner
            .job_shards_failed
            .with_label_values(&labels)
            .set(failed as f64);
    }

    /// Count one shard task failure for a job.
    pub fn inc_shard_failures(&self, job_id: &str) {
        self.inner
            .shard_failures
            .with_label_values(&[job_id])
            .inc();
    }

    /// Count one completed result download for a job.
    pub fn inc_result_downloads(&self, job_id: &str) {
        self.inner
            .result_downloads
            .with_label_values(&[job_id])
            .inc();
    }

    /// Render all registered families in the Prometheus text format.
    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let job_shards_pending = gauge_vec(
            &registry,
            "mapflow_job_shards_pending",
            "Shards not yet admitted",
            &["job_id"],
        );
        let job_shards_running = gauge_vec(
            &registry,
            "mapflow_job_shards_running",
            "Shards currently executing",
            &["job_id"],
        );
        let job_shards_completed = gauge_vec(
            &registry,
            "mapflow_job_shards_completed",
            "Shards in a terminal state",
            &["job_id"],
        );
        let job_shards_failed = gauge_vec(
            &registry,
            "mapflow_job_shards_failed",
            "Shards that terminated in error",
            &["job_id"],
        );
        let shard_failures = counter_vec(
            &registry,
            "mapflow_shard_failures_total",
            "Shard task failures",
            &["job_id"],
        );
        let result_downloads = counter_vec(
            &registry,
            "mapflow_result_downloads_total",
            "Completed result downloads",
            &["job_id"],
        );

        Self {
            registry,
            job_shards_pending,
            job_shards_running,
            job_shards_completed,
            job_shards_failed,
            shard_failures,
            result_downloads,
        }
    }
}

fn counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let c = CounterVec::new(Opts::new(name, help), labels).expect("counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    let g = GaugeVec::new(Opts::new(name, help), labels).expect("gauge vec");
    registry
        .register(Box::new(g.clone()))
        .expect("register gauge");
    g
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

/// Shared process-wide registry used by the scheduler control loop.
pub fn global_metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}
