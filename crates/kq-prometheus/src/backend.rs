use kq_core::{CycleOutcome, MetricsBackend};
use kq_model::{ExecMode, TaskResult};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

/// Task duration buckets in seconds.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0];

/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    cycles: IntCounterVec,
    tasks: IntCounterVec,
    duration: Histogram,
    reward: Gauge,
}

impl PrometheusMetrics {
    /// Backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Backend registering into `registry`.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let cycles = IntCounterVec::new(
            Opts::new("kq_cycles_total", "Orchestrator cycles by mode and outcome"),
            &["mode", "outcome"],
        )?;
        let tasks = IntCounterVec::new(
            Opts::new("kq_tasks_completed_total", "Task results by status and error kind"),
            &["status", "error_kind"],
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("kq_task_duration_seconds", "Task wall time in seconds")
                .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let reward = Gauge::new("kq_policy_reward", "Reward of the last completed cycle")?;

        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(tasks.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(reward.clone()))?;

        Ok(Self {
            registry,
            cycles,
            tasks,
            duration,
            reward,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_task(&self, result: &TaskResult) {
        let error_kind = result.error_kind.map(|k| k.as_str()).unwrap_or("none");
        self.tasks
            .with_label_values(&[result.status.as_str(), error_kind])
            .inc();
        self.duration.observe(result.runtime_seconds);
    }

    fn record_cycle(&self, mode: ExecMode, outcome: CycleOutcome) {
        self.cycles
            .with_label_values(&[mode.as_str(), outcome.as_str()])
            .inc();
    }

    fn record_reward(&self, reward: f64) {
        self.reward.set(reward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kq_model::ErrorKind;

    #[test]
    fn records_tasks_cycles_and_reward() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_task(&TaskResult::ok("a", 0.2));
        metrics.record_task(&TaskResult::fail("b", 0.1, ErrorKind::Timeout, "slow"));
        metrics.record_cycle(ExecMode::Parallel, CycleOutcome::Degraded);
        metrics.record_reward(-1.0);

        assert_eq!(
            metrics
                .tasks
                .with_label_values(&["fail", "timeout"])
                .get(),
            1
        );
        assert_eq!(metrics.tasks.with_label_values(&["ok", "none"]).get(), 1);
        assert_eq!(
            metrics
                .cycles
                .with_label_values(&["parallel", "degraded"])
                .get(),
            1
        );
        assert_eq!(metrics.duration.get_sample_count(), 2);
        assert_eq!(metrics.reward.get(), -1.0);
    }

    #[test]
    fn text_exposition_contains_metric_names() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_cycle(ExecMode::Sequential, CycleOutcome::Clean);

        let text = metrics.encode().unwrap();
        assert!(text.contains("kq_cycles_total{mode=\"sequential\",outcome=\"clean\"} 1"));
        assert!(text.contains("kq_policy_reward"));
        assert!(metrics.content_type().starts_with("text/plain"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Registry::new();
        PrometheusMetrics::with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::with_registry(registry).is_err());
    }
}
