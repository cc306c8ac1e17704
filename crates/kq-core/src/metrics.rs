use kq_model::{ExecMode, TaskResult};

/// How a cycle ended, as seen by metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every task succeeded.
    Clean,
    /// At least one task failed.
    Degraded,
    /// The admission peer deferred the cycle; nothing ran.
    Deferred,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Clean => "clean",
            CycleOutcome::Degraded => "degraded",
            CycleOutcome::Deferred => "deferred",
        }
    }
}

/// Metrics backend abstraction; `kq-prometheus` provides the Prometheus implementation.
pub trait MetricsBackend: Send + Sync {
    fn record_task(&self, result: &TaskResult);

    fn record_cycle(&self, mode: ExecMode, outcome: CycleOutcome);

    fn record_reward(&self, reward: f64);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {
    fn record_task(&self, _result: &TaskResult) {}

    fn record_cycle(&self, _mode: ExecMode, _outcome: CycleOutcome) {}

    fn record_reward(&self, _reward: f64) {}
}
