use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use kq_bus::{Payload, Publisher};
use kq_core::{Orchestrator, OrchestratorError};
use kq_model::CycleReport;
use serde_json::Value;
use taskvisor::{TaskError, TaskFn, TaskRef, TaskSpec};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::CycleSection;

pub const CYCLE_STARTED: &str = "cycle.started";

const SLOT: &str = "kq-cycle";

/// One orchestrator cycle per supervised run.
pub struct CycleJob {
    orchestrator: Mutex<Orchestrator>,
    publisher: Arc<dyn Publisher>,
    cfg: CycleSection,
    cycles: AtomicU64,
}

impl CycleJob {
    pub fn new(
        orchestrator: Orchestrator,
        publisher: Arc<dyn Publisher>,
        cfg: CycleSection,
    ) -> Self {
        Self {
            orchestrator: Mutex::new(orchestrator),
            publisher,
            cfg,
            cycles: AtomicU64::new(0),
        }
    }

    /// Cycles started so far, failed ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Publish `cycle.started` with the cycle number, then run the cycle.
    pub async fn run_once(&self) -> Result<CycleReport, OrchestratorError> {
        let mut orchestrator = self.orchestrator.lock().await;
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let mut signal = Payload::new();
        signal.insert("cycle".into(), Value::from(cycle));
        signal.insert("mode".into(), Value::from(self.cfg.mode.as_str()));
        if let Err(e) = self.publisher.publish(CYCLE_STARTED, signal).await {
            warn!(cycle, error = %e, "failed to publish cycle signal");
        }

        let report = orchestrator.run(self.cfg.mode).await?;
        info!(
            cycle,
            mode = %report.mode,
            error_count = report.summary.error_count,
            "cycle completed"
        );
        Ok(report)
    }

    /// Cancellation is honoured before a cycle starts; a cycle in flight runs to the end
    /// so its report is persisted.
    pub fn into_task(self: Arc<Self>) -> TaskRef {
        let task: TaskRef = TaskFn::arc(SLOT, move |ctx: CancellationToken| {
            let job = Arc::clone(&self);

            async move {
                if ctx.is_cancelled() {
                    return Err(TaskError::Canceled);
                }
                job.run_once().await.map(|_| ()).map_err(|e| {
                    error!(cycle = job.cycles(), error = %e, "cycle failed");
                    TaskError::Fail {
                        reason: format!("cycle failed: {e}"),
                    }
                })
            }
        });
        task
    }

    /// First cycle immediately, then one every `interval_ms` after the previous ends.
    pub fn into_spec(self) -> TaskSpec {
        let every = self.cfg.interval();
        kq_scheduler::periodic(Arc::new(self).into_task(), every, None)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use kq_bus::{MemoryBus, Subscriber, Subscription};
    use kq_core::{ExecutorError, OrchestratorConfig, Task, TaskDiscovery};
    use kq_model::ExecMode;
    use kq_policy::{Policy, QTableConfig, QTablePolicy};
    use taskvisor::Task as _;

    /// Always asks for the parallel pool.
    struct AlwaysParallel;

    impl Policy for AlwaysParallel {
        fn act(&mut self, _state: &[f64]) -> usize {
            ExecMode::Parallel.as_action()
        }

        fn remember(&mut self, _: &[f64], _: usize, _: f64, _: &[f64], _: bool) {}

        fn train_step(&mut self) -> Option<f64> {
            None
        }
    }

    fn config(dir: &std::path::Path) -> OrchestratorConfig {
        OrchestratorConfig {
            report_path: dir.join("master_report.json"),
            collector_report: None,
            unknown_genes_report: None,
            signal_timeout_ms: 10,
            ..OrchestratorConfig::default()
        }
    }

    fn orchestrator(
        cfg: OrchestratorConfig,
        policy: Box<dyn Policy>,
        bus: &MemoryBus,
    ) -> Orchestrator {
        let sanity = Task::from_fn("sanity", || async { Ok(()) });
        Orchestrator::builder(cfg, policy)
            .discovery(TaskDiscovery::new().with_seed(sanity))
            .signals(bus.subscribe(&[CYCLE_STARTED]))
            .build()
    }

    fn section() -> CycleSection {
        CycleSection {
            interval_ms: 1,
            mode: ExecMode::Sequential,
            signal_timeout_ms: 10,
        }
    }

    #[tokio::test]
    async fn each_cycle_is_signalled_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(MemoryBus::new(16));
        let mut watcher = bus.subscribe(&[CYCLE_STARTED]);
        let policy = Box::new(QTablePolicy::new(QTableConfig::default()));
        let orch = orchestrator(config(dir.path()), policy, &bus);
        let job = CycleJob::new(orch, bus.clone(), section());

        job.run_once().await.unwrap();
        job.run_once().await.unwrap();
        assert_eq!(job.cycles(), 2);
        assert!(dir.path().join("master_report.json").exists());

        let (_, first) = watcher.receive(Duration::from_millis(50)).await.unwrap();
        let (_, second) = watcher.receive(Duration::from_millis(50)).await.unwrap();
        assert_eq!(first["cycle"], 1);
        assert_eq!(second["cycle"], 2);
        assert_eq!(second["mode"], "sequential");
    }

    #[tokio::test]
    async fn failed_cycle_fails_the_supervised_run() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(MemoryBus::new(16));
        let mut cfg = config(dir.path());
        cfg.pool_size = 0;
        let job = CycleJob::new(
            orchestrator(cfg, Box::new(AlwaysParallel), &bus),
            bus.clone(),
            CycleSection {
                mode: ExecMode::Parallel,
                ..section()
            },
        );

        assert!(matches!(
            job.run_once().await,
            Err(OrchestratorError::Executor(ExecutorError::InvalidPoolSize(0)))
        ));

        let task = Arc::new(job).into_task();
        assert_eq!(task.name(), SLOT);
        match task.spawn(CancellationToken::new()).await {
            Err(TaskError::Fail { reason }) => assert!(reason.starts_with("cycle failed")),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_run_starts_no_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(MemoryBus::new(16));
        let policy = Box::new(QTablePolicy::new(QTableConfig::default()));
        let job = Arc::new(CycleJob::new(
            orchestrator(config(dir.path()), policy, &bus),
            bus.clone(),
            section(),
        ));

        let ctx = CancellationToken::new();
        ctx.cancel();
        let res = Arc::clone(&job).into_task().spawn(ctx).await;
        assert!(matches!(res, Err(TaskError::Canceled)));
        assert_eq!(job.cycles(), 0);
        assert!(!dir.path().join("master_report.json").exists());
    }
}
