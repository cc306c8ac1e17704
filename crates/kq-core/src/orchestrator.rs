//! One orchestrator cycle: discover, negotiate, decide, execute, report, learn.

use std::{path::PathBuf, sync::Arc, time::Duration};

use kq_bus::{NoopPusher, Pusher, Requester, Subscription};
use kq_model::{CycleReport, CycleState, Event, EventKind, ExecMode};
use kq_policy::Policy;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    AdmissionNegotiator, ArtifactPaths, CycleHook, CycleOutcome, EventSink, Executor,
    ExecutorError, MetricsBackend, NoopMetrics, OrchestratorConfig, ReportAggregator,
    ReportError, TaskDiscovery, Telemetry, report::timestamp_now,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Runs cycles. `run` takes `&mut self`, so two cycles never overlap.
pub struct Orchestrator {
    module: String,
    policy_path: Option<PathBuf>,
    signal_timeout: Duration,

    discovery: TaskDiscovery,
    negotiator: AdmissionNegotiator,
    policy: Box<dyn Policy>,
    executor: Executor,
    aggregator: ReportAggregator,
    hooks: Vec<Arc<dyn CycleHook>>,
    signals: Option<Box<dyn Subscription>>,

    telemetry: Telemetry,
    metrics: Arc<dyn MetricsBackend>,
    metrics_sink: Arc<dyn Pusher>,
}

impl Orchestrator {
    pub fn builder(config: OrchestratorConfig, policy: Box<dyn Policy>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config, policy)
    }

    /// Execute one cycle and return its report.
    ///
    /// Task failures never surface here; only pool construction and report persistence do.
    #[instrument(level = "info", skip(self), fields(module = %self.module))]
    pub async fn run(&mut self, requested: ExecMode) -> Result<CycleReport, OrchestratorError> {
        self.telemetry.emit(Event::new(EventKind::CycleStarted).with_mode(requested));
        self.await_signal().await;

        let tasks = self.discovery.discover(&self.telemetry).await.tasks;
        let state = CycleState::new(tasks.len(), requested).to_vector();
        let action = self.policy.act(&state);

        if !self.negotiator.negotiate(tasks.len()).await.proceeds() {
            return Ok(self.defer(requested).await);
        }

        let mode = ExecMode::from_action(action);
        info!(%mode, tasks = tasks.len(), "executing cycle");
        let results = self.executor.run(mode, tasks, &self.telemetry).await?;
        for result in &results {
            self.metrics.record_task(result);
        }

        let mut report = self.aggregator.build(mode, results);
        self.aggregator.notify_sync(&report.summary, &self.telemetry);
        self.aggregator.merge_artifacts(&mut report, &self.telemetry).await;
        self.aggregator.persist(&report).await?;

        self.run_hooks(&report).await;
        self.learn(&state, action, report.reward()).await;

        let outcome = if report.summary.error_count == 0 {
            CycleOutcome::Clean
        } else {
            CycleOutcome::Degraded
        };
        self.metrics.record_cycle(mode, outcome);
        self.telemetry.emit(
            Event::new(EventKind::CycleFinished)
                .with_mode(mode)
                .with_runtime(report.summary.total_runtime_seconds)
                .with_value(report.summary.error_count as f64),
        );
        info!(
            total_runtime_seconds = report.summary.total_runtime_seconds,
            error_count = report.summary.error_count,
            failed_modules = ?report.summary.failed_modules,
            "cycle finished"
        );
        Ok(report)
    }

    async fn await_signal(&mut self) {
        let Some(signals) = self.signals.as_mut() else {
            return;
        };
        if let Some((topic, payload)) = signals.receive(self.signal_timeout).await {
            debug!(%topic, ?payload, "cycle signal received");
            self.telemetry.emit(Event::new(EventKind::CycleSignal).with_reason(topic));
        }
    }

    async fn defer(&self, requested: ExecMode) -> CycleReport {
        self.push_metrics(json!({
            "kind": "cooperative",
            "module": self.module,
            "decision": "deferred",
        }))
        .await;
        self.metrics.record_cycle(requested, CycleOutcome::Deferred);
        self.telemetry.emit(
            Event::new(EventKind::CycleDeferred)
                .with_mode(requested)
                .with_reason("admission peer deferred"),
        );
        CycleReport::deferred(timestamp_now(), requested)
    }

    async fn run_hooks(&self, report: &CycleReport) {
        for hook in &self.hooks {
            if let Err(e) = hook.after_cycle(report).await {
                warn!(hook = hook.name(), error = %e, "post-cycle hook failed");
                self.telemetry.emit(
                    Event::new(EventKind::HookFailed)
                        .with_task(hook.name())
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    async fn learn(&mut self, state: &[f64], action: usize, reward: f64) {
        self.policy.remember(state, action, reward, &CycleState::TERMINAL, true);
        let loss = self.policy.train_step();

        if let Some(path) = &self.policy_path {
            if let Err(e) = self.policy.save(path) {
                warn!(path = %path.display(), error = %e, "failed to save policy");
            }
        }

        self.metrics.record_reward(reward);
        self.push_metrics(json!({
            "kind": "rl",
            "module": self.module,
            "action": action,
            "reward": reward,
            "loss": loss,
        }))
        .await;
        self.telemetry.emit(Event::new(EventKind::PolicyUpdated).with_value(reward));
    }

    async fn push_metrics(&self, value: Value) {
        let Value::Object(payload) = value else {
            return;
        };
        if let Err(e) = self.metrics_sink.push(payload).await {
            debug!(error = %e, "metrics push dropped");
        }
    }
}

/// Wires an [`Orchestrator`]; unset collaborators default to no-ops.
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    policy: Box<dyn Policy>,
    discovery: TaskDiscovery,
    admission: Option<Arc<dyn Requester>>,
    sync: Option<Arc<dyn Requester>>,
    hooks: Vec<Arc<dyn CycleHook>>,
    signals: Option<Box<dyn Subscription>>,
    sinks: Vec<Arc<dyn EventSink>>,
    metrics: Arc<dyn MetricsBackend>,
    metrics_sink: Arc<dyn Pusher>,
}

impl OrchestratorBuilder {
    pub fn new(config: OrchestratorConfig, policy: Box<dyn Policy>) -> Self {
        Self {
            config,
            policy,
            discovery: TaskDiscovery::new(),
            admission: None,
            sync: None,
            hooks: Vec::new(),
            signals: None,
            sinks: Vec::new(),
            metrics: Arc::new(NoopMetrics),
            metrics_sink: Arc::new(NoopPusher),
        }
    }

    pub fn discovery(mut self, discovery: TaskDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn admission_peer(mut self, peer: Arc<dyn Requester>) -> Self {
        self.admission = Some(peer);
        self
    }

    pub fn sync_peer(mut self, peer: Arc<dyn Requester>) -> Self {
        self.sync = Some(peer);
        self
    }

    pub fn hook(mut self, hook: Arc<dyn CycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Subscription polled for a `cycle.started` signal before each cycle.
    pub fn signals(mut self, subscription: Box<dyn Subscription>) -> Self {
        self.signals = Some(subscription);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics_sink(mut self, sink: Arc<dyn Pusher>) -> Self {
        self.metrics_sink = sink;
        self
    }

    pub fn build(self) -> Orchestrator {
        let cfg = self.config;
        let mut aggregator = ReportAggregator::new(ArtifactPaths {
            report: cfg.report_path.clone(),
            collector: cfg.collector_report.clone(),
            unknown_genes: cfg.unknown_genes_report.clone(),
        });
        if let Some(peer) = self.sync {
            aggregator = aggregator.with_sync(peer, cfg.sync_timeout());
        }

        Orchestrator {
            negotiator: AdmissionNegotiator::new(
                cfg.module.clone(),
                self.admission,
                cfg.admission_timeout(),
            ),
            executor: Executor::new(cfg.pool_size),
            signal_timeout: cfg.signal_timeout(),
            policy_path: cfg.policy_path,
            module: cfg.module,
            discovery: self.discovery,
            policy: self.policy,
            aggregator,
            hooks: self.hooks,
            signals: self.signals,
            telemetry: Telemetry::new(self.sinks),
            metrics: self.metrics,
            metrics_sink: self.metrics_sink,
        }
    }
}
