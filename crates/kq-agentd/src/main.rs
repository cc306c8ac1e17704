mod config;
mod cycle;
mod http;

use std::sync::Arc;

use anyhow::Context;
use taskvisor::{Supervisor, SupervisorConfig, TaskSpec};
use tracing::info;

use kq_bus::{
    HttpPusher, HttpRequester, MemoryBus, NoopPusher, Publisher, Pusher, Requester, Subscriber,
    pipeline,
};
use kq_core::{Orchestrator, TaskDiscovery};
use kq_exec::ManifestProvider;
use kq_observe::{Journal, init_logger};
use kq_policy::{Policy, QTablePolicy};
use kq_prometheus::PrometheusMetrics;
use kq_scheduler::{HeartbeatEmitter, Scheduler, init_uptime, resident};

use crate::{
    config::{AgentConfig, PeerSection},
    cycle::CycleJob,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_uptime();

    // 1) Config + logger
    let cfg = AgentConfig::load()?;
    init_logger(&cfg.logger.clone().with_env())?;
    info!(module = %cfg.module, "logger initialized");

    // 2) Bus
    let bus = Arc::new(MemoryBus::default());
    let (heartbeat_tx, heartbeat_rx) = pipeline();
    let heartbeat_tx: Arc<dyn Pusher> = Arc::new(heartbeat_tx);
    let metrics_sink = metrics_sink(&cfg.metrics)?;
    let prometheus = PrometheusMetrics::new().context("prometheus registry")?;
    let journal = Arc::new(Journal::new());

    // 3) Orchestrator
    let orchestrator = build_orchestrator(
        &cfg,
        &bus,
        journal.clone(),
        metrics_sink.clone(),
        prometheus.clone(),
    )?;
    info!("orchestrator ready");

    // 4) Jobs
    let mut jobs: Vec<TaskSpec> = Vec::new();
    let scheduler = Scheduler::new(
        cfg.scheduler.clone(),
        Box::new(heartbeat_rx),
        bus.clone(),
        metrics_sink.clone(),
    );
    jobs.push(scheduler.into_spec());
    if cfg.heartbeat.enabled {
        let emitter = HeartbeatEmitter::new(cfg.heartbeat.clone(), heartbeat_tx.clone());
        info!(node = emitter.node(), "heartbeat emitter configured");
        jobs.push(emitter.into_spec());
    }
    if let Some(listen) = &cfg.http.listen {
        let app = http::router(prometheus.clone(), heartbeat_tx.clone());
        jobs.push(resident(http::serve_task(listen.clone(), app)));
    }
    let publisher: Arc<dyn Publisher> = bus.clone();
    jobs.push(CycleJob::new(orchestrator, publisher, cfg.cycle.clone()).into_spec());

    // 5) Supervisor: runs until an OS signal, then shuts the jobs down within grace
    let subscribers: Vec<Arc<dyn taskvisor::Subscribe>> = vec![journal];
    let supervisor = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();

    info!(jobs = jobs.len(), "agent is running; press Ctrl+C to stop");
    supervisor
        .run(jobs)
        .await
        .map_err(|e| anyhow::anyhow!("supervisor: {e}"))?;
    info!("shut down");
    Ok(())
}

fn metrics_sink(section: &PeerSection) -> anyhow::Result<Arc<dyn Pusher>> {
    let sink: Arc<dyn Pusher> = match &section.address {
        Some(addr) => Arc::new(HttpPusher::new(addr.clone(), section.timeout())?),
        None => Arc::new(NoopPusher),
    };
    Ok(sink)
}

fn requester(section: &PeerSection) -> anyhow::Result<Option<Arc<dyn Requester>>> {
    let Some(addr) = &section.address else {
        return Ok(None);
    };
    let peer: Arc<dyn Requester> = Arc::new(HttpRequester::new(addr.clone())?);
    Ok(Some(peer))
}

fn build_orchestrator(
    cfg: &AgentConfig,
    bus: &MemoryBus,
    journal: Arc<Journal>,
    metrics_sink: Arc<dyn Pusher>,
    prometheus: PrometheusMetrics,
) -> anyhow::Result<Orchestrator> {
    let mut discovery = TaskDiscovery::new();
    for manifest in &cfg.tasks {
        let name = manifest.name.clone();
        let task = manifest
            .clone()
            .into_task()
            .with_context(|| format!("seed task {name}"))?;
        discovery.seed(task);
    }
    if let Some(dir) = &cfg.paths.manifests {
        info!(dir = %dir.display(), "manifest provider registered");
        discovery.register(Arc::new(ManifestProvider::new(dir.clone())));
    }

    let policy: Box<dyn Policy> = match &cfg.paths.policy {
        Some(path) => Box::new(QTablePolicy::load_or_default(path, cfg.policy.clone())),
        None => Box::new(QTablePolicy::new(cfg.policy.clone())),
    };

    let mut builder = Orchestrator::builder(cfg.orchestrator(), policy)
        .discovery(discovery)
        .signals(bus.subscribe(&[cycle::CYCLE_STARTED]))
        .event_sink(journal)
        .metrics(Arc::new(prometheus))
        .metrics_sink(metrics_sink);
    if let Some(peer) = requester(&cfg.cooperation)? {
        info!("admission peer configured");
        builder = builder.admission_peer(peer);
    }
    if let Some(peer) = requester(&cfg.sync)? {
        info!("sync peer configured");
        builder = builder.sync_peer(peer);
    }
    Ok(builder.build())
}
