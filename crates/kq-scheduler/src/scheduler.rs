use std::sync::Arc;

use kq_bus::{Payload, Publisher, Puller, Pusher};
use kq_model::ClusterSnapshot;
use serde_json::Value;
use taskvisor::{TaskError, TaskFn, TaskRef, TaskSpec};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{SchedulerConfig, periodic};

const SLOT: &str = "kq-scheduler";

/// Drains node heartbeats and republishes the cluster snapshot every tick.
///
/// State lives in memory only; a restart begins with an empty snapshot.
pub struct Scheduler {
    cfg: SchedulerConfig,
    heartbeats: Box<dyn Puller>,
    publisher: Arc<dyn Publisher>,
    metrics: Arc<dyn Pusher>,
    nodes: ClusterSnapshot,
}

impl Scheduler {
    pub fn new(
        cfg: SchedulerConfig,
        heartbeats: Box<dyn Puller>,
        publisher: Arc<dyn Publisher>,
        metrics: Arc<dyn Pusher>,
    ) -> Self {
        Self {
            cfg,
            heartbeats,
            publisher,
            metrics,
            nodes: ClusterSnapshot::new(),
        }
    }

    pub fn nodes(&self) -> &ClusterSnapshot {
        &self.nodes
    }

    /// One tick: drain until a receive times out, then publish the snapshot.
    ///
    /// Returns how many heartbeats were drained. Publishing happens even when none arrived.
    pub async fn poll_once(&mut self) -> usize {
        let mut drained = 0;
        while let Some(msg) = self.heartbeats.receive(self.cfg.poll_timeout()).await {
            let id = self.nodes.upsert(msg);
            trace!(node = %id, "heartbeat stored");
            drained += 1;
        }

        let nodes = self.nodes.to_value();

        let mut metrics = Payload::new();
        metrics.insert("kind".into(), Value::from("cluster"));
        metrics.insert("nodes".into(), nodes.clone());
        if let Err(e) = self.metrics.push(metrics).await {
            debug!(error = %e, "cluster metrics push dropped");
        }

        let mut snapshot = Payload::new();
        snapshot.insert("nodes".into(), nodes);
        if let Err(e) = self.publisher.publish(&self.cfg.topic, snapshot).await {
            warn!(topic = %self.cfg.topic, error = %e, "cluster snapshot publish failed");
        }

        drained
    }

    /// Supervised form: each run is one tick; the snapshot survives between runs.
    pub fn into_task(self) -> TaskRef {
        let state = Arc::new(Mutex::new(self));

        let task: TaskRef = TaskFn::arc(SLOT, move |ctx: CancellationToken| {
            let state = Arc::clone(&state);

            async move {
                if ctx.is_cancelled() {
                    return Err(TaskError::Canceled);
                }
                let mut sched = state.lock().await;
                let drained = tokio::select! {
                    _ = ctx.cancelled() => return Err(TaskError::Canceled),
                    drained = sched.poll_once() => drained,
                };
                debug!(drained, nodes = sched.nodes.len(), "scheduler tick");
                Ok(())
            }
        });
        task
    }

    /// Tick every `interval_ms` under a supervisor.
    pub fn into_spec(self) -> TaskSpec {
        let every = self.cfg.interval();
        periodic(self.into_task(), every, None)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use kq_bus::{
        MemoryBus, NoopPublisher, NoopPusher, Subscriber, Subscription, pipeline, to_payload,
    };
    use serde_json::json;
    use taskvisor::Task;

    fn cfg() -> SchedulerConfig {
        SchedulerConfig {
            interval_ms: 10,
            poll_timeout_ms: 20,
            ..SchedulerConfig::default()
        }
    }

    fn p(v: Value) -> Payload {
        to_payload(&v).unwrap()
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (push, pull) = pipeline();
        let (metrics_tx, mut metrics_rx) = pipeline();
        let mut sched = Scheduler::new(
            cfg(),
            Box::new(pull),
            Arc::new(NoopPublisher),
            Arc::new(metrics_tx),
        );

        push.push(p(json!({"node": "a", "v": 1}))).await.unwrap();
        push.push(p(json!({"node": "b", "v": 1}))).await.unwrap();
        push.push(p(json!({"node": "a", "v": 2}))).await.unwrap();

        assert_eq!(sched.poll_once().await, 3);
        assert_eq!(sched.nodes().len(), 2);
        assert_eq!(sched.nodes().get("a").unwrap()["v"], 2);

        let pushed = metrics_rx.receive(Duration::from_millis(20)).await.unwrap();
        assert_eq!(pushed["kind"], "cluster");
        assert_eq!(pushed["nodes"]["a"]["v"], 2);
        assert_eq!(pushed["nodes"]["b"]["v"], 1);
    }

    #[tokio::test]
    async fn anonymous_heartbeats_get_ordinal_ids() {
        let (push, pull) = pipeline();
        let mut sched =
            Scheduler::new(cfg(), Box::new(pull), Arc::new(NoopPublisher), Arc::new(NoopPusher));

        push.push(p(json!({"gpu": 1}))).await.unwrap();
        push.push(p(json!({"gpu": 2}))).await.unwrap();
        sched.poll_once().await;

        let ids: Vec<_> = sched.nodes().ids().collect();
        assert_eq!(ids, vec!["node0", "node1"]);
    }

    #[tokio::test]
    async fn empty_tick_still_publishes() {
        let (_push, pull) = pipeline();
        let bus = Arc::new(MemoryBus::new(8));
        let mut sub = bus.subscribe(&["cluster.metrics"]);
        let mut sched = Scheduler::new(cfg(), Box::new(pull), bus.clone(), Arc::new(NoopPusher));

        assert_eq!(sched.poll_once().await, 0);
        let (topic, payload) = sub.receive(Duration::from_millis(50)).await.unwrap();
        assert_eq!(topic, "cluster.metrics");
        assert_eq!(Value::Object(payload), json!({"nodes": {}}));
    }

    #[tokio::test]
    async fn supervised_run_ticks_once() {
        let (push, pull) = pipeline();
        let bus = Arc::new(MemoryBus::new(64));
        let mut sub = bus.subscribe(&["cluster."]);
        let task =
            Scheduler::new(cfg(), Box::new(pull), bus.clone(), Arc::new(NoopPusher)).into_task();
        assert_eq!(task.name(), "kq-scheduler");

        push.push(p(json!({"node": "edge-1"}))).await.unwrap();
        task.spawn(CancellationToken::new()).await.unwrap();
        let (_, first) = sub.receive(Duration::from_millis(50)).await.unwrap();
        assert!(first["nodes"].get("edge-1").is_some());

        // Next run starts from the retained snapshot.
        push.push(p(json!({"node": "edge-2"}))).await.unwrap();
        task.spawn(CancellationToken::new()).await.unwrap();
        let (_, second) = sub.receive(Duration::from_millis(50)).await.unwrap();
        assert_eq!(second["nodes"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_run_publishes_nothing() {
        let (_push, pull) = pipeline();
        let bus = Arc::new(MemoryBus::new(8));
        let mut sub = bus.subscribe(&["cluster."]);
        let task =
            Scheduler::new(cfg(), Box::new(pull), bus.clone(), Arc::new(NoopPusher)).into_task();

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert!(matches!(task.spawn(ctx).await, Err(TaskError::Canceled)));
        assert!(sub.receive(Duration::from_millis(30)).await.is_none());
    }
}
