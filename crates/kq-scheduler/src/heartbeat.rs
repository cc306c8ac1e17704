use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use kq_bus::{BusError, Pusher, to_payload};
use serde::{Deserialize, Serialize};
use taskvisor::{TaskError, TaskFn, TaskRef, TaskSpec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{HeartbeatConfig, arch, node_id, os_info, periodic, platform, uptime_seconds};

const SLOT: &str = "kq-heartbeat";

/// Heartbeat payload a node pushes into the scheduler pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub node: String,
    pub platform: String,
    pub arch: String,
    pub os: String,
    pub uptime_seconds: u64,
    /// Unix seconds.
    pub ts: i64,
}

impl Heartbeat {
    /// Snapshot of this process.
    pub fn current(node: impl Into<String>) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        Self {
            node: node.into(),
            platform: platform().to_string(),
            arch: arch().to_string(),
            os: os_info(),
            uptime_seconds: uptime_seconds(),
            ts,
        }
    }
}

/// Periodically pushes this node's heartbeat.
pub struct HeartbeatEmitter {
    cfg: HeartbeatConfig,
    node: String,
    sink: Arc<dyn Pusher>,
}

impl HeartbeatEmitter {
    pub fn new(cfg: HeartbeatConfig, sink: Arc<dyn Pusher>) -> Self {
        let node = cfg
            .node
            .clone()
            .unwrap_or_else(|| node_id().to_string());
        Self { cfg, node, sink }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub async fn emit_once(&self) -> Result<(), BusError> {
        let payload = to_payload(&Heartbeat::current(self.node.clone()))?;
        self.sink.push(payload).await
    }

    pub fn into_task(self) -> TaskRef {
        let emitter = Arc::new(self);

        let task: TaskRef = TaskFn::arc(SLOT, move |ctx: CancellationToken| {
            let emitter = Arc::clone(&emitter);

            async move {
                if ctx.is_cancelled() {
                    return Err(TaskError::Canceled);
                }
                match emitter.emit_once().await {
                    Ok(()) => {
                        debug!(node = %emitter.node, "heartbeat sent");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(node = %emitter.node, error = %e, "heartbeat failed");
                        Err(TaskError::Fail {
                            reason: format!("heartbeat failed: {e}"),
                        })
                    }
                }
            }
        });
        task
    }

    /// Emit immediately, then every `interval_ms`; a run may take at most one interval.
    pub fn into_spec(self) -> TaskSpec {
        let every = self.cfg.interval();
        periodic(self.into_task(), every, Some(every))
    }
}
