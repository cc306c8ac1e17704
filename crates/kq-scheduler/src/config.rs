use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cluster telemetry loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pause between ticks.
    pub interval_ms: u64,
    /// A drain ends once a receive waits this long.
    pub poll_timeout_ms: u64,
    /// Topic the snapshot is published on.
    pub topic: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            poll_timeout_ms: 100,
            topic: "cluster.metrics".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Own-node heartbeat settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Fixed node id; detected from the environment when unset.
    pub node: Option<String>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            node: None,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
