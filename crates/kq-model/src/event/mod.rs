use serde::{Deserialize, Serialize};

use crate::ExecMode;

/// Classification of orchestrator telemetry events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // cycle
    CycleStarted,
    CycleFinished,
    CycleDeferred,
    CycleSignal,

    // task unit
    TaskStarting,
    TaskFinished,
    TaskFailed,

    // collaborators
    ProviderSkipped,
    ArtifactInvalid,
    SyncFailed,
    HookFailed,

    // policy
    PolicyUpdated,
}

/// Structured telemetry event delivered to every registered subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Task, provider, artifact or hook the event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Human-readable cause or detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecMode>,
    /// Free-form numeric value (failure count, reward, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            task: None,
            reason: None,
            runtime_seconds: None,
            mode: None,
            value: None,
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_runtime(mut self, seconds: f64) -> Self {
        self.runtime_seconds = Some(seconds);
        self
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}
