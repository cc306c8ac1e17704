use serde::{Deserialize, Serialize};

use super::{ErrorKind, TaskName, TaskStatus, round_to};

/// Result of running one task unit. Exactly one per task per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task name as discovered.
    pub name: TaskName,
    /// Final outcome.
    pub status: TaskStatus,
    /// Wall time in seconds, rounded to 4 decimals.
    pub runtime_seconds: f64,
    /// Failure message; always present (as `null`) on the wire.
    pub error: Option<String>,
    /// Failure classification, only set when `status` is `fail`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl TaskResult {
    pub fn ok(name: impl Into<TaskName>, runtime_seconds: f64) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Ok,
            runtime_seconds: round_to(runtime_seconds.max(0.0), 4),
            error: None,
            error_kind: None,
        }
    }

    pub fn fail(
        name: impl Into<TaskName>,
        runtime_seconds: f64,
        kind: ErrorKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Fail,
            runtime_seconds: round_to(runtime_seconds.max(0.0), 4),
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_is_rounded_and_clamped() {
        let r = TaskResult::ok("a", 0.123_456_7);
        assert_eq!(r.runtime_seconds, 0.1235);

        let r = TaskResult::ok("a", -1.0);
        assert_eq!(r.runtime_seconds, 0.0);
    }

    #[test]
    fn ok_result_serializes_null_error() {
        let json = serde_json::to_value(TaskResult::ok("collector", 1.5)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "collector",
                "status": "ok",
                "runtime_seconds": 1.5,
                "error": null,
            })
        );
    }

    #[test]
    fn failed_result_carries_kind() {
        let r = TaskResult::fail("builder", 0.2, ErrorKind::Timeout, "timed out");
        assert!(!r.is_ok());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["error_kind"], "timeout");
        assert_eq!(json["error"], "timed out");
    }
}
