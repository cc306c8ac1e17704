use serde::{Deserialize, Serialize};

use super::{ExecMode, TaskName, TaskResult, round_to};

/// Aggregated view over a cycle's task results.
///
/// Invariants: `error_count == failed_modules.len()` and
/// `total_runtime_seconds == round(sum(runtime_seconds), 4)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub total_runtime_seconds: f64,
    pub error_count: usize,
    pub failed_modules: Vec<TaskName>,
}

impl CycleSummary {
    pub fn from_results(results: &[TaskResult]) -> Self {
        let total: f64 = results.iter().map(|r| r.runtime_seconds).sum();
        let failed_modules: Vec<TaskName> = results
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.name.clone())
            .collect();

        Self {
            total_runtime_seconds: round_to(total, 4),
            error_count: failed_modules.len(),
            failed_modules,
        }
    }
}

/// Summary of the genomics-intelligence artifact stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnknownGenes {
    Stats { count: usize, avg_score: f64 },
    Invalid { error: String },
}

impl UnknownGenes {
    pub const INVALID: &'static str = "invalid unknown genes report";

    pub fn invalid() -> Self {
        UnknownGenes::Invalid {
            error: Self::INVALID.to_string(),
        }
    }
}

/// The document produced by one orchestrator cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// RFC 3339 timestamp; sorts lexicographically.
    pub timestamp: String,
    /// Mode the tasks actually ran in (requested mode for deferred cycles).
    pub mode: ExecMode,
    /// One entry per task. Order is only meaningful in sequential mode.
    pub results: Vec<TaskResult>,
    pub summary: CycleSummary,
    /// Parsed collector artifact, or an inline error marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_genes: Option<UnknownGenes>,
}

impl CycleReport {
    pub const INVALID_COLLECTOR: &'static str = "invalid collector report";

    pub fn new(timestamp: impl Into<String>, mode: ExecMode, results: Vec<TaskResult>) -> Self {
        let summary = CycleSummary::from_results(&results);
        Self {
            timestamp: timestamp.into(),
            mode,
            results,
            summary,
            collector: None,
            unknown_genes: None,
        }
    }

    /// Report for a cycle the admission peer deferred: nothing ran.
    pub fn deferred(timestamp: impl Into<String>, mode: ExecMode) -> Self {
        Self::new(timestamp, mode, Vec::new())
    }

    /// Inline marker attached when the collector artifact cannot be parsed.
    pub fn invalid_collector() -> serde_json::Value {
        serde_json::json!({ "error": Self::INVALID_COLLECTOR })
    }

    /// `+1.0` when nothing failed, `-1.0` otherwise.
    pub fn reward(&self) -> f64 {
        if self.summary.failed_modules.is_empty() {
            1.0
        } else {
            -1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sample_results() -> Vec<TaskResult> {
        vec![
            TaskResult::ok("sanity", 0.1),
            TaskResult::fail("collector", 0.20005, ErrorKind::ExecutionFailure, "boom"),
            TaskResult::ok("builder", 0.3),
        ]
    }

    #[test]
    fn summary_invariants_hold() {
        let report = CycleReport::new("t", ExecMode::Sequential, sample_results());
        let failed = report.results.iter().filter(|r| !r.is_ok()).count();

        assert_eq!(report.summary.error_count, failed);
        assert_eq!(report.summary.failed_modules, vec!["collector".to_string()]);
        let sum: f64 = report.results.iter().map(|r| r.runtime_seconds).sum();
        assert_eq!(report.summary.total_runtime_seconds, round_to(sum, 4));
    }

    #[test]
    fn empty_results_give_zero_summary() {
        let report = CycleReport::deferred("t", ExecMode::Parallel);
        assert_eq!(report.summary, CycleSummary::default());
        assert_eq!(report.summary.total_runtime_seconds, 0.0);
        assert_eq!(report.reward(), 1.0);
    }

    #[test]
    fn reward_is_negative_on_any_failure() {
        let report = CycleReport::new("t", ExecMode::Parallel, sample_results());
        assert_eq!(report.reward(), -1.0);
    }

    #[test]
    fn optional_sections_are_omitted() {
        let report = CycleReport::deferred("2025-01-01T00:00:00Z", ExecMode::Sequential);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "timestamp": "2025-01-01T00:00:00Z",
                "mode": "sequential",
                "results": [],
                "summary": {
                    "total_runtime_seconds": 0.0,
                    "error_count": 0,
                    "failed_modules": [],
                },
            })
        );
    }

    #[test]
    fn unknown_genes_shapes() {
        let stats = UnknownGenes::Stats {
            count: 2,
            avg_score: 0.5,
        };
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({"count": 2, "avg_score": 0.5})
        );
        assert_eq!(
            serde_json::to_value(UnknownGenes::invalid()).unwrap(),
            serde_json::json!({"error": "invalid unknown genes report"})
        );
    }
}
