use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Upper bound for the default worker pool.
const MAX_DEFAULT_POOL: usize = 32;

/// `min(32, cpus + 4)`.
pub fn default_pool_size() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    MAX_DEFAULT_POOL.min(cpus + 4)
}

/// Orchestrator settings; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Name sent to the admission peer and in metrics pushes.
    pub module: String,
    /// Where each cycle's report is written.
    pub report_path: PathBuf,
    /// Sibling JSON artifact merged as `collector`.
    pub collector_report: Option<PathBuf>,
    /// Sibling NDJSON artifact summarized as `unknown_genes`.
    pub unknown_genes_report: Option<PathBuf>,
    /// Policy table location; no persistence when unset.
    pub policy_path: Option<PathBuf>,
    pub pool_size: usize,
    pub admission_timeout_ms: u64,
    pub sync_timeout_ms: u64,
    /// Wait for a `cycle.started` signal at the start of each cycle.
    pub signal_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            module: "kq".to_string(),
            report_path: PathBuf::from("reports/master_report.json"),
            collector_report: Some(PathBuf::from("reports/collector_report.json")),
            unknown_genes_report: Some(PathBuf::from("reports/unknown_genes.ndjson")),
            policy_path: None,
            pool_size: default_pool_size(),
            admission_timeout_ms: 100,
            sync_timeout_ms: 100,
            signal_timeout_ms: 100,
        }
    }
}

impl OrchestratorConfig {
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_millis(self.admission_timeout_ms)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }
}
