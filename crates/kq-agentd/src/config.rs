//! Daemon configuration: an optional JSON file from `KQ_CONFIG` or `./kq.json`.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use kq_core::{OrchestratorConfig, default_pool_size};
use kq_exec::TaskManifest;
use kq_model::ExecMode;
use kq_observe::LoggerConfig;
use kq_policy::QTableConfig;
use kq_scheduler::{HeartbeatConfig, SchedulerConfig};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "KQ_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "kq.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Optional request/reply or push peer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PeerSection {
    /// HTTP endpoint; the channel is a no-op when unset.
    pub address: Option<String>,
    pub timeout_ms: u64,
}

impl Default for PeerSection {
    fn default() -> Self {
        Self {
            address: None,
            timeout_ms: 100,
        }
    }
}

impl PeerSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub report: PathBuf,
    pub collector_report: Option<PathBuf>,
    pub unknown_genes_report: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    /// Directory of JSON task manifests.
    pub manifests: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        let orchestrator = OrchestratorConfig::default();
        Self {
            report: orchestrator.report_path,
            collector_report: orchestrator.collector_report,
            unknown_genes_report: orchestrator.unknown_genes_report,
            policy: Some(PathBuf::from("reports/policy.json")),
            manifests: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub pool_size: usize,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CycleSection {
    /// Pause between cycles.
    pub interval_ms: u64,
    /// Mode requested from the policy each cycle.
    pub mode: ExecMode,
    /// How long a cycle waits for its `cycle.started` signal.
    pub signal_timeout_ms: u64,
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            mode: ExecMode::Parallel,
            signal_timeout_ms: 100,
        }
    }
}

impl CycleSection {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Listen address for `/metrics` and `/v1/heartbeat`; disabled when unset.
    pub listen: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            listen: Some("0.0.0.0:9464".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub module: String,
    pub paths: PathsSection,
    /// Seed tasks, always run first and never shadowed by manifests.
    pub tasks: Vec<TaskManifest>,
    pub cooperation: PeerSection,
    pub sync: PeerSection,
    pub metrics: PeerSection,
    pub scheduler: SchedulerConfig,
    pub heartbeat: HeartbeatConfig,
    pub executor: ExecutorSection,
    pub cycle: CycleSection,
    pub policy: QTableConfig,
    pub logger: LoggerConfig,
    pub http: HttpSection,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            module: OrchestratorConfig::default().module,
            paths: PathsSection::default(),
            tasks: Vec::new(),
            cooperation: PeerSection::default(),
            sync: PeerSection::default(),
            metrics: PeerSection::default(),
            scheduler: SchedulerConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            executor: ExecutorSection::default(),
            cycle: CycleSection::default(),
            policy: QTableConfig::default(),
            logger: LoggerConfig::default(),
            http: HttpSection::default(),
        }
    }
}

impl AgentConfig {
    /// `$KQ_CONFIG` (must exist), else `./kq.json` when present, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            module: self.module.clone(),
            report_path: self.paths.report.clone(),
            collector_report: self.paths.collector_report.clone(),
            unknown_genes_report: self.paths.unknown_genes_report.clone(),
            policy_path: self.paths.policy.clone(),
            pool_size: self.executor.pool_size,
            admission_timeout_ms: self.cooperation.timeout_ms,
            sync_timeout_ms: self.sync.timeout_ms,
            signal_timeout_ms: self.cycle.signal_timeout_ms,
        }
    }
}
