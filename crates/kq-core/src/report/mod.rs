//! Report aggregation: results, sibling artifacts, sync notification and persistence.

mod artifacts;

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use kq_bus::{Payload, Requester};
use kq_model::{CycleReport, CycleSummary, Event, EventKind, ExecMode, TaskResult, UnknownGenes};
use serde_json::Value;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use crate::Telemetry;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Current UTC time in RFC 3339.
pub fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

/// Files the aggregator reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub report: PathBuf,
    pub collector: Option<PathBuf>,
    pub unknown_genes: Option<PathBuf>,
}

/// Builds, enriches and persists cycle reports.
pub struct ReportAggregator {
    paths: ArtifactPaths,
    sync: Option<Arc<dyn Requester>>,
    sync_timeout: Duration,
}

impl ReportAggregator {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            sync: None,
            sync_timeout: Duration::from_millis(100),
        }
    }

    pub fn with_sync(mut self, peer: Arc<dyn Requester>, timeout: Duration) -> Self {
        self.sync = Some(peer);
        self.sync_timeout = timeout;
        self
    }

    pub fn build(&self, mode: ExecMode, results: Vec<TaskResult>) -> CycleReport {
        CycleReport::new(timestamp_now(), mode, results)
    }

    /// Send `{cmd: "sync_report", summary}` without waiting for the answer.
    pub fn notify_sync(&self, summary: &CycleSummary, telemetry: &Telemetry) {
        let Some(peer) = &self.sync else {
            return;
        };
        let summary = match serde_json::to_value(summary) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "sync summary not serializable");
                return;
            }
        };

        let mut payload = Payload::new();
        payload.insert("cmd".into(), Value::from("sync_report"));
        payload.insert("summary".into(), summary);

        let peer = Arc::clone(peer);
        let timeout = self.sync_timeout;
        let telemetry = telemetry.clone();
        tokio::spawn(async move {
            if peer.request(payload, timeout).await.is_none() {
                debug!("sync peer did not answer");
                telemetry.emit(Event::new(EventKind::SyncFailed).with_reason("no reply"));
            }
        });
    }

    /// Attach `collector` and `unknown_genes` sections when their artifacts exist.
    pub async fn merge_artifacts(&self, report: &mut CycleReport, telemetry: &Telemetry) {
        if let Some(path) = &self.paths.collector {
            if let Some(read) = read_artifact(path).await {
                let parsed = match read {
                    Ok(text) => artifacts::parse_collector(&text),
                    Err(_) => None,
                };
                let value = match parsed {
                    Some(v) => v,
                    None => {
                        invalid(path, telemetry).await;
                        CycleReport::invalid_collector()
                    }
                };
                report.collector = Some(value);
            }
        }

        if let Some(path) = &self.paths.unknown_genes {
            if let Some(read) = read_artifact(path).await {
                let section = match read {
                    Ok(text) => artifacts::summarize_unknown_genes(&text),
                    Err(_) => Some(UnknownGenes::invalid()),
                };
                if matches!(section, Some(UnknownGenes::Invalid { .. })) {
                    invalid(path, telemetry).await;
                }
                if section.is_some() {
                    report.unknown_genes = section;
                }
            }
        }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub async fn persist(&self, report: &CycleReport) -> Result<(), ReportError> {
        let path = &self.paths.report;
        let body = serde_json::to_string_pretty(report)?;
        let io_err = |source: io::Error| ReportError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(path, body).await.map_err(io_err)?;
        debug!(path = %path.display(), "report persisted");
        Ok(())
    }
}

/// `None` when the artifact does not exist; read errors are returned for marking.
async fn read_artifact(path: &Path) -> Option<io::Result<String>> {
    match tokio::fs::read_to_string(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        other => Some(other),
    }
}

async fn invalid(path: &Path, telemetry: &Telemetry) {
    warn!(path = %path.display(), error_kind = "serialization_failure", "invalid artifact");
    telemetry.emit(
        Event::new(EventKind::ArtifactInvalid)
            .with_task(path.display().to_string())
            .with_reason("unparsable artifact"),
    );
}
