//! Directory of JSON task manifests exposed as a task provider.
//!
//! Each `*.json` file describes one subprocess task:
//!
//! ```json
//! { "name": "collector", "command": "python3", "args": ["collect.py"],
//!   "env": {"MODE": "fast"}, "cwd": "/opt/kq", "timeout_ms": 60000 }
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use kq_core::{DiscoveryError, Task, TaskProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ExecOperation, ProcConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskManifest {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl TaskManifest {
    pub fn into_task(self) -> Result<Task, DiscoveryError> {
        if self.name.trim().is_empty() {
            return Err(DiscoveryError::Invalid("empty task name".into()));
        }
        let cfg = ProcConfig {
            program: self.command,
            args: self.args,
            env: self.env.into_iter().collect(),
            cwd: self.cwd,
            fail_on_non_zero: true,
        };
        let op = ExecOperation::new(cfg).map_err(|e| DiscoveryError::Invalid(e.to_string()))?;

        let task = Task::new(self.name, Arc::new(op));
        Ok(match self.timeout_ms {
            Some(ms) => task.with_timeout(Duration::from_millis(ms)),
            None => task,
        })
    }
}

/// Lists one task per valid manifest, in file name order.
#[derive(Debug, Clone)]
pub struct ManifestProvider {
    name: String,
    dir: PathBuf,
}

impl ManifestProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "manifests".to_string(),
            dir: dir.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load(path: &Path) -> Result<Task, DiscoveryError> {
        let text = tokio::fs::read_to_string(path).await?;
        let manifest: TaskManifest =
            serde_json::from_str(&text).map_err(|e| DiscoveryError::Invalid(e.to_string()))?;
        manifest.into_task()
    }
}

#[async_trait]
impl TaskProvider for ManifestProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tasks(&self) -> Result<Vec<Task>, DiscoveryError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut tasks = Vec::with_capacity(files.len());
        for path in files {
            match Self::load(&path).await {
                Ok(task) => {
                    debug!(provider = %self.name, task = task.name(), "manifest loaded");
                    tasks.push(task);
                }
                Err(e) => warn!(
                    provider = %self.name,
                    path = %path.display(),
                    error_kind = e.kind().as_str(),
                    error = %e,
                    "invalid task manifest skipped"
                ),
            }
        }
        Ok(tasks)
    }
}
