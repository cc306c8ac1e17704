use serde::{Deserialize, Serialize};

/// Sent to the admission peer before a cycle commits resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    /// Name of the orchestrating module.
    pub module: String,
    /// Number of tasks this cycle would run.
    pub priority: usize,
}

/// Peer verdict. A missing `execute` field means "go ahead".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    #[serde(default = "granted")]
    pub execute: bool,
}

fn granted() -> bool {
    true
}

impl Default for AdmissionResponse {
    fn default() -> Self {
        Self { execute: true }
    }
}
