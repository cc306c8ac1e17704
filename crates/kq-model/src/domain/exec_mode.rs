use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the executor runs a cycle's task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// One task at a time, in discovery order.
    #[default]
    Sequential,
    /// Bounded worker pool, results in completion order.
    Parallel,
}

#[derive(Debug, Error)]
#[error("invalid execution mode: {0} (expected: sequential|parallel)")]
pub struct ParseModeError(String);

impl ExecMode {
    /// Policy action encoding: `0` sequential, `1` parallel.
    pub fn from_action(action: usize) -> Self {
        if action == 1 {
            ExecMode::Parallel
        } else {
            ExecMode::Sequential
        }
    }

    pub fn as_action(&self) -> usize {
        match self {
            ExecMode::Sequential => 0,
            ExecMode::Parallel => 1,
        }
    }

    /// Feature value fed to the policy as the caller's preference.
    pub fn as_flag(&self) -> f64 {
        match self {
            ExecMode::Sequential => 0.0,
            ExecMode::Parallel => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Sequential => "sequential",
            ExecMode::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecMode::Sequential),
            "parallel" | "par" => Ok(ExecMode::Parallel),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
