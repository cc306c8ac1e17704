use serde::{Deserialize, Serialize};

/// Outcome of a single task unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Operation returned without error.
    Ok,
    /// Operation failed, panicked or timed out.
    Fail,
}

impl TaskStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ok => "ok",
            TaskStatus::Fail => "fail",
        }
    }
}

/// Classification of a failure, so callers never have to parse messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A task provider could not enumerate its tasks.
    ImportFailure,
    /// The operation itself returned an error or panicked.
    ExecutionFailure,
    /// The operation exceeded its configured time limit.
    Timeout,
    /// A payload, manifest or artifact could not be (de)serialized.
    SerializationFailure,
}

impl ErrorKind {
    /// Short symbolic identifier, used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ImportFailure => "import_failure",
            ErrorKind::ExecutionFailure => "execution_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::SerializationFailure => "serialization_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_format() {
        assert_eq!(serde_json::to_string(&TaskStatus::Ok).unwrap(), r#""ok""#);
        assert_eq!(serde_json::to_string(&TaskStatus::Fail).unwrap(), r#""fail""#);
    }

    #[test]
    fn error_kind_label_matches_serde() {
        for kind in [
            ErrorKind::ImportFailure,
            ErrorKind::ExecutionFailure,
            ErrorKind::Timeout,
            ErrorKind::SerializationFailure,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
