mod task_status;
pub use task_status::{ErrorKind, TaskStatus};

mod task_result;
pub use task_result::TaskResult;

mod exec_mode;
pub use exec_mode::{ExecMode, ParseModeError};

mod cycle_state;
pub use cycle_state::CycleState;

mod report;
pub use report::{CycleReport, CycleSummary, UnknownGenes};

mod admission;
pub use admission::{AdmissionRequest, AdmissionResponse};

mod cluster;
pub use cluster::{ClusterSnapshot, NodeRecord};

/// Logical task name; unique within a cycle.
pub type TaskName = String;

/// Round `value` to `decimals` places (half away from zero).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
