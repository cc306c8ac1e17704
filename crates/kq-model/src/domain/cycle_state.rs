use super::ExecMode;

/// Feature vector handed to the policy: `[task_count, requested_mode_flag]`.
///
/// Derived each cycle and never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleState {
    pub task_count: usize,
    pub requested: ExecMode,
}

impl CycleState {
    /// Terminal state passed to `remember`; every cycle is a one-step episode.
    pub const TERMINAL: [f64; 2] = [0.0, 0.0];

    pub fn new(task_count: usize, requested: ExecMode) -> Self {
        Self {
            task_count,
            requested,
        }
    }

    pub fn to_vector(&self) -> [f64; 2] {
        [self.task_count as f64, self.requested.as_flag()]
    }
}
