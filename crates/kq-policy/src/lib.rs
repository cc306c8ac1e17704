//! Execution-mode policy: a stateful decision function with online reward feedback.
//!
//! The orchestrator only consumes the [`Policy`] contract. [`QTablePolicy`] is the default
//! implementation; tests substitute deterministic stubs.

use std::path::Path;

mod error;
pub use error::PolicyError;

mod replay;
pub use replay::{Experience, ReplayBuffer};

mod qtable;
pub use qtable::{QTableConfig, QTablePolicy};

/// Number of discrete actions: `0` sequential, `1` parallel.
pub const ACTIONS: usize = 2;

pub trait Policy: Send + Sync {
    /// Pick an action for `state`.
    fn act(&mut self, state: &[f64]) -> usize;

    /// Record the outcome of acting in `state`.
    fn remember(
        &mut self,
        state: &[f64],
        action: usize,
        reward: f64,
        next_state: &[f64],
        done: bool,
    );

    /// Learn from remembered experience.
    ///
    /// Returns the mean absolute TD error, if anything was learned.
    fn train_step(&mut self) -> Option<f64>;

    /// Persist learned parameters. Stateless policies keep the default no-op.
    fn save(&self, _path: &Path) -> Result<(), PolicyError> {
        Ok(())
    }
}
