//! Tabular Q-learning over a discretized cycle state.
//!
//! State index = `min(task_count, max_task_bucket) * 2 + hint`, where `hint` is the caller's
//! requested mode flag. Every cycle is a one-step episode, so with `done = true` the update
//! reduces to `Q(s,a) ← Q(s,a) + α (r - Q(s,a))`.

use std::{
    cmp::Ordering,
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{ACTIONS, Experience, Policy, PolicyError, ReplayBuffer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QTableConfig {
    /// Step size α.
    pub learning_rate: f64,
    /// Discount γ for non-terminal transitions.
    pub discount_factor: f64,
    /// Task counts above this share one state bucket.
    pub max_task_bucket: usize,
    pub replay_capacity: usize,
    /// Transitions consumed per `train_step`.
    pub batch_size: usize,
}

impl Default for QTableConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            max_task_bucket: 64,
            replay_capacity: 256,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct QTable {
    values: Vec<[f64; ACTIONS]>,
    visits: Vec<[u64; ACTIONS]>,
}

impl QTable {
    fn new(size: usize) -> Self {
        Self {
            values: vec![[0.0; ACTIONS]; size],
            visits: vec![[0; ACTIONS]; size],
        }
    }

    fn max_value(&self, state_idx: usize) -> f64 {
        self.values[state_idx]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    config: QTableConfig,
    table: QTable,
    updates: u64,
}

pub struct QTablePolicy {
    config: QTableConfig,
    table: QTable,
    replay: ReplayBuffer,
    updates: u64,
}

impl QTablePolicy {
    pub fn new(config: QTableConfig) -> Self {
        let table = QTable::new(table_size(&config));
        let replay = ReplayBuffer::new(config.replay_capacity);
        Self {
            config,
            table,
            replay,
            updates: 0,
        }
    }

    /// Load a table saved with [`Policy::save`].
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;

        let mut table = snapshot.table;
        let size = table_size(&snapshot.config);
        table.values.resize(size, [0.0; ACTIONS]);
        table.visits.resize(size, [0; ACTIONS]);

        Ok(Self {
            replay: ReplayBuffer::new(snapshot.config.replay_capacity),
            config: snapshot.config,
            table,
            updates: snapshot.updates,
        })
    }

    /// Load from `path` when present and readable, otherwise start untrained with `config`.
    pub fn load_or_default(path: &Path, config: QTableConfig) -> Self {
        if !path.exists() {
            return Self::new(config);
        }
        match Self::load(path) {
            Ok(policy) => {
                debug!(path = %path.display(), updates = policy.updates, "policy state loaded");
                policy
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "policy state unreadable; starting untrained"
                );
                Self::new(config)
            }
        }
    }

    /// Total Q-updates applied since the table was created.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn q_values(&self, state: &[f64]) -> [f64; ACTIONS] {
        self.table.values[self.state_index(state)]
    }

    fn state_index(&self, state: &[f64]) -> usize {
        let count = state.first().copied().unwrap_or(0.0);
        let count = if count.is_finite() && count > 0.0 {
            (count as usize).min(self.config.max_task_bucket)
        } else {
            0
        };
        count * 2 + hint(state)
    }

    fn learn(&mut self, exp: &Experience) -> f64 {
        let idx = self.state_index(&exp.state);
        let action = exp.action.min(ACTIONS - 1);

        let future = if exp.done {
            0.0
        } else {
            self.config.discount_factor * self.table.max_value(self.state_index(&exp.next_state))
        };
        let current = self.table.values[idx][action];
        let td_error = exp.reward + future - current;

        self.table.values[idx][action] = current + self.config.learning_rate * td_error;
        self.table.visits[idx][action] += 1;
        self.updates += 1;
        td_error.abs()
    }
}

impl Default for QTablePolicy {
    fn default() -> Self {
        Self::new(QTableConfig::default())
    }
}

impl Policy for QTablePolicy {
    fn act(&mut self, state: &[f64]) -> usize {
        let q = self.table.values[self.state_index(state)];
        let action = match q[1].partial_cmp(&q[0]) {
            Some(Ordering::Greater) => 1,
            Some(Ordering::Less) => 0,
            _ => hint(state),
        };
        trace!(?state, ?q, action, "policy decision");
        action
    }

    fn remember(
        &mut self,
        state: &[f64],
        action: usize,
        reward: f64,
        next_state: &[f64],
        done: bool,
    ) {
        self.replay.push(Experience {
            state: state.to_vec(),
            action,
            reward,
            next_state: next_state.to_vec(),
            done,
        });
    }

    fn train_step(&mut self) -> Option<f64> {
        let batch = self.replay.drain_batch(self.config.batch_size);
        if batch.is_empty() {
            return None;
        }
        let total: f64 = batch.iter().map(|exp| self.learn(exp)).sum();
        Some(total / batch.len() as f64)
    }

    fn save(&self, path: &Path) -> Result<(), PolicyError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot {
            config: self.config.clone(),
            table: self.table.clone(),
            updates: self.updates,
        };
        fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }
}

fn table_size(config: &QTableConfig) -> usize {
    (config.max_task_bucket + 1) * 2
}

fn hint(state: &[f64]) -> usize {
    match state.get(1) {
        Some(flag) if *flag >= 0.5 => 1,
        _ => 0,
    }
}
