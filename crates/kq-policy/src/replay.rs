use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One `(s, a, r, s', done)` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}

/// Bounded FIFO of transitions not yet learned from. Oldest entries are dropped when full.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Remove and return up to `batch_size` of the oldest transitions.
    pub fn drain_batch(&mut self, batch_size: usize) -> Vec<Experience> {
        let n = batch_size.min(self.buffer.len());
        self.buffer.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(reward: f64) -> Experience {
        Experience {
            state: vec![1.0, 0.0],
            action: 0,
            reward,
            next_state: vec![0.0, 0.0],
            done: true,
        }
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut buf = ReplayBuffer::new(2);
        buf.push(exp(1.0));
        buf.push(exp(2.0));
        buf.push(exp(3.0));

        let batch = buf.drain_batch(10);
        assert_eq!(batch.iter().map(|e| e.reward).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_batch_respects_size() {
        let mut buf = ReplayBuffer::new(8);
        for r in 0..5 {
            buf.push(exp(r as f64));
        }
        assert_eq!(buf.drain_batch(2).len(), 2);
        assert_eq!(buf.len(), 3);
    }
}
