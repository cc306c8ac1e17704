//! Sequential or bounded-parallel execution of a cycle's tasks.

use std::sync::Arc;

use kq_model::{ExecMode, TaskResult};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, instrument};

use crate::{Task, Telemetry};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid worker pool size: {0}")]
    InvalidPoolSize(usize),

    #[error("worker pool closed")]
    PoolClosed,

    #[error("worker lost: {0}")]
    WorkerLost(String),
}

/// Semaphore-bounded pool; at most `size` tasks run at once.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, ExecutorError> {
        if size == 0 || size > Semaphore::MAX_PERMITS {
            return Err(ExecutorError::InvalidPoolSize(size));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run every task and join them all. Results arrive in completion order.
    pub async fn run_all(
        &self,
        tasks: Vec<Task>,
        telemetry: &Telemetry,
    ) -> Result<Vec<TaskResult>, ExecutorError> {
        let mut set = JoinSet::new();
        for task in tasks {
            let permits = Arc::clone(&self.permits);
            let telemetry = telemetry.clone();
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| ExecutorError::PoolClosed)?;
                Ok::<_, ExecutorError>(task.run(&telemetry).await)
            });
        }

        let mut results = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(ExecutorError::WorkerLost(e.to_string())),
            }
        }
        Ok(results)
    }
}

/// Dispatches a task list according to the chosen mode.
#[derive(Debug, Clone)]
pub struct Executor {
    pool_size: usize,
}

impl Executor {
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    /// Sequential keeps discovery order; parallel joins every task before returning.
    ///
    /// Task failures are inside the results; only pool failures are errors.
    #[instrument(level = "debug", skip_all, fields(%mode, tasks = tasks.len()))]
    pub async fn run(
        &self,
        mode: ExecMode,
        tasks: Vec<Task>,
        telemetry: &Telemetry,
    ) -> Result<Vec<TaskResult>, ExecutorError> {
        match mode {
            ExecMode::Sequential => {
                let mut results = Vec::with_capacity(tasks.len());
                for task in &tasks {
                    results.push(task.run(telemetry).await);
                }
                Ok(results)
            }
            ExecMode::Parallel => {
                let pool = WorkerPool::new(self.pool_size)?;
                debug!(pool = pool.size(), "running tasks in parallel");
                pool.run_all(tasks, telemetry).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use kq_model::TaskStatus;

    fn tasks(names: &[&'static str]) -> Vec<Task> {
        names
            .iter()
            .map(|n| Task::from_fn(*n, || async { Ok(()) }))
            .collect()
    }

    #[tokio::test]
    async fn sequential_preserves_order() {
        let exec = Executor::new(4);
        let results = exec
            .run(ExecMode::Sequential, tasks(&["c", "a", "b"]), &Telemetry::default())
            .await
            .unwrap();
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn parallel_returns_every_task_once() {
        let exec = Executor::new(2);
        let input = ["a", "b", "c", "d", "e"];
        let results = exec
            .run(ExecMode::Parallel, tasks(&input), &Telemetry::default())
            .await
            .unwrap();

        let got: BTreeSet<_> = results.iter().map(|r| r.name.as_str()).collect();
        let want: BTreeSet<_> = input.into_iter().collect();
        assert_eq!(results.len(), input.len());
        assert_eq!(got, want);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_respects_pool_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let list: Vec<Task> = (0..8)
            .map(|i| {
                let running = running.clone();
                let peak = peak.clone();
                Task::from_fn(format!("t{i}"), move || {
                    let running = running.clone();
                    let peak = peak.clone();
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
            })
            .collect();

        Executor::new(2)
            .run(ExecMode::Parallel, list, &Telemetry::default())
            .await
            .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let list = vec![
            Task::from_fn("a", || async { Ok(()) }),
            Task::from_fn("b", || async { Err::<(), crate::OperationError>("b broke".into()) }),
            Task::from_fn("c", || async { Ok(()) }),
        ];
        let results = Executor::new(2)
            .run(ExecMode::Sequential, list, &Telemetry::default())
            .await
            .unwrap();

        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![TaskStatus::Ok, TaskStatus::Fail, TaskStatus::Ok]);
    }

    #[tokio::test]
    async fn zero_pool_is_fatal_in_parallel_mode() {
        let err = Executor::new(0)
            .run(ExecMode::Parallel, tasks(&["a"]), &Telemetry::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidPoolSize(0)));
    }

    #[tokio::test]
    async fn empty_list_runs_nothing() {
        let results = Executor::new(4)
            .run(ExecMode::Parallel, Vec::new(), &Telemetry::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
