use std::{fmt, future::Future, sync::Arc, time::Duration};

use kq_model::{ErrorKind, Event, EventKind, TaskName, TaskResult};
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::{
    BlockingOperation, FnOperation, Operation, OperationError, panic::join_failure,
};
use crate::Telemetry;

/// Named operation plus an optional time limit.
///
/// Built fresh each cycle by discovery; cloning shares the operation.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    operation: Arc<dyn Operation>,
    timeout: Option<Duration>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, operation: Arc<dyn Operation>) -> Self {
        Self {
            name: name.into(),
            operation,
            timeout: None,
        }
    }

    /// Task from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
    {
        Self::new(name, Arc::new(FnOperation::new(f)))
    }

    /// Task from a blocking closure.
    pub fn blocking<F>(name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn() -> Result<(), OperationError> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(BlockingOperation::new(f)))
    }

    /// Report a `timeout` failure once `limit` elapses.
    ///
    /// Async operations are aborted; blocking ones are joined first, so no work outlives `run`.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the operation once and capture its outcome.
    ///
    /// Never fails: errors, panics and timeouts all become a `fail` result.
    #[instrument(level = "debug", skip_all, fields(task = %self.name))]
    pub async fn run(&self, telemetry: &Telemetry) -> TaskResult {
        telemetry.emit(Event::new(EventKind::TaskStarting).with_task(self.name.clone()));

        let started = Instant::now();
        let op = Arc::clone(&self.operation);
        let mut handle = tokio::spawn(async move { op.call().await });

        let outcome = match self.timeout {
            None => Some((&mut handle).await),
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    if self.operation.abortable() {
                        handle.abort();
                    }
                    let _ = handle.await;
                    None
                }
            },
        };
        let elapsed = started.elapsed().as_secs_f64();

        let result = match outcome {
            Some(Ok(Ok(()))) => TaskResult::ok(self.name.clone(), elapsed),
            Some(Ok(Err(e))) => TaskResult::fail(
                self.name.clone(),
                elapsed,
                ErrorKind::ExecutionFailure,
                e.to_string(),
            ),
            Some(Err(join)) => TaskResult::fail(
                self.name.clone(),
                elapsed,
                ErrorKind::ExecutionFailure,
                join_failure(join),
            ),
            None => TaskResult::fail(
                self.name.clone(),
                elapsed,
                ErrorKind::Timeout,
                format!(
                    "timed out after {}ms",
                    self.timeout.map(|d| d.as_millis()).unwrap_or_default()
                ),
            ),
        };
        debug!(status = result.status.as_str(), runtime = result.runtime_seconds, "task finished");

        let event = match &result.error {
            None => Event::new(EventKind::TaskFinished),
            Some(reason) => Event::new(EventKind::TaskFailed).with_reason(reason.clone()),
        };
        telemetry.emit(event.with_task(self.name.clone()).with_runtime(result.runtime_seconds));

        result
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
