use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use super::panic::join_failure;

/// Error type returned by task operations.
pub type OperationError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument unit of work.
///
/// Implementations must be cheap to share; the same operation may be invoked once per cycle.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn call(&self) -> Result<(), OperationError>;

    /// Whether dropping the `call` future stops the work.
    ///
    /// Blocking closures keep running once started, so a timed-out run has to wait for them.
    fn abortable(&self) -> bool {
        true
    }
}

/// Operation backed by an async closure.
pub struct FnOperation<F>(F);

impl<F> FnOperation<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
{
    async fn call(&self) -> Result<(), OperationError> {
        (self.0)().await
    }
}

/// Operation backed by a blocking closure, run on tokio's blocking pool.
pub struct BlockingOperation<F>(Arc<F>);

impl<F> BlockingOperation<F> {
    pub fn new(f: F) -> Self {
        Self(Arc::new(f))
    }
}

#[async_trait]
impl<F> Operation for BlockingOperation<F>
where
    F: Fn() -> Result<(), OperationError> + Send + Sync + 'static,
{
    async fn call(&self) -> Result<(), OperationError> {
        let f = Arc::clone(&self.0);
        match tokio::task::spawn_blocking(move || f()).await {
            Ok(res) => res,
            Err(e) => Err(join_failure(e).into()),
        }
    }

    fn abortable(&self) -> bool {
        false
    }
}
