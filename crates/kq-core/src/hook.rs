use async_trait::async_trait;
use kq_model::CycleReport;

use crate::OperationError;

/// Collaborator invoked after a cycle's report has been persisted.
///
/// Failures are logged and reported as events; they never affect the report.
#[async_trait]
pub trait CycleHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after_cycle(&self, report: &CycleReport) -> Result<(), OperationError>;
}
