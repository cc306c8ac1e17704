pub mod admission;
pub use admission::{Admission, AdmissionNegotiator};
pub mod config;
pub use config::{OrchestratorConfig, default_pool_size};
pub mod discovery;
pub use discovery::{Discovered, DiscoveryError, SkippedProvider, TaskDiscovery, TaskProvider};
pub mod events;
pub use events::{EventSink, Telemetry};
pub mod executor;
pub use executor::{Executor, ExecutorError, WorkerPool};
pub mod hook;
pub use hook::CycleHook;
pub mod metrics;
pub use metrics::{CycleOutcome, MetricsBackend, NoopMetrics};
pub mod orchestrator;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorError};
pub mod report;
pub use report::{ArtifactPaths, ReportAggregator, ReportError, timestamp_now};
pub mod task;
pub use task::{BlockingOperation, FnOperation, Operation, OperationError, Task};
