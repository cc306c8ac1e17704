//! Task discovery: static seeds plus registered providers.

mod error;
pub use error::DiscoveryError;

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use kq_model::{ErrorKind, Event, EventKind};
use tracing::{debug, warn};

use crate::{Task, Telemetry, task::panic::join_failure};

/// Capability "list my tasks".
///
/// Providers are asked once per cycle; an error skips the provider for that cycle only.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn tasks(&self) -> Result<Vec<Task>, DiscoveryError>;
}

/// Provider that was skipped during a discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedProvider {
    pub provider: String,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Outcome of one discovery pass.
#[derive(Debug, Default)]
pub struct Discovered {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedProvider>,
}

/// Seeds first, then providers in registration order; first registration of a name wins.
#[derive(Default)]
pub struct TaskDiscovery {
    seeds: Vec<Task>,
    providers: Vec<Arc<dyn TaskProvider>>,
    exclusions: HashSet<String>,
}

impl TaskDiscovery {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a seed task; seed names are also excluded from providers.
    pub fn with_seed(mut self, task: Task) -> Self {
        self.seed(task);
        self
    }

    pub fn seed(&mut self, task: Task) {
        self.exclusions.insert(task.name().to_string());
        self.seeds.push(task);
    }

    pub fn with_provider(mut self, provider: Arc<dyn TaskProvider>) -> Self {
        self.register(provider);
        self
    }

    #[inline]
    pub fn register(&mut self, provider: Arc<dyn TaskProvider>) {
        self.providers.push(provider);
    }

    /// Names providers may never contribute.
    pub fn exclude(&mut self, name: impl Into<String>) {
        self.exclusions.insert(name.into());
    }

    /// Build this cycle's task list. Never fails.
    pub async fn discover(&self, telemetry: &Telemetry) -> Discovered {
        let mut out = Discovered::default();
        let mut seen: HashSet<String> = HashSet::new();

        for task in &self.seeds {
            if seen.insert(task.name().to_string()) {
                out.tasks.push(task.clone());
            }
        }

        for provider in &self.providers {
            let name = provider.name().to_string();
            let p = Arc::clone(provider);
            let listed = match tokio::spawn(async move { p.tasks().await }).await {
                Ok(Ok(tasks)) => tasks,
                Ok(Err(e)) => {
                    out.skipped.push(self.skip(&name, e.kind(), e.to_string(), telemetry));
                    continue;
                }
                Err(join) => {
                    let reason = join_failure(join);
                    let skipped = self.skip(&name, ErrorKind::ImportFailure, reason, telemetry);
                    out.skipped.push(skipped);
                    continue;
                }
            };

            for task in listed {
                if self.exclusions.contains(task.name()) {
                    debug!(provider = %name, task = task.name(), "excluded task ignored");
                    continue;
                }
                if !seen.insert(task.name().to_string()) {
                    debug!(provider = %name, task = task.name(), "duplicate task ignored");
                    continue;
                }
                out.tasks.push(task);
            }
        }
        out
    }

    fn skip(
        &self,
        provider: &str,
        kind: ErrorKind,
        reason: String,
        telemetry: &Telemetry,
    ) -> SkippedProvider {
        warn!(provider, error_kind = kind.as_str(), %reason, "task provider skipped");
        telemetry.emit(
            Event::new(EventKind::ProviderSkipped)
                .with_task(provider)
                .with_reason(reason.clone()),
        );
        SkippedProvider {
            provider: provider.to_string(),
            kind,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::recording;

    struct Static {
        name: &'static str,
        tasks: Vec<&'static str>,
    }

    #[async_trait]
    impl TaskProvider for Static {
        fn name(&self) -> &str {
            self.name
        }

        async fn tasks(&self) -> Result<Vec<Task>, DiscoveryError> {
            Ok(self
                .tasks
                .iter()
                .map(|n| Task::from_fn(*n, || async { Ok(()) }))
                .collect())
        }
    }

    struct Broken;

    #[async_trait]
    impl TaskProvider for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn tasks(&self) -> Result<Vec<Task>, DiscoveryError> {
            Err(DiscoveryError::Unavailable("no such module".into()))
        }
    }

    struct Panicky;

    #[async_trait]
    impl TaskProvider for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn tasks(&self) -> Result<Vec<Task>, DiscoveryError> {
            panic!("import exploded")
        }
    }

    fn names(d: &Discovered) -> Vec<&str> {
        d.tasks.iter().map(|t| t.name()).collect()
    }

    #[tokio::test]
    async fn seeds_then_providers_first_wins() {
        let discovery = TaskDiscovery::new()
            .with_seed(Task::from_fn("sanity", || async { Ok(()) }))
            .with_seed(Task::from_fn("collector", || async { Ok(()) }))
            .with_provider(Arc::new(Static {
                name: "a",
                tasks: vec!["sanity", "builder", "scanner"],
            }))
            .with_provider(Arc::new(Static {
                name: "b",
                tasks: vec!["builder", "hunter"],
            }));

        let found = discovery.discover(&Telemetry::default()).await;
        assert_eq!(names(&found), vec!["sanity", "collector", "builder", "scanner", "hunter"]);
        assert!(found.skipped.is_empty());
    }

    #[tokio::test]
    async fn explicit_exclusions_apply_to_providers() {
        let mut discovery = TaskDiscovery::new().with_provider(Arc::new(Static {
            name: "a",
            tasks: vec!["orchestrator", "builder"],
        }));
        discovery.exclude("orchestrator");

        let found = discovery.discover(&Telemetry::default()).await;
        assert_eq!(names(&found), vec!["builder"]);
    }

    #[tokio::test]
    async fn failing_providers_are_skipped() {
        let (recorder, telemetry) = recording();
        let discovery = TaskDiscovery::new()
            .with_provider(Arc::new(Broken))
            .with_provider(Arc::new(Panicky))
            .with_provider(Arc::new(Static {
                name: "ok",
                tasks: vec!["builder"],
            }));

        let found = discovery.discover(&telemetry).await;
        assert_eq!(names(&found), vec!["builder"]);
        assert_eq!(found.skipped.len(), 2);
        assert_eq!(found.skipped[0].provider, "broken");
        assert_eq!(found.skipped[0].kind, ErrorKind::ImportFailure);
        assert!(found.skipped[1].reason.contains("import exploded"));
        assert_eq!(
            recorder.kinds(),
            vec![EventKind::ProviderSkipped, EventKind::ProviderSkipped]
        );
    }

    #[tokio::test]
    async fn empty_discovery_is_empty() {
        let found = TaskDiscovery::new().discover(&Telemetry::default()).await;
        assert!(found.tasks.is_empty());
    }
}
