use async_trait::async_trait;
use kq_core::EventSink;

use crate::subscriber::{supervision::log_job_event, view::log_event};

/// Writes cycle events and supervisor job events to the tracing log.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for Journal {
    fn record(&self, event: &kq_model::Event) {
        log_event(event);
    }
}

#[async_trait]
impl taskvisor::Subscribe for Journal {
    async fn on_event(&self, event: &taskvisor::Event) {
        log_job_event(event);
    }

    fn name(&self) -> &'static str {
        "journal"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}
