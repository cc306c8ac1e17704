//! Cycle-level telemetry: task units, admission, artifacts and policy updates.
//!
//! Supervisor lifecycle events (restarts, backoff, shutdown) travel through
//! `taskvisor::Subscribe`; this module only carries what happens inside one cycle.

use std::sync::Arc;

use kq_model::Event;

/// Synchronous receiver of cycle events.
///
/// Called inline on the cycle's control flow, so implementations must not block.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

/// Cheap-to-clone handle delivering each event to every sink, in registration order.
#[derive(Clone, Default)]
pub struct Telemetry {
    sinks: Arc<[Arc<dyn EventSink>]>,
}

impl Telemetry {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self {
            sinks: sinks.into(),
        }
    }

    pub fn emit(&self, event: Event) {
        for sink in self.sinks.iter() {
            sink.record(&event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
