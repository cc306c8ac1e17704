use std::borrow::Borrow;

use kq_model::{Event, EventKind};
use tracing::{debug, info, trace, warn};

pub trait View {
    fn as_task(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn runtime(&self) -> f64;
    fn mode(&self) -> &str;
    fn value(&self) -> f64;
    fn kind(&self) -> EventKind;
}

impl<T> View for T
where
    T: Borrow<Event>,
{
    #[inline]
    fn as_task(&self) -> &str {
        self.borrow().task.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn runtime(&self) -> f64 {
        self.borrow().runtime_seconds.unwrap_or(0.0)
    }
    #[inline]
    fn mode(&self) -> &str {
        self.borrow().mode.map(|m| m.as_str()).unwrap_or("unknown")
    }
    #[inline]
    fn value(&self) -> f64 {
        self.borrow().value.unwrap_or(0.0)
    }
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // cycle
        EventKind::CycleStarted => "cycle started",
        EventKind::CycleFinished => "cycle finished (report persisted)",
        EventKind::CycleDeferred => "cycle deferred by admission peer",
        EventKind::CycleSignal => "cycle start signal received",

        // task unit
        EventKind::TaskStarting => "task is starting",
        EventKind::TaskFinished => "task finished",
        EventKind::TaskFailed => "task failed (isolated; cycle continues)",

        // collaborators
        EventKind::ProviderSkipped => "task provider skipped for this cycle",
        EventKind::ArtifactInvalid => "sibling artifact could not be parsed",
        EventKind::SyncFailed => "sync peer did not answer",
        EventKind::HookFailed => "post-cycle hook failed",

        // policy
        EventKind::PolicyUpdated => "policy updated with cycle reward",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // cycle
        EventKind::CycleStarted => info!(mode = e.mode(), "{msg}"),
        EventKind::CycleFinished => info!(
            mode = e.mode(),
            total_runtime_seconds = e.runtime(),
            error_count = e.value(),
            "{msg}"
        ),
        EventKind::CycleDeferred => warn!(mode = e.mode(), reason = e.as_reason(), "{msg}"),
        EventKind::CycleSignal => debug!(topic = e.as_reason(), "{msg}"),

        // task unit
        EventKind::TaskStarting => debug!(task = e.as_task(), "{msg}"),
        EventKind::TaskFinished => {
            debug!(task = e.as_task(), runtime_seconds = e.runtime(), "{msg}")
        }
        EventKind::TaskFailed => warn!(
            task = e.as_task(),
            runtime_seconds = e.runtime(),
            reason = e.as_reason(),
            "{msg}"
        ),

        // collaborators
        EventKind::ProviderSkipped => {
            warn!(provider = e.as_task(), reason = e.as_reason(), "{msg}")
        }
        EventKind::ArtifactInvalid => {
            warn!(artifact = e.as_task(), reason = e.as_reason(), "{msg}")
        }
        EventKind::SyncFailed => trace!(reason = e.as_reason(), "{msg}"),
        EventKind::HookFailed => {
            warn!(hook = e.as_task(), reason = e.as_reason(), "{msg}")
        }

        // policy
        EventKind::PolicyUpdated => debug!(reward = e.value(), "{msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kq_model::ExecMode;

    #[test]
    fn view_defaults_for_missing_fields() {
        let ev = Event::new(EventKind::TaskFailed);
        assert_eq!(ev.as_task(), "unknown");
        assert_eq!(ev.as_reason(), "unknown");
        assert_eq!(ev.runtime(), 0.0);
        assert_eq!(ev.mode(), "unknown");

        let ev = Event::new(EventKind::CycleStarted).with_mode(ExecMode::Parallel);
        assert_eq!((&ev).mode(), "parallel");
    }

    #[test]
    fn every_kind_has_a_message() {
        for kind in [
            EventKind::CycleStarted,
            EventKind::CycleFinished,
            EventKind::CycleDeferred,
            EventKind::CycleSignal,
            EventKind::TaskStarting,
            EventKind::TaskFinished,
            EventKind::TaskFailed,
            EventKind::ProviderSkipped,
            EventKind::ArtifactInvalid,
            EventKind::SyncFailed,
            EventKind::HookFailed,
            EventKind::PolicyUpdated,
        ] {
            assert!(!message_for(kind).is_empty());
            log_event(Event::new(kind));
        }
    }
}
