use taskvisor::{Event, EventKind};
use tracing::{debug, error, info, trace, warn};

/// Log a supervisor lifecycle event for one of the agent's jobs.
///
/// Periodic jobs restart on every tick, so routine starts and stops stay below `info`.
pub fn log_job_event(e: &Event) {
    let job = e.task.as_deref().unwrap_or("unknown");
    let reason = e.reason.as_deref().unwrap_or("unknown");
    let attempt = e.attempt.unwrap_or(0);

    match e.kind {
        EventKind::TaskStarting => trace!(job, attempt, "job run starting"),
        EventKind::TaskStopped => trace!(job, "job run finished"),
        EventKind::TaskAdded => debug!(job, "job registered"),
        EventKind::TaskFailed => warn!(job, attempt, reason, "job run failed"),
        EventKind::TimeoutHit => warn!(
            job,
            timeout_ms = e.timeout_ms.unwrap_or(0),
            "job run timed out"
        ),
        EventKind::BackoffScheduled if e.reason.is_some() => debug!(
            job,
            attempt,
            delay_ms = e.delay_ms.unwrap_or(0),
            reason,
            "job retry scheduled"
        ),
        EventKind::BackoffScheduled => trace!(
            job,
            delay_ms = e.delay_ms.unwrap_or(0),
            "next job run scheduled"
        ),
        EventKind::ActorExhausted => info!(job, reason, "job will not be restarted"),
        EventKind::ActorDead => error!(job, reason, "job terminated permanently"),

        EventKind::ShutdownRequested => info!("shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("all jobs stopped within grace"),
        EventKind::GraceExceeded => warn!("jobs still running after shutdown grace"),

        EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
            error!(subscriber = job, reason, "event subscriber lost events")
        }
        _ => trace!(job, kind = ?e.kind, "supervisor event"),
    }
}
