//! Shared data model for the kq orchestrator, scheduler and their collaborators.
//!
//! Everything in this crate is plain data: cycle reports, task results, admission messages,
//! cluster snapshots and telemetry events. Behaviour lives in `kq-core` and `kq-scheduler`.

mod domain;
pub use domain::*;

mod event;
pub use event::{Event, EventKind};
