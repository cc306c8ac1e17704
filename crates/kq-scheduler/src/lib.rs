//! Cluster telemetry: heartbeat drain and snapshot republishing, plus this node's own heartbeat.
//!
//! Both loops run as `taskvisor` tasks restarted on a fixed period.

mod config;
pub use config::{HeartbeatConfig, SchedulerConfig};

mod heartbeat;
pub use heartbeat::{Heartbeat, HeartbeatEmitter};

mod scheduler;
pub use scheduler::Scheduler;

mod supervise;
pub use supervise::{periodic, resident};

mod system;
pub use system::{
    IdSource, NODE_ID_ENV, OsRelease, arch, init_uptime, node_id, os_info, platform,
    uptime_seconds,
};
