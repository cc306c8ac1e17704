mod view;
pub use view::{View, log_event, message_for};

mod supervision;
pub use supervision::log_job_event;

mod journal;
pub use journal::Journal;
