use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter `{directives}`: {reason}")]
    InvalidFilter { directives: String, reason: String },

    #[error("log format `{0}` is not compiled into this build")]
    FormatUnavailable(&'static str),

    #[error("journald connection failed: {0}")]
    Journald(String),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}
