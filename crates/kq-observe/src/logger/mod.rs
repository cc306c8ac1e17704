//! Process-wide `tracing` setup for kq binaries.
mod config;
mod error;
mod format;
mod init;

pub use config::{DEFAULT_DIRECTIVES, DEFAULT_SYSLOG_IDENTIFIER, LOG_ENV, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use init::init_logger;
