use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    registry::LookupSpan, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Install the global subscriber: one filter, one output layer chosen by `format`.
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    if !cfg.format.is_available() {
        return Err(LoggerError::FormatUnavailable(cfg.format.as_str()));
    }
    let registry = tracing_subscriber::registry().with(parse_filter(&cfg.filter)?);
    match cfg.format {
        LoggerFormat::Text => install(registry.with(text_layer(cfg))),
        LoggerFormat::Json => install(registry.with(json_layer(cfg))),
        LoggerFormat::Journald => install(registry.with(journald_layer(cfg)?)),
    }
}

pub(crate) fn parse_filter(directives: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directives).map_err(|e| LoggerError::InvalidFilter {
        directives: directives.to_string(),
        reason: e.to_string(),
    })
}

fn install<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

/// RFC 3339 in local time; UTC when the offset cannot be read.
fn local_time() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn text_layer<S>(cfg: &LoggerConfig) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_timer(local_time())
        .with_ansi(cfg.ansi())
        .with_target(cfg.with_targets)
}

fn json_layer<S>(cfg: &LoggerConfig) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_timer(local_time())
        .with_target(cfg.with_targets)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer(cfg: &LoggerConfig) -> Result<tracing_journald::Layer, LoggerError> {
    tracing_journald::layer()
        .map(|layer| layer.with_syslog_identifier(cfg.syslog_identifier.clone()))
        .map_err(|e| LoggerError::Journald(e.to_string()))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer(
    _cfg: &LoggerConfig,
) -> Result<tracing_subscriber::layer::Identity, LoggerError> {
    Err(LoggerError::FormatUnavailable(LoggerFormat::Journald.as_str()))
}
