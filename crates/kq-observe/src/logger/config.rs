use std::io::IsTerminal;

use serde::Deserialize;

use crate::logger::format::LoggerFormat;

/// Replaces the configured filter when set to a non-empty value.
pub const LOG_ENV: &str = "KQ_LOG";

/// Filter used when neither the config file nor `KQ_LOG` sets one.
/// Supervisor and HTTP client chatter stays at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "info,taskvisor=warn,hyper=warn,reqwest=warn";

pub const DEFAULT_SYSLOG_IDENTIFIER: &str = "kq-agentd";

/// `logger` section of the agent config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `info,kq_core=debug`.
    pub filter: String,
    pub with_targets: bool,
    /// ANSI colours for text output; follows stdout when unset.
    pub color: Option<bool>,
    /// `SYSLOG_IDENTIFIER` for journald records.
    pub syslog_identifier: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            filter: DEFAULT_DIRECTIVES.to_string(),
            with_targets: true,
            color: None,
            syslog_identifier: DEFAULT_SYSLOG_IDENTIFIER.to_string(),
        }
    }
}

impl LoggerConfig {
    /// Apply `KQ_LOG` from the process environment.
    pub fn with_env(self) -> Self {
        self.with_filter_override(std::env::var(LOG_ENV).ok())
    }

    pub fn with_filter_override(mut self, directives: Option<String>) -> Self {
        if let Some(directives) = directives
            && !directives.trim().is_empty()
        {
            self.filter = directives;
        }
        self
    }

    pub(crate) fn ansi(&self) -> bool {
        self.color.unwrap_or_else(|| std::io::stdout().is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_kq_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"format": "json"}"#).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.filter, DEFAULT_DIRECTIVES);
        assert_eq!(cfg.syslog_identifier, "kq-agentd");
        assert!(cfg.with_targets);
        assert!(cfg.color.is_none());
    }

    #[test]
    fn unknown_format_fails_the_section() {
        let parsed = serde_json::from_str::<LoggerConfig>(r#"{"format": "xml"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn blank_override_keeps_configured_filter() {
        let cfg = LoggerConfig {
            filter: "warn".into(),
            ..LoggerConfig::default()
        };
        let cfg = cfg.with_filter_override(Some("  ".into()));
        assert_eq!(cfg.filter, "warn");

        let cfg = cfg.with_filter_override(Some("kq_core=trace".into()));
        assert_eq!(cfg.filter, "kq_core=trace");
    }

    #[test]
    fn explicit_color_wins() {
        let cfg = LoggerConfig {
            color: Some(false),
            ..LoggerConfig::default()
        };
        assert!(!cfg.ansi());
    }
}
