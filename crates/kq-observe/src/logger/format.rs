use serde::Deserialize;

/// Where log records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    /// Human-readable lines on stdout.
    #[default]
    Text,
    /// One JSON object per line with event fields flattened to the top level.
    Json,
    /// systemd journal under the configured syslog identifier.
    #[serde(alias = "journal")]
    Journald,
}

impl LoggerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        }
    }

    /// Journald needs Linux and the `journald` feature.
    pub fn is_available(&self) -> bool {
        match self {
            LoggerFormat::Journald => cfg!(all(target_os = "linux", feature = "journald")),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lowercase_names_and_journal_alias() {
        let parse = |s: &str| serde_json::from_str::<LoggerFormat>(s);
        assert_eq!(parse("\"json\"").unwrap(), LoggerFormat::Json);
        assert_eq!(parse("\"journal\"").unwrap(), LoggerFormat::Journald);
        assert!(parse("\"yaml\"").is_err());
        assert!(parse("\"JSON\"").is_err());
    }

    #[test]
    fn journald_availability_follows_the_build() {
        assert!(LoggerFormat::Text.is_available());
        assert!(LoggerFormat::Json.is_available());
        assert_eq!(
            LoggerFormat::Journald.is_available(),
            cfg!(all(target_os = "linux", feature = "journald"))
        );
    }
}
