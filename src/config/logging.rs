//! `[logging]` section

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Modules that accept their own level under `component_levels`.
pub const LOG_COMPONENTS: &[&str] = &["cli", "dashboard", "proxy", "refresh", "source"];

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Where log lines go is fixed (stderr); this only picks their shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [LogFormat::Pretty, LogFormat::Json]
            .into_iter()
            .find(|format| s.eq_ignore_ascii_case(&format.to_string()))
            .ok_or_else(|| format!("unknown log format '{}', expected pretty or json", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for everything not named in `component_levels`
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels, keyed by a name from [`LOG_COMPONENTS`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<BTreeMap<String, String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}

impl LoggingConfig {
    /// `framewatch::<component>=<level>` for each configured component.
    pub fn component_directives(&self) -> impl Iterator<Item = String> + '_ {
        self.component_levels
            .iter()
            .flatten()
            .map(|(component, level)| format!("framewatch::{}={}", component, level))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_level(&self.level) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("unknown level '{}'", self.level),
            ));
        }

        for (component, level) in self.component_levels.iter().flatten() {
            let field = format!("logging.component_levels.{}", component);
            if !LOG_COMPONENTS.contains(&component.as_str()) {
                return Err(ConfigError::invalid(
                    field,
                    format!("unknown component, expected one of {}", LOG_COMPONENTS.join(", ")),
                ));
            }
            if !is_level(level) {
                return Err(ConfigError::invalid(field, format!("unknown level '{}'", level)));
            }
        }

        Ok(())
    }
}

fn is_level(level: &str) -> bool {
    LEVELS.iter().any(|known| level.eq_ignore_ascii_case(known))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_ignores_case() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_component_directives_follow_key_order() {
        let config: LoggingConfig = toml::from_str(
            r#"
            level = "info"
            [component_levels]
            refresh = "trace"
            proxy = "debug"
            "#,
        )
        .unwrap();

        let directives: Vec<String> = config.component_directives().collect();
        assert_eq!(
            directives,
            vec!["framewatch::proxy=debug", "framewatch::refresh=trace"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_component() {
        let config = LoggingConfig {
            component_levels: Some(BTreeMap::from([(
                "routing".to_string(),
                "debug".to_string(),
            )])),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. })
                if field == "logging.component_levels.routing"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
