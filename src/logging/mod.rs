//! Structured logging setup
//!
//! Builds the tracing subscriber from [`LoggingConfig`] and hands out the
//! correlation IDs attached to every refresh span.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use framewatch::config::LoggingConfig;
/// use framewatch::logging::build_filter_directives;
/// use std::collections::BTreeMap;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     component_levels: Some(BTreeMap::from([("proxy".to_string(), "debug".to_string())])),
///     ..Default::default()
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,framewatch::proxy=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    std::iter::once(config.level.clone())
        .chain(config.component_directives())
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Generate a new refresh ID using UUID v4
///
/// Every `refresh()` call gets one, so all attempts it makes can be
/// correlated in the logs.
pub fn generate_refresh_id() -> String {
    Uuid::new_v4().to_string()
}
