//! Configuration module for framewatch
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`FRAMEWATCH_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use framewatch::config::DashboardConfig;
//! use framewatch::source::SourceKind;
//!
//! let toml = r#"
//! [sources.cleaning]
//! cooldown_seconds = 5
//! "#;
//! let config: DashboardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.sources.settings(SourceKind::Cleaning).cooldown_seconds, 5);
//! ```

pub mod error;
pub mod logging;
pub mod proxy;
pub mod source;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig, LOG_COMPONENTS};
pub use proxy::{ProxyConfig, DEFAULT_REWRITERS};
pub use source::{SourceConfig, SourceSettings, SourcesConfig, ONBOARDING_SHEET_URL};

use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    /// Proxy chain shared by all sources
    pub proxy: ProxyConfig,
    /// Per-source endpoint and refresh settings
    pub sources: SourcesConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `FRAMEWATCH_*` overrides read through `lookup`.
    pub(crate) fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup("FRAMEWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("FRAMEWATCH_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        if let Some(direct) = lookup("FRAMEWATCH_ALLOW_DIRECT") {
            match direct.to_lowercase().as_str() {
                "true" => self.proxy.allow_direct = true,
                "false" => self.proxy.allow_direct = false,
                _ => {}
            }
        }
        if let Some(retries) = lookup("FRAMEWATCH_RETRY_ATTEMPTS") {
            if let Ok(r) = retries.parse() {
                self.proxy.retry_attempts = r;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "proxy.request_timeout_seconds",
                "timeout must be non-zero",
            ));
        }

        for (i, rewriter) in self.proxy.rewriters.iter().enumerate() {
            if !rewriter.contains("{url}") && !rewriter.contains("{encoded_url}") {
                return Err(ConfigError::invalid(
                    format!("proxy.rewriters[{}]", i),
                    "template must contain {url} or {encoded_url}",
                ));
            }
        }

        self.logging.validate()?;

        for kind in SourceKind::ALL {
            let settings = self.sources.settings(kind);
            if !settings.enabled {
                continue;
            }
            if settings.endpoints.is_empty() {
                return Err(ConfigError::invalid(
                    format!("sources.{}.endpoints", kind),
                    "at least one endpoint is required",
                ));
            }
            for (i, endpoint) in settings.endpoints.iter().enumerate() {
                if let Err(e) = url::Url::parse(endpoint) {
                    return Err(ConfigError::invalid(
                        format!("sources.{}.endpoints[{}]", kind, i),
                        format!("invalid URL '{}': {}", endpoint, e),
                    ));
                }
            }
            let has_proxy_route = settings.use_proxies && !self.proxy.rewriters.is_empty();
            if !self.proxy.allow_direct && !has_proxy_route {
                return Err(ConfigError::invalid(
                    format!("sources.{}.use_proxies", kind),
                    "direct requests are disabled and the source has no proxy to go through",
                ));
            }
        }

        Ok(())
    }
}
