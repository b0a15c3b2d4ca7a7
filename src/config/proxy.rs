//! Proxy chain configuration

use serde::{Deserialize, Serialize};

/// Public CORS proxies tried in order when a direct request fails.
///
/// `{url}` is replaced by the raw target, `{encoded_url}` by its
/// percent-encoded form.
pub const DEFAULT_REWRITERS: &[&str] = &[
    "https://api.allorigins.win/raw?url={encoded_url}",
    "https://corsproxy.io/?{encoded_url}",
    "https://cors-anywhere.herokuapp.com/{url}",
    "https://proxy.cors.sh/{url}",
    "https://cors-proxy.htmldriven.com/?url={encoded_url}",
];

/// Proxy chain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Try the target directly before any proxy. Disable when running behind
    /// a secure origin that cannot reach plain-HTTP endpoints.
    pub allow_direct: bool,
    /// Ordered proxy URL templates
    pub rewriters: Vec<String>,
    /// Timeout for each individual request in the chain
    pub request_timeout_seconds: u64,
    /// Extra passes over the whole chain after the first one fails
    pub retry_attempts: u32,
    /// Fixed wait between passes
    pub retry_backoff_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_direct: true,
            rewriters: DEFAULT_REWRITERS.iter().map(|s| s.to_string()).collect(),
            request_timeout_seconds: 10,
            retry_attempts: 0,
            retry_backoff_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_config_defaults() {
        let config = ProxyConfig::default();
        assert!(config.allow_direct);
        assert_eq!(config.rewriters.len(), DEFAULT_REWRITERS.len());
        assert_eq!(config.request_timeout_seconds, 10);
        assert_eq!(config.retry_attempts, 0);
    }

    #[test]
    fn test_proxy_config_partial_toml() {
        let config: ProxyConfig = toml::from_str("allow_direct = false").unwrap();
        assert!(!config.allow_direct);
        assert_eq!(config.retry_backoff_ms, 1000);
        assert!(!config.rewriters.is_empty());
    }
}
