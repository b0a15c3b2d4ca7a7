//! Error types for per-source fetchers.

use crate::proxy::ResolveError;
use thiserror::Error;

/// Errors that can occur while fetching a telemetry source.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Payload is missing required fields or has the wrong shape
    #[error("validation failed for {source_name}: {message}")]
    Validation {
        source_name: String,
        message: String,
    },

    /// Every endpoint and proxy combination failed
    #[error("all sources exhausted for {source_name}: {}", failures.join("; "))]
    Exhausted {
        source_name: String,
        failures: Vec<String>,
    },

    /// Whole-fetch deadline elapsed
    #[error("fetch timed out after {0}s")]
    Timeout(u64),

    /// Superseded or shut down; never surfaced to the user
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub(crate) fn validation(source_name: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn exhausted(source_name: &str, failures: Vec<String>) -> Self {
        Self::Exhausted {
            source_name: source_name.to_string(),
            failures,
        }
    }

    /// Convert a chain failure into a fetch failure for `source_name`.
    pub(crate) fn from_resolve(source_name: &str, err: ResolveError) -> Self {
        match err {
            ResolveError::Cancelled => Self::Cancelled,
            ResolveError::Exhausted { target, attempts } => {
                let failures = if attempts.is_empty() {
                    vec![format!("no routes available for {}", target)]
                } else {
                    attempts.iter().map(ToString::to_string).collect()
                };
                Self::exhausted(source_name, failures)
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
