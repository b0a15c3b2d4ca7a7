//! Error types for proxy chain resolution.

use thiserror::Error;

/// Why a single route in the chain failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Request timeout
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// Connection failed (DNS, refused, reset)
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-success HTTP status
    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// Endpoint answered but the body cannot be read
    #[error("opaque response: body not readable")]
    Opaque,

    /// Body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// One failed route, with the URL actually requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub route: String,
    pub url: String,
    pub error: AttemptError,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.route, self.url, self.error)
    }
}

/// Errors returned by the proxy chain.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Every route failed
    #[error("resolution exhausted for {target} after {} attempts", attempts.len())]
    Exhausted {
        target: String,
        attempts: Vec<AttemptFailure>,
    },

    /// The cancellation token fired
    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Cancelled)
    }
}
