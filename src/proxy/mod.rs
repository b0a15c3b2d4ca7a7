//! Proxy chain resolution.
//!
//! Telemetry endpoints are plain-HTTP hosts that often cannot be reached
//! directly. The [`ProxyChain`] tries the target directly, then walks an
//! ordered list of CORS-proxy rewriters until one returns a usable body.
//! Cancellation short-circuits the chain at any point.

mod error;
mod rewriter;

pub use error::*;
pub use rewriter::ProxyRewriter;

use crate::config::ProxyConfig;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Build the shared HTTP client used by every chain.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("framewatch/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Text,
}

#[derive(Debug)]
enum Payload {
    Json(serde_json::Value),
    Text(String),
}

/// Ordered list of routes to a target: direct, proxies, then an optional
/// opaque probe.
#[derive(Debug, Clone)]
pub struct ProxyChain {
    client: reqwest::Client,
    allow_direct: bool,
    rewriters: Vec<ProxyRewriter>,
    opaque_probe: bool,
    request_timeout: Duration,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl ProxyChain {
    /// Create a chain from the `[proxy]` configuration section.
    pub fn new(client: reqwest::Client, config: &ProxyConfig) -> Self {
        Self {
            client,
            allow_direct: config.allow_direct,
            rewriters: config.rewriters.iter().map(ProxyRewriter::new).collect(),
            opaque_probe: false,
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            retry_attempts: config.retry_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Create a chain that only issues direct requests.
    pub fn direct(client: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            client,
            allow_direct: true,
            rewriters: Vec::new(),
            opaque_probe: false,
            request_timeout,
            retry_attempts: 0,
            retry_backoff: Duration::from_millis(1000),
        }
    }

    /// Drop the proxy rewriters, keeping direct access only.
    pub fn without_proxies(mut self) -> Self {
        self.rewriters.clear();
        self
    }

    pub fn with_opaque_probe(mut self, enabled: bool) -> Self {
        self.opaque_probe = enabled;
        self
    }

    pub fn with_rewriters(mut self, rewriters: Vec<ProxyRewriter>) -> Self {
        self.rewriters = rewriters;
        self
    }

    pub fn with_direct(mut self, allow_direct: bool) -> Self {
        self.allow_direct = allow_direct;
        self
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }

    /// Resolve `target` to its parsed JSON body.
    pub async fn resolve_json(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, ResolveError> {
        match self.resolve(target, cancel, BodyKind::Json).await? {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) => {
                serde_json::from_str(&text).map_err(|e| ResolveError::Exhausted {
                    target: target.to_string(),
                    attempts: vec![AttemptFailure {
                        route: "decode".to_string(),
                        url: target.to_string(),
                        error: AttemptError::Decode(e.to_string()),
                    }],
                })
            }
        }
    }

    /// Resolve `target` to its raw text body (CSV exports).
    pub async fn resolve_text(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ResolveError> {
        match self.resolve(target, cancel, BodyKind::Text).await? {
            Payload::Text(text) => Ok(text),
            Payload::Json(value) => Ok(value.to_string()),
        }
    }

    async fn resolve(
        &self,
        target: &str,
        cancel: &CancellationToken,
        kind: BodyKind,
    ) -> Result<Payload, ResolveError> {
        let mut attempts = Vec::new();

        for pass in 0..=self.retry_attempts {
            if pass > 0 {
                tracing::debug!(
                    target_url = target,
                    pass,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "Retrying proxy chain after backoff"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                    _ = tokio::time::sleep(self.retry_backoff) => {}
                }
            }

            if let Some(payload) = self.run_pass(target, cancel, kind, &mut attempts).await? {
                return Ok(payload);
            }
        }

        if self.opaque_probe {
            let failure = self.probe(target, cancel).await?;
            attempts.push(failure);
        }

        tracing::warn!(
            target_url = target,
            attempts = attempts.len(),
            "All routes failed"
        );

        Err(ResolveError::Exhausted {
            target: target.to_string(),
            attempts,
        })
    }

    fn routes(&self, target: &str) -> Vec<(&'static str, String, String)> {
        let mut routes = Vec::with_capacity(self.rewriters.len() + 1);
        if self.allow_direct {
            routes.push(("direct", "direct".to_string(), target.to_string()));
        }
        let total = self.rewriters.len();
        for (i, rewriter) in self.rewriters.iter().enumerate() {
            routes.push((
                "proxy",
                format!("proxy {}/{} ({})", i + 1, total, rewriter.label()),
                rewriter.rewrite(target),
            ));
        }
        routes
    }

    async fn run_pass(
        &self,
        target: &str,
        cancel: &CancellationToken,
        kind: BodyKind,
        attempts: &mut Vec<AttemptFailure>,
    ) -> Result<Option<Payload>, ResolveError> {
        for (route_kind, route, url) in self.routes(target) {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            tracing::debug!(target_url = target, route = %route, url = %url, "Attempting route");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                outcome = self.attempt(&url, kind) => outcome,
            };

            match outcome {
                Ok(payload) => {
                    metrics::counter!("framewatch_proxy_attempts_total",
                        "route" => route_kind,
                        "outcome" => "success"
                    )
                    .increment(1);
                    tracing::debug!(target_url = target, route = %route, "Route succeeded");
                    return Ok(Some(payload));
                }
                Err(error) => {
                    metrics::counter!("framewatch_proxy_attempts_total",
                        "route" => route_kind,
                        "outcome" => "failure"
                    )
                    .increment(1);
                    tracing::debug!(
                        target_url = target,
                        route = %route,
                        error = %error,
                        "Route failed"
                    );
                    attempts.push(AttemptFailure { route, url, error });
                }
            }
        }

        Ok(None)
    }

    async fn attempt(&self, url: &str, kind: BodyKind) -> Result<Payload, AttemptError> {
        let accept = match kind {
            BodyKind::Json => "application/json",
            BodyKind::Text => "text/csv, text/plain, */*",
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        if !response.status().is_success() {
            return Err(AttemptError::HttpError(response.status().as_u16()));
        }

        match kind {
            BodyKind::Json => response
                .json::<serde_json::Value>()
                .await
                .map(Payload::Json)
                .map_err(|e| self.classify_body_error(e)),
            BodyKind::Text => response
                .text()
                .await
                .map(Payload::Text)
                .map_err(|e| self.classify_body_error(e)),
        }
    }

    /// Last-resort request that may reach the endpoint but never yields a
    /// readable body. Always recorded as a failure.
    async fn probe(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<AttemptFailure, ResolveError> {
        let url = self
            .rewriters
            .first()
            .map(|r| r.rewrite(target))
            .unwrap_or_else(|| target.to_string());

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            sent = self
                .client
                .head(&url)
                .header("X-Requested-With", "XMLHttpRequest")
                .timeout(self.request_timeout)
                .send() => sent,
        };

        let error = match sent {
            Ok(response) => {
                tracing::debug!(
                    target_url = target,
                    status = response.status().as_u16(),
                    "Endpoint reachable but response is opaque"
                );
                AttemptError::Opaque
            }
            Err(e) => self.classify_error(e),
        };
        metrics::counter!("framewatch_proxy_attempts_total",
            "route" => "probe",
            "outcome" => "failure"
        )
        .increment(1);

        Ok(AttemptFailure {
            route: "opaque probe".to_string(),
            url,
            error,
        })
    }

    fn classify_error(&self, e: reqwest::Error) -> AttemptError {
        if e.is_timeout() {
            AttemptError::Timeout(self.request_timeout.as_secs())
        } else {
            AttemptError::ConnectionFailed(e.to_string())
        }
    }

    fn classify_body_error(&self, e: reqwest::Error) -> AttemptError {
        if e.is_timeout() {
            AttemptError::Timeout(self.request_timeout.as_secs())
        } else {
            AttemptError::Decode(e.to_string())
        }
    }
}
