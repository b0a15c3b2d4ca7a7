//! Per-source configuration
//!
//! Each `[sources.<name>]` table only overrides the keys it sets; everything
//! else falls back to that source's built-in defaults.

use crate::refresh::Concurrency;
use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Published CSV export of the onboarding tracker sheet.
pub const ONBOARDING_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1kz4VPEAZWKR7M8GDgZ9aHz3ig7LX-vSi35kuNCDU9PM/export?format=csv&gid=1497227990";

/// Optional overrides for a single source, as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_proxies: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opaque_probe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_capacity: Option<usize>,
}

/// Fully resolved settings for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSettings {
    pub enabled: bool,
    pub endpoints: Vec<String>,
    /// Route through the proxy chain rewriters after the direct attempt
    pub use_proxies: bool,
    /// Finish an exhausted chain with an opaque reachability probe
    pub opaque_probe: bool,
    pub concurrency: Concurrency,
    /// 0 disables the cooldown
    pub cooldown_seconds: u64,
    /// Whole-fetch deadline, 0 disables it
    pub timeout_seconds: u64,
    pub mock_fallback: bool,
    /// Samples kept in the refresh history, 0 disables it
    pub history_capacity: usize,
}

impl SourceSettings {
    /// Built-in defaults for a source.
    pub fn defaults_for(kind: SourceKind) -> Self {
        let base = Self {
            enabled: true,
            endpoints: Vec::new(),
            use_proxies: false,
            opaque_probe: false,
            concurrency: Concurrency::Overlap,
            cooldown_seconds: 0,
            timeout_seconds: 0,
            mock_fallback: true,
            history_capacity: 0,
        };

        match kind {
            SourceKind::Fault => Self {
                endpoints: vec!["http://34.93.233.94:5020/get_frame_timestamp_stats".to_string()],
                ..base
            },
            SourceKind::FaultTimeline => Self {
                endpoints: vec!["http://34.93.233.94:5020/get_frame_timestamp_stats".to_string()],
                timeout_seconds: 3,
                history_capacity: 20,
                ..base
            },
            SourceKind::Balena => Self {
                endpoints: vec!["http://34.93.233.94:5020/get_balena_cache_result".to_string()],
                use_proxies: true,
                opaque_probe: true,
                concurrency: Concurrency::Supersede,
                cooldown_seconds: 15,
                ..base
            },
            SourceKind::Cleaning => Self {
                endpoints: vec!["http://35.244.44.28:5020/get_frame_timestamp_stats".to_string()],
                use_proxies: true,
                opaque_probe: true,
                concurrency: Concurrency::Ignore,
                cooldown_seconds: 15,
                timeout_seconds: 30,
                ..base
            },
            SourceKind::Onboarding => Self {
                endpoints: vec![ONBOARDING_SHEET_URL.to_string()],
                concurrency: Concurrency::Ignore,
                ..base
            },
        }
    }

    /// Apply file overrides on top of these settings.
    pub fn with_overrides(mut self, overrides: &SourceConfig) -> Self {
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
        if let Some(ref endpoints) = overrides.endpoints {
            self.endpoints = endpoints.clone();
        }
        if let Some(use_proxies) = overrides.use_proxies {
            self.use_proxies = use_proxies;
        }
        if let Some(opaque_probe) = overrides.opaque_probe {
            self.opaque_probe = opaque_probe;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(cooldown) = overrides.cooldown_seconds {
            self.cooldown_seconds = cooldown;
        }
        if let Some(timeout) = overrides.timeout_seconds {
            self.timeout_seconds = timeout;
        }
        if let Some(mock_fallback) = overrides.mock_fallback {
            self.mock_fallback = mock_fallback;
        }
        if let Some(capacity) = overrides.history_capacity {
            self.history_capacity = capacity;
        }
        self
    }

    pub fn cooldown(&self) -> Option<Duration> {
        (self.cooldown_seconds > 0).then(|| Duration::from_secs(self.cooldown_seconds))
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

/// The `[sources]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub fault: SourceConfig,
    pub fault_timeline: SourceConfig,
    pub balena: SourceConfig,
    pub cleaning: SourceConfig,
    pub onboarding: SourceConfig,
}

impl SourcesConfig {
    fn overrides(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::Fault => &self.fault,
            SourceKind::FaultTimeline => &self.fault_timeline,
            SourceKind::Balena => &self.balena,
            SourceKind::Cleaning => &self.cleaning,
            SourceKind::Onboarding => &self.onboarding,
        }
    }

    /// Mutable overrides for a source, used to layer CLI flags on top.
    pub fn overrides_mut(&mut self, kind: SourceKind) -> &mut SourceConfig {
        match kind {
            SourceKind::Fault => &mut self.fault,
            SourceKind::FaultTimeline => &mut self.fault_timeline,
            SourceKind::Balena => &mut self.balena,
            SourceKind::Cleaning => &mut self.cleaning,
            SourceKind::Onboarding => &mut self.onboarding,
        }
    }

    /// Resolved settings for a source: defaults, then file overrides.
    pub fn settings(&self, kind: SourceKind) -> SourceSettings {
        SourceSettings::defaults_for(kind).with_overrides(self.overrides(kind))
    }
}
