//! framewatch - frame pipeline telemetry dashboard
//!
//! This library polls the telemetry endpoints of a distributed frame-capture
//! pipeline through a proxy fallback chain, keeps per-source refresh state
//! with mock-data fallback, and shapes the results for comparison.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod mock;
pub mod proxy;
pub mod refresh;
pub mod report;
pub mod source;
