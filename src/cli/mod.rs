//! CLI module for framewatch
//!
//! Command-line interface definitions and handlers for the telemetry dashboard.
//!
//! # Commands
//!
//! - `fetch` - Refresh one source and print its data
//! - `compare` - Compare the frame pipelines side by side
//! - `watch` - Refresh sources on an interval until interrupted
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Show the cleaning stage as a table
//! framewatch fetch cleaning
//!
//! # Compare pipelines as JSON
//! framewatch compare --json
//!
//! # Generate shell completions
//! framewatch completions bash > ~/.bash_completion.d/framewatch
//! ```

pub mod compare;
pub mod completions;
pub mod config;
pub mod fetch;
pub mod output;
pub mod watch;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::DashboardConfig;
use crate::source::SourceKind;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// framewatch - frame pipeline telemetry dashboard
#[derive(Parser, Debug)]
#[command(
    name = "framewatch",
    version,
    about = "Poll frame pipeline telemetry endpoints and compare the stages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh one source and print its data
    Fetch(FetchArgs),
    /// Compare flask, capturing and cleaning stages per location
    Compare(CompareArgs),
    /// Refresh sources on an interval
    Watch(WatchArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Source to fetch
    #[arg(value_enum)]
    pub source: SourceKind,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Report failures instead of substituting mock data
    #[arg(long)]
    pub no_mock: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "framewatch.toml")]
    pub config: PathBuf,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FRAMEWATCH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "framewatch.toml")]
    pub config: PathBuf,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FRAMEWATCH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between refresh cycles
    #[arg(short, long, default_value = "30")]
    pub interval: u64,

    /// Only refresh this source (repeatable); defaults to every enabled source
    #[arg(short, long, value_enum)]
    pub source: Vec<SourceKind>,

    /// Stop after this many cycles
    #[arg(long)]
    pub count: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, default_value = "framewatch.toml")]
    pub config: PathBuf,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FRAMEWATCH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "framewatch.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load configuration: defaults, then the file if it exists, then
/// `FRAMEWATCH_*` env vars, then the CLI log level.
pub fn load_config(
    path: &Path,
    log_level: Option<&str>,
) -> Result<DashboardConfig, Box<dyn std::error::Error>> {
    let mut config = if path.exists() {
        DashboardConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        DashboardConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(level) = log_level {
        config.logging.level = level.to_string();
    }

    Ok(config)
}

/// Install tracing for a command. A second install in the same process is
/// not an error worth failing the command for.
pub(crate) fn init_command_tracing(config: &DashboardConfig) {
    if let Err(e) = crate::logging::init_tracing(&config.logging) {
        tracing::debug!(error = %e, "Tracing already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_fetch_defaults() {
        let cli = Cli::try_parse_from(["framewatch", "fetch", "cleaning"]).unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.source, SourceKind::Cleaning);
                assert_eq!(args.config, PathBuf::from("framewatch.toml"));
                assert!(!args.json);
                assert!(!args.no_mock);
            }
            _ => panic!("Expected Fetch command"),
        }
    }

    #[test]
    fn test_cli_parse_fetch_kebab_case_source() {
        let cli =
            Cli::try_parse_from(["framewatch", "fetch", "fault-timeline", "--json"]).unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.source, SourceKind::FaultTimeline);
                assert!(args.json);
            }
            _ => panic!("Expected Fetch command"),
        }
    }

    #[test]
    fn test_cli_parse_fetch_rejects_unknown_source() {
        assert!(Cli::try_parse_from(["framewatch", "fetch", "weather"]).is_err());
    }

    #[test]
    fn test_cli_parse_compare_with_config() {
        let cli = Cli::try_parse_from(["framewatch", "compare", "-c", "custom.toml"]).unwrap();
        match cli.command {
            Commands::Compare(args) => assert_eq!(args.config, PathBuf::from("custom.toml")),
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_cli_parse_watch_sources() {
        let cli = Cli::try_parse_from([
            "framewatch",
            "watch",
            "-i",
            "5",
            "-s",
            "balena",
            "-s",
            "fault",
            "--count",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.interval, 5);
                assert_eq!(args.source, vec![SourceKind::Balena, SourceKind::Fault]);
                assert_eq!(args.count, Some(2));
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["framewatch", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init(args)) => assert!(args.force),
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml"), Some("debug")).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.proxy.allow_direct);
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framewatch.toml");
        std::fs::write(&path, "[proxy]\nretry_attempts = 2\n").unwrap();

        let config = load_config(&path, None).unwrap();
        assert_eq!(config.proxy.retry_attempts, 2);
    }

    #[test]
    fn test_load_config_invalid_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framewatch.toml");
        std::fs::write(&path, "[proxy\n").unwrap();

        assert!(load_config(&path, None).is_err());
    }
}
