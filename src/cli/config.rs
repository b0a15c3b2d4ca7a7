//! Config command handlers

use crate::cli::ConfigInitArgs;
use std::fs;

/// Annotated configuration holding every default value.
pub const EXAMPLE_CONFIG: &str = include_str!("../../framewatch.example.toml");

/// Handle `framewatch config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit the [sources.*] endpoints to point framewatch at your servers.");

    Ok(())
}
