use anyhow::anyhow;
use clap::Parser;
use framewatch::cli::{
    compare, fetch, handle_completions, handle_config_init, watch, Cli, Commands, ConfigCommands,
};

/// Handlers report errors as boxed trait objects; flatten them for display.
fn command_error(e: Box<dyn std::error::Error>) -> anyhow::Error {
    anyhow!("{}", e)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fetch(args) => {
            let output = fetch::handle_fetch(&args).await.map_err(command_error)?;
            println!("{}", output);
        }
        Commands::Compare(args) => {
            let output = compare::handle_compare(&args).await.map_err(command_error)?;
            println!("{}", output);
        }
        Commands::Watch(args) => watch::handle_watch(&args).await.map_err(command_error)?,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args).map_err(command_error)?,
        },
        Commands::Completions(args) => handle_completions(&args),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
