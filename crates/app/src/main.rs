use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farm_helper::error::AppError;
use farm_helper::settings::SettingsStore;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "farm-helper", about = "Ask farming questions from the terminal")]
struct Args {
    /// Settings file to use instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Start a chat session (default).
    Run,
    /// Write the current settings to the settings file.
    InitConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let store = match args.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };

    match args.command.unwrap_or(CliCommand::Run) {
        CliCommand::InitConfig => {
            farm_helper::init_config(&store)?;
            println!("{}", store.config_path().display());
            Ok(())
        }
        CliCommand::Run => farm_helper::run(store.settings()).await,
    }
}
