mod cli;

use anyhow::Result;
use clap::Parser;
use itinera_core::ItineraConfig;

use cli::{Cli, Commands, DocumentCommands, TripCommands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ItineraConfig::from_env();
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    dispatch(cli.command, &config).await
}

async fn dispatch(command: Commands, config: &ItineraConfig) -> Result<()> {
    let storage = cli::open_storage(&config.database_path).await?;

    match command {
        Commands::Trip { command } => match command {
            TripCommands::Create { name } => cli::trip::run_create(&storage, name).await,
            TripCommands::List => cli::trip::run_list(&storage).await,
        },
        Commands::Document { command } => match command {
            DocumentCommands::Add { trip, path } => {
                cli::document::run_add(&storage, trip, &path).await
            }
            DocumentCommands::List { trip } => cli::document::run_list(&storage, trip).await,
        },
        Commands::Process { trip } => cli::process::run(&storage, config, trip).await,
        Commands::Items { trip } => cli::items::run(&storage, trip).await,
        Commands::Places { kind } => cli::places::run(&storage, kind.as_deref()).await,
    }
}
