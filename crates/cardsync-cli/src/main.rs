//! cardsync CLI - keep flashcards written in plain-text notes in sync with a
//! remote card service.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::decks::run_decks;
use crate::commands::scan::run_scan;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync_command;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        if !error.already_reported() {
            eprintln!("Error: {error}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let args = cli.global_args();

    match cli.command {
        Commands::Sync { json } => run_sync_command(&args, json).await?,
        Commands::Scan { json } => run_scan(&args, json)?,
        Commands::Status { json } => run_status(&args, json)?,
        Commands::Decks { json } => run_decks(&args, json).await?,
        Commands::Config { command } => run_config(command, &args)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let directive = if verbose { "cardsync=debug" } else { "cardsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
