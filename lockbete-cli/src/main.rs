//! ## lockbete-cli
//! **Operational entrypoint for the honeypot monitor**
//!
//! Serves the dashboard API, follows event streams in a terminal, and
//! seeds demo traffic into the store.

use clap::Parser;
use lockbete_telemetry::logging::EventLogger;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::Tail(args) => commands::run_tail(args).await,
        Commands::Seed(args) => commands::run_seed(args).await,
    }
}
