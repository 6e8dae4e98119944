//! Glidepath CLI - account sync service
//!
//! Usage:
//!   glidepath serve --port 3000      Start web server
//!   glidepath sync --user u1         Refresh accounts and transactions
//!   glidepath status --user u1       Show sync status
//!   glidepath summary --user u1      Show spending summary

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth, cli.no_encrypt).await,
        Commands::Sync {
            user,
            accounts,
            transactions,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let aggregator = commands::aggregator_from_env()?;
            commands::cmd_sync(&db, aggregator, &user, accounts, transactions).await
        }
        Commands::Status { user } => commands::cmd_status(&cli.db, &user, cli.no_encrypt),
        Commands::Summary { user, days } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, &user, days)
        }
    }
}
