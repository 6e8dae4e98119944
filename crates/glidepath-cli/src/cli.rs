//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Glidepath - financial-account synchronization service
#[derive(Parser)]
#[command(name = "glidepath")]
#[command(about = "Sync linked financial accounts and spending", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "glidepath.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set GLIDEPATH_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a
        /// network. By default, the server requires the identity header
        /// injected by the upstream gateway.
        #[arg(long)]
        no_auth: bool,
    },

    /// Refresh accounts and transactions for one user
    Sync {
        /// User to refresh
        #[arg(long)]
        user: String,

        /// Only refresh account balances
        #[arg(long)]
        accounts: bool,

        /// Only refresh transactions
        #[arg(long)]
        transactions: bool,
    },

    /// Show database and per-item sync status for a user
    Status {
        /// User to inspect
        #[arg(long)]
        user: String,
    },

    /// Show a category spending summary for a user
    Summary {
        /// User to summarize
        #[arg(long)]
        user: String,

        /// Trailing window in days
        #[arg(long, default_value = "90")]
        days: i64,
    },
}
