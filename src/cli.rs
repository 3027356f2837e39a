//! Command-line interface for poker_tally.

use clap::{Parser, Subcommand};
use poker_tally::Backend;

/// Poker Tally - poker session ledger with per-player statistics
#[derive(Parser, Debug)]
#[command(name = "poker_tally")]
#[command(about = "Record poker session results and serve running statistics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP ledger server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Path to the SQLite database file (created if it doesn't exist)
        #[arg(long)]
        db_path: Option<String>,

        /// Persistence backend
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Optional TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },

    /// Create the database tables and seed default settings, then exit
    Provision {
        /// Path to the SQLite database file
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Print a player's statistics and session history
    Report {
        /// Player whose records to show
        #[arg(long)]
        player: String,

        /// Path to the SQLite database file
        #[arg(long)]
        db_path: Option<String>,
    },
}
