//! CLI argument definitions using clap
//!
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};

/// CashFlow - Personal finance tracker with an AI assistant
#[derive(Parser)]
#[command(name = "cashflow")]
#[command(about = "Self-hosted personal finance backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to CASHFLOW_DB or the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed default categories
    Init,

    /// Show database status and row counts
    Status,

    /// Start the web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}
