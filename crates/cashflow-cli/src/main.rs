//! CashFlow CLI - Personal finance tracker
//!
//! Usage:
//!   cashflow init                 Initialize database
//!   cashflow status               Show database status
//!   cashflow serve --port 8000    Start web server

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

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
        Commands::Init => commands::cmd_init(cli.db.as_deref()),
        Commands::Status => commands::cmd_status(cli.db.as_deref()),
        Commands::Serve { host, port } => {
            commands::cmd_serve(cli.db.as_deref(), &host, port).await
        }
    }
}
