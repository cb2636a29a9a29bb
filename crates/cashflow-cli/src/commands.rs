//! Command implementations

use anyhow::{Context, Result};

use cashflow_core::config::{default_db_path, AppConfig, DB_PATH_ENV};
use cashflow_core::Database;

/// Resolve the database path without requiring the full server config.
///
/// A CLI flag wins over the environment, which wins over the platform
/// default. Mirrors [`AppConfig::from_env`].
fn resolve_db_path(db_override: Option<&str>) -> Result<String> {
    if let Some(path) = db_override {
        return Ok(path.to_string());
    }
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        return Ok(path);
    }
    Ok(default_db_path()?.to_string_lossy().into_owned())
}

pub fn cmd_init(db_override: Option<&str>) -> Result<()> {
    let path = resolve_db_path(db_override)?;
    let db = Database::new(&path).context("Failed to initialize database")?;

    println!();
    println!("✅ Database initialized");
    println!("   Path: {}", db.path());

    let stats = db.stats()?;
    println!("   Default categories: {}", stats.categories);
    Ok(())
}

pub fn cmd_status(db_override: Option<&str>) -> Result<()> {
    let path = resolve_db_path(db_override)?;

    println!();
    println!("📊 CashFlow Status");
    println!("   Database: {}", path);

    if !std::path::Path::new(&path).exists() {
        println!("   (database not initialized, run `cashflow init`)");
        return Ok(());
    }

    if let Ok(metadata) = std::fs::metadata(&path) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb < 1024.0 {
            println!("   Size: {:.1} KB", size_kb);
        } else {
            println!("   Size: {:.1} MB", size_kb / 1024.0);
        }
    }

    let db = Database::new(&path).context("Failed to open database")?;
    let stats = db.stats()?;
    println!();
    println!("   Users: {}", stats.users);
    println!("   Categories: {}", stats.categories);
    println!("   Transactions: {}", stats.transactions);
    println!("   Chat entries: {}", stats.chats);
    Ok(())
}

pub async fn cmd_serve(db_override: Option<&str>, host: &str, port: u16) -> Result<()> {
    let config = AppConfig::from_env(db_override).context("Invalid configuration")?;
    let db = Database::new(&config.database_path).context("Failed to open database")?;

    cashflow_server::serve(db, host, port, config).await
}
