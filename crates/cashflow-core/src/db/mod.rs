//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - account rows and the two distinct timestamp update paths
//! - `categories` - category CRUD with soft delete and system defaults
//! - `transactions` - transaction CRUD, filters, soft delete
//! - `chats` - AI conversation history
//! - `reports` - row-set fetches feeding the aggregation engine

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::Result;

mod categories;
mod chats;
mod reports;
mod transactions;
mod users;

pub use transactions::TransactionFilter;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored "YYYY-MM-DD" date column
pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

/// Parse a stored decimal TEXT column, surfacing corruption as a column error
pub(crate) fn parse_decimal_col(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    raw.parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a stored transaction-type TEXT column
pub(crate) fn parse_kind_col(
    idx: usize,
    raw: &str,
) -> rusqlite::Result<crate::models::TransactionType> {
    crate::models::TransactionType::parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool, running migrations and seeding
    /// the system default categories if the table is empty.
    pub fn new(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        db.seed_default_categories()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/cashflow_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory
            PRAGMA temp_store = MEMORY;

            -- User accounts
            -- updated_at is touched only by profile updates; last_login_at only
            -- by logins. There is no generic auto-touch path.
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                full_name TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                is_superuser BOOLEAN NOT NULL DEFAULT 0,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME,
                last_login_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

            -- Categories. System defaults have user_id NULL and is_default = 1;
            -- they are visible to every user and immutable through the API.
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                user_id INTEGER REFERENCES users(id),
                name TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                description TEXT,
                is_default BOOLEAN NOT NULL DEFAULT 0,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                deleted_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
            CREATE INDEX IF NOT EXISTS idx_categories_user_name ON categories(user_id, name, type);

            -- Transactions. amount is a decimal TEXT magnitude, always positive;
            -- direction comes from type. Soft-deleted rows stay in place and are
            -- excluded from every normal read by an explicit is_deleted = 0
            -- predicate at the call site.
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                category_id INTEGER REFERENCES categories(id),
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                amount TEXT NOT NULL,
                description TEXT,
                date DATE NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                deleted_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_deleted ON transactions(is_deleted);

            -- AI conversation history (hard-deleted on request, never soft)
            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                question TEXT NOT NULL,
                response TEXT NOT NULL,
                context_summary TEXT,
                was_successful BOOLEAN NOT NULL DEFAULT 1,
                error_message TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_chats_user ON chats(user_id, created_at);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Insert the system default categories on first run
    fn seed_default_categories(&self) -> Result<()> {
        let conn = self.conn()?;

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE is_default = 1",
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(());
        }

        const DEFAULTS: &[(&str, &str)] = &[
            ("Salary", "income"),
            ("Freelance", "income"),
            ("Investments", "income"),
            ("Other Income", "income"),
            ("Food", "expense"),
            ("Transport", "expense"),
            ("Housing", "expense"),
            ("Utilities", "expense"),
            ("Entertainment", "expense"),
            ("Health", "expense"),
            ("Shopping", "expense"),
            ("Other Expenses", "expense"),
        ];

        for (name, kind) in DEFAULTS {
            conn.execute(
                "INSERT INTO categories (user_id, name, type, is_default) VALUES (NULL, ?, ?, 1)",
                rusqlite::params![name, kind],
            )?;
        }

        info!(count = DEFAULTS.len(), "Seeded default categories");
        Ok(())
    }

    /// Row counts across the main tables, for the status command
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<i64> {
            Ok(conn.query_row(sql, [], |row| row.get(0))?)
        };
        Ok(DbStats {
            users: count("SELECT COUNT(*) FROM users WHERE is_deleted = 0")?,
            categories: count("SELECT COUNT(*) FROM categories WHERE is_deleted = 0")?,
            transactions: count("SELECT COUNT(*) FROM transactions WHERE is_deleted = 0")?,
            chats: count("SELECT COUNT(*) FROM chats")?,
        })
    }
}

/// Visible row counts per table
#[derive(Debug, Clone, Copy)]
pub struct DbStats {
    pub users: i64,
    pub categories: i64,
    pub transactions: i64,
    pub chats: i64,
}

#[cfg(test)]
mod tests;
