//! CashFlow Core Library
//!
//! Shared functionality for the CashFlow personal finance backend:
//! - Database access and migrations (users, categories, transactions, chats)
//! - Soft-delete lifecycle for categories and transactions
//! - Aggregation engine for statistics, breakdowns, and trend reports
//! - Password hashing for user credentials
//! - AI assistant client with markdown cleanup of replies

pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reports;

pub use ai::{AiClient, FinancialContext};
pub use config::{AiConfig, AppConfig};
pub use db::{Database, TransactionFilter};
pub use error::{Error, Result};
pub use models::{Category, Chat, Transaction, TransactionType, User};
pub use reports::{
    CategoryBreakdownReport, MonthlyReport, ReportPeriod, Statistics, SummaryReport,
    TrendGranularity, TrendReport,
};
