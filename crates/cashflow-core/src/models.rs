//! Domain models: users, categories, transactions, chat history

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Direction of money movement. Amounts are always stored as unsigned
/// magnitudes; the sign is derived from this type, never from the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::Validation(format!(
                "Invalid transaction type '{}', expected 'income' or 'expense'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Registered user account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    /// Touched only by profile updates, never by logins
    pub updated_at: Option<DateTime<Utc>>,
    /// Touched only by logins, never by profile updates
    pub last_login_at: Option<DateTime<Utc>>,
}

/// New user ready for insertion (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
}

/// Income or expense category. System defaults have `user_id = None` and
/// are visible to every user but cannot be modified or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: Option<String>,
    pub is_default: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// New category ready for insertion
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub kind: TransactionType,
    pub description: Option<String>,
}

/// A single income or expense entry
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Unsigned magnitude; direction comes from `kind`
    pub amount: Decimal,
    pub description: Option<String>,
    /// Calendar date of the transaction, distinct from `created_at`
    pub date: NaiveDate,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// New transaction ready for insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub category_id: Option<i64>,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// Field changes for a transaction update; `None` leaves the field as-is
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub category_id: Option<Option<i64>>,
    pub kind: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
}

/// One AI conversation exchange (question plus reply)
#[derive(Debug, Clone, Serialize)]
pub struct Chat {
    pub id: i64,
    pub user_id: i64,
    pub question: String,
    pub response: String,
    /// Short description of the financial context sent to the model
    pub context_summary: Option<String>,
    pub was_successful: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New chat record ready for insertion
#[derive(Debug, Clone)]
pub struct NewChat {
    pub question: String,
    pub response: String,
    pub context_summary: Option<String>,
    pub was_successful: bool,
    pub error_message: Option<String>,
}
