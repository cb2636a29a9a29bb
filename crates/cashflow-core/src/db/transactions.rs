//! Transaction CRUD, filtering, and soft delete

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{parse_date, parse_datetime, parse_decimal_col, parse_kind_col, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionType, TransactionUpdate};

const TRANSACTION_COLUMNS: &str = "id, user_id, category_id, type, amount, description, date, \
     is_deleted, deleted_at, created_at, updated_at";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let kind_raw: String = row.get(3)?;
    let amount_raw: String = row.get(4)?;
    let date_raw: String = row.get(6)?;
    let deleted_at: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: Option<String> = row.get(10)?;
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        kind: parse_kind_col(3, &kind_raw)?,
        amount: parse_decimal_col(4, &amount_raw)?,
        description: row.get(5)?,
        date: parse_date(&date_raw),
        is_deleted: row.get(7)?,
        deleted_at: deleted_at.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at),
        updated_at: updated_at.as_deref().map(parse_datetime),
    })
}

/// Filter for transaction lists and report row sets.
///
/// Date bounds are inclusive on both ends; an inverted range simply matches
/// nothing. `include_deleted` widens visibility for audit-style listings and
/// is never set by report paths.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: Option<TransactionType>,
    pub category_id: Option<i64>,
    pub include_deleted: bool,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    fn where_clause(&self, params: &mut Vec<Box<dyn rusqlite::ToSql>>) -> String {
        let mut conditions = vec!["user_id = ?".to_string()];

        if !self.include_deleted {
            conditions.push("is_deleted = 0".to_string());
        }
        if let Some(start) = self.start_date {
            conditions.push("date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }
        if let Some(end) = self.end_date {
            conditions.push("date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }
        if let Some(kind) = self.kind {
            conditions.push("type = ?".to_string());
            params.push(Box::new(kind.as_str()));
        }
        if let Some(category_id) = self.category_id {
            conditions.push("category_id = ?".to_string());
            params.push(Box::new(category_id));
        }

        format!("WHERE {}", conditions.join(" AND "))
    }
}

impl Database {
    /// List transactions matching a filter, newest first
    pub fn list_transactions(&self, user_id: i64, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];
        let where_clause = filter.where_clause(&mut values);

        let mut sql = format!(
            "SELECT {} FROM transactions {} ORDER BY date DESC, id DESC",
            TRANSACTION_COLUMNS, where_clause
        );
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Box::new(limit));
            values.push(Box::new(filter.offset));
        }

        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), row_to_transaction)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Fetch the full visible row set for a filter, oldest first.
    ///
    /// This is the aggregation engine's input; it never includes deleted rows
    /// and applies no limit.
    pub fn visible_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let mut filter = filter.clone();
        filter.include_deleted = false;
        filter.limit = None;
        filter.offset = 0;

        let conn = self.conn()?;
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];
        let where_clause = filter.where_clause(&mut values);

        let sql = format!(
            "SELECT {} FROM transactions {} ORDER BY date, id",
            TRANSACTION_COLUMNS, where_clause
        );
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), row_to_transaction)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Fetch one visible transaction owned by the user
    pub fn find_transaction(&self, id: i64, user_id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM transactions
                 WHERE id = ? AND user_id = ? AND is_deleted = 0",
                TRANSACTION_COLUMNS
            ),
            params![id, user_id],
            row_to_transaction,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Transaction {} not found", id)))
    }

    /// Create a transaction after validating the amount and category pairing.
    ///
    /// The amount must be a positive magnitude. When a category is set it must
    /// be visible to the user and its type must agree with the transaction's.
    pub fn create_transaction(&self, user_id: i64, new: &NewTransaction) -> Result<Transaction> {
        if new.amount <= Decimal::ZERO {
            return Err(Error::Validation(
                "Amount must be a positive magnitude".to_string(),
            ));
        }
        if let Some(category_id) = new.category_id {
            let category = self.find_category(category_id, user_id)?;
            if category.kind != new.kind {
                return Err(Error::Validation(format!(
                    "Transaction type '{}' does not match category '{}' type '{}'",
                    new.kind, category.name, category.kind
                )));
            }
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transactions (user_id, category_id, type, amount, description, date)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                new.category_id,
                new.kind.as_str(),
                new.amount.to_string(),
                new.description,
                new.date.to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.find_transaction(id, user_id)
    }

    /// Apply field changes to a visible transaction.
    ///
    /// Re-validates the type/category pairing against the post-update values,
    /// so an update can neither orphan the type consistency rule nor point at
    /// a category the user cannot see.
    pub fn update_transaction(
        &self,
        id: i64,
        user_id: i64,
        changes: &TransactionUpdate,
    ) -> Result<Transaction> {
        let existing = self.find_transaction(id, user_id)?;

        let next_kind = changes.kind.unwrap_or(existing.kind);
        let next_category = match changes.category_id {
            Some(next) => next,
            None => existing.category_id,
        };
        if let Some(amount) = changes.amount {
            if amount <= Decimal::ZERO {
                return Err(Error::Validation(
                    "Amount must be a positive magnitude".to_string(),
                ));
            }
        }
        if let Some(category_id) = next_category {
            let category = self.find_category(category_id, user_id)?;
            if category.kind != next_kind {
                return Err(Error::Validation(format!(
                    "Transaction type '{}' does not match category '{}' type '{}'",
                    next_kind, category.name, category.kind
                )));
            }
        }

        let conn = self.conn()?;
        let mut sets = vec!["updated_at = datetime('now')".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category_id) = changes.category_id {
            sets.push("category_id = ?".to_string());
            values.push(Box::new(category_id));
        }
        if let Some(kind) = changes.kind {
            sets.push("type = ?".to_string());
            values.push(Box::new(kind.as_str()));
        }
        if let Some(amount) = changes.amount {
            sets.push("amount = ?".to_string());
            values.push(Box::new(amount.to_string()));
        }
        if let Some(ref description) = changes.description {
            sets.push("description = ?".to_string());
            values.push(Box::new(description.clone()));
        }
        if let Some(date) = changes.date {
            sets.push("date = ?".to_string());
            values.push(Box::new(date.to_string()));
        }
        values.push(Box::new(id));
        values.push(Box::new(user_id));

        let sql = format!(
            "UPDATE transactions SET {} WHERE id = ? AND user_id = ? AND is_deleted = 0",
            sets.join(", ")
        );
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, refs.as_slice())?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }
        drop(conn);

        self.find_transaction(id, user_id)
    }

    /// Soft-delete a transaction.
    ///
    /// Conditional update guarded by the active state, so a concurrent
    /// delete/restore race resolves to NotFound for the loser instead of
    /// silently double-applying.
    pub fn soft_delete_transaction(&self, id: i64, user_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions
             SET is_deleted = 1, deleted_at = datetime('now')
             WHERE id = ? AND user_id = ? AND is_deleted = 0",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }

    /// The restore path's lookup: the only transaction query allowed to see
    /// soft-deleted rows. Never reuse for normal reads.
    pub fn find_deleted_transaction(&self, id: i64, user_id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions
                     WHERE id = ? AND user_id = ? AND is_deleted = 1",
                    TRANSACTION_COLUMNS
                ),
                params![id, user_id],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Restore a soft-deleted transaction. Restoring an already-active row is
    /// a conflict, not a silent no-op; a missing row is NotFound.
    pub fn restore_transaction(&self, id: i64, user_id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions
             SET is_deleted = 0, deleted_at = NULL
             WHERE id = ? AND user_id = ? AND is_deleted = 1",
            params![id, user_id],
        )?;
        drop(conn);

        if changed == 0 {
            return match self.find_transaction(id, user_id) {
                Ok(_) => Err(Error::Conflict(format!(
                    "Transaction {} is not deleted",
                    id
                ))),
                Err(_) => Err(Error::NotFound(format!("Transaction {} not found", id))),
            };
        }

        self.find_transaction(id, user_id)
    }

    /// Totals over the visible rows matching a filter
    pub fn transaction_statistics(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<crate::reports::Statistics> {
        let rows = self.visible_transactions(user_id, filter)?;
        Ok(crate::reports::statistics(&rows))
    }
}
