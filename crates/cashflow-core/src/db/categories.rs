//! Category operations with soft delete
//!
//! Visibility rule: every normal read carries an explicit `is_deleted = 0`
//! predicate. The one deliberate exception is `find_deleted_category`, the
//! named lookup used by the restore path and nothing else.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, parse_kind_col, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory};

const CATEGORY_COLUMNS: &str = "id, user_id, name, type, description, is_default, is_deleted, \
     deleted_at, created_at, updated_at";

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    let kind_raw: String = row.get(3)?;
    let deleted_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: Option<String> = row.get(9)?;
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: parse_kind_col(3, &kind_raw)?,
        description: row.get(4)?,
        is_default: row.get(5)?,
        is_deleted: row.get(6)?,
        deleted_at: deleted_at.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at),
        updated_at: updated_at.as_deref().map(parse_datetime),
    })
}

impl Database {
    /// List visible categories for a user: their own plus the system defaults
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories
             WHERE (user_id = ? OR user_id IS NULL) AND is_deleted = 0
             ORDER BY is_default DESC, name",
            CATEGORY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_category)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Fetch one visible category the user may reference (own or default)
    pub fn find_category(&self, id: i64, user_id: i64) -> Result<Category> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM categories
                 WHERE id = ? AND (user_id = ? OR user_id IS NULL) AND is_deleted = 0",
                CATEGORY_COLUMNS
            ),
            params![id, user_id],
            row_to_category,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))
    }

    /// Create a category for a user.
    ///
    /// A soft-deleted category with the same name and type is restored
    /// instead of inserting a duplicate, so old transactions keep pointing
    /// at the same row. An active duplicate is a conflict.
    pub fn create_category(&self, user_id: i64, new: &NewCategory) -> Result<Category> {
        let conn = self.conn()?;

        let matching: Option<(i64, bool)> = conn
            .query_row(
                "SELECT id, is_deleted FROM categories
                 WHERE user_id = ? AND name = ? AND type = ?",
                params![user_id, new.name, new.kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match matching {
            Some((id, true)) => {
                conn.execute(
                    "UPDATE categories
                     SET is_deleted = 0, deleted_at = NULL, description = ?,
                         updated_at = datetime('now')
                     WHERE id = ? AND is_deleted = 1",
                    params![new.description, id],
                )?;
                drop(conn);
                self.find_category(id, user_id)
            }
            Some((_, false)) => Err(Error::Conflict(format!(
                "Category '{}' ({}) already exists",
                new.name, new.kind
            ))),
            None => {
                conn.execute(
                    "INSERT INTO categories (user_id, name, type, description)
                     VALUES (?, ?, ?, ?)",
                    params![user_id, new.name, new.kind.as_str(), new.description],
                )?;
                let id = conn.last_insert_rowid();
                drop(conn);
                self.find_category(id, user_id)
            }
        }
    }

    /// Update name/description of a user's own category.
    ///
    /// The `user_id = ?` guard means system defaults (user_id NULL) can never
    /// match; callers reject those with a permission error before getting here.
    pub fn update_category(
        &self,
        id: i64,
        user_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category> {
        let conn = self.conn()?;

        let mut sets = vec!["updated_at = datetime('now')".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(name) = name {
            sets.push("name = ?".to_string());
            values.push(Box::new(name.to_string()));
        }
        if let Some(desc) = description {
            sets.push("description = ?".to_string());
            values.push(Box::new(desc.to_string()));
        }
        values.push(Box::new(id));
        values.push(Box::new(user_id));

        let sql = format!(
            "UPDATE categories SET {} WHERE id = ? AND user_id = ? AND is_deleted = 0",
            sets.join(", ")
        );
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, refs.as_slice())?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Category {} not found", id)));
        }
        drop(conn);

        self.find_category(id, user_id)
    }

    /// Soft-delete a user's own category.
    ///
    /// Conditional update guarded by the active state: if a concurrent delete
    /// got there first, zero rows match and the loser sees NotFound. There is
    /// no cascade; the category's transactions stay visible.
    pub fn soft_delete_category(&self, id: i64, user_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE categories
             SET is_deleted = 1, deleted_at = datetime('now')
             WHERE id = ? AND user_id = ? AND is_deleted = 0",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Category {} not found", id)));
        }
        Ok(())
    }

    /// The restore path's lookup: the only category query allowed to see
    /// soft-deleted rows. Never reuse for normal reads.
    pub fn find_deleted_category(&self, id: i64, user_id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let cat = conn
            .query_row(
                &format!(
                    "SELECT {} FROM categories
                     WHERE id = ? AND user_id = ? AND is_deleted = 1",
                    CATEGORY_COLUMNS
                ),
                params![id, user_id],
                row_to_category,
            )
            .optional()?;
        Ok(cat)
    }

    /// Restore a soft-deleted category. Restoring an already-active row is a
    /// conflict, not a silent no-op; a missing row is NotFound.
    pub fn restore_category(&self, id: i64, user_id: i64) -> Result<Category> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE categories
             SET is_deleted = 0, deleted_at = NULL
             WHERE id = ? AND user_id = ? AND is_deleted = 1",
            params![id, user_id],
        )?;
        drop(conn);

        if changed == 0 {
            // Distinguish "already active" from "absent"
            return match self.find_category(id, user_id) {
                Ok(_) => Err(Error::Conflict(format!(
                    "Category {} is not deleted",
                    id
                ))),
                Err(_) => Err(Error::NotFound(format!("Category {} not found", id))),
            };
        }

        self.find_category(id, user_id)
    }

    /// Count a category's visible transactions for one user
    pub fn category_transaction_count(&self, category_id: i64, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM transactions
             WHERE category_id = ? AND user_id = ? AND is_deleted = 0",
            params![category_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
