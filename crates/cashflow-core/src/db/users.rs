//! User account operations
//!
//! The two timestamp columns have deliberately separate write paths:
//! `touch_last_login` records authentication events and `update_profile`
//! records profile changes. Neither touches the other's column.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, email, hashed_password, full_name, is_active, is_superuser, \
     created_at, updated_at, last_login_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(6)?;
    let updated_at: Option<String> = row.get(7)?;
    let last_login_at: Option<String> = row.get(8)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        full_name: row.get(3)?,
        is_active: row.get(4)?,
        is_superuser: row.get(5)?,
        created_at: parse_datetime(&created_at),
        updated_at: updated_at.as_deref().map(parse_datetime),
        last_login_at: last_login_at.as_deref().map(parse_datetime),
    })
}

impl Database {
    /// Register a new user. The email must not already be taken.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let conn = self.conn()?;

        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ? AND is_deleted = 0",
                params![new.email],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(Error::Conflict(format!(
                "Email '{}' is already registered",
                new.email
            )));
        }

        conn.execute(
            "INSERT INTO users (email, hashed_password, full_name) VALUES (?, ?, ?)",
            params![new.email, new.hashed_password, new.full_name],
        )?;

        self.find_user_by_id(conn.last_insert_rowid())
    }

    /// Look up an active user by email (login path)
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE email = ? AND is_deleted = 0",
                    USER_COLUMNS
                ),
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user by id, failing with NotFound when absent
    pub fn find_user_by_id(&self, id: i64) -> Result<User> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM users WHERE id = ? AND is_deleted = 0",
                USER_COLUMNS
            ),
            params![id],
            row_to_user,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
    }

    /// Record a successful login. Writes `last_login_at` and nothing else;
    /// in particular it never touches `updated_at`.
    pub fn touch_last_login(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET last_login_at = datetime('now') WHERE id = ? AND is_deleted = 0",
            params![id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    /// Apply a profile change. Writes `updated_at` and nothing else;
    /// in particular it never touches `last_login_at`.
    pub fn update_profile(
        &self,
        id: i64,
        full_name: Option<&str>,
        hashed_password: Option<&str>,
    ) -> Result<User> {
        let conn = self.conn()?;

        let mut sets = vec!["updated_at = datetime('now')".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(name) = full_name {
            sets.push("full_name = ?".to_string());
            values.push(Box::new(name.to_string()));
        }
        if let Some(hash) = hashed_password {
            sets.push("hashed_password = ?".to_string());
            values.push(Box::new(hash.to_string()));
        }
        values.push(Box::new(id));

        let sql = format!(
            "UPDATE users SET {} WHERE id = ? AND is_deleted = 0",
            sets.join(", ")
        );
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, refs.as_slice())?;
        if changed == 0 {
            return Err(Error::NotFound(format!("User {} not found", id)));
        }
        drop(conn);

        self.find_user_by_id(id)
    }
}
