//! AI conversation history
//!
//! Chat rows are an audit trail of the assistant: every exchange is recorded,
//! including failures. Unlike categories and transactions they are
//! hard-deleted on request.

use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Chat, NewChat};

/// Upper bound on a history page regardless of the requested limit
pub const MAX_HISTORY_LIMIT: i64 = 50;

const CHAT_COLUMNS: &str =
    "id, user_id, question, response, context_summary, was_successful, error_message, created_at";

fn row_to_chat(row: &Row) -> rusqlite::Result<Chat> {
    let created_at: String = row.get(7)?;
    Ok(Chat {
        id: row.get(0)?,
        user_id: row.get(1)?,
        question: row.get(2)?,
        response: row.get(3)?,
        context_summary: row.get(4)?,
        was_successful: row.get(5)?,
        error_message: row.get(6)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Record one conversation exchange, successful or not
    pub fn insert_chat(&self, user_id: i64, new: &NewChat) -> Result<Chat> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chats (user_id, question, response, context_summary, was_successful, error_message)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                new.question,
                new.response,
                new.context_summary,
                new.was_successful,
                new.error_message,
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            &format!("SELECT {} FROM chats WHERE id = ?", CHAT_COLUMNS),
            params![id],
            row_to_chat,
        )
        .map_err(Into::into)
    }

    /// A user's recent exchanges, newest first. The limit is capped at
    /// [`MAX_HISTORY_LIMIT`].
    pub fn list_chats(&self, user_id: i64, limit: i64) -> Result<Vec<Chat>> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chats WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            CHAT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id, limit], row_to_chat)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Permanently delete one of the user's exchanges
    pub fn delete_chat(&self, id: i64, user_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM chats WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Chat {} not found", id)));
        }
        Ok(())
    }
}
