//! Request handlers, grouped by resource

mod auth;
mod categories;
mod chat;
mod reports;
mod transactions;

pub use auth::{get_me, login, register, update_me};
pub use categories::{
    create_category, delete_category, get_category, list_categories, restore_category,
    update_category,
};
pub use chat::{chat, chat_history, delete_chat_entry};
pub use reports::{report_by_category, report_monthly, report_summary, report_trends};
pub use transactions::{
    create_transaction, delete_transaction, get_transaction, list_transactions,
    restore_transaction, transaction_statistics, update_transaction,
};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: an absent
/// field stays `None` (leave as-is), a present field becomes `Some(inner)`
/// where `inner` may itself be `None` (clear the value).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
