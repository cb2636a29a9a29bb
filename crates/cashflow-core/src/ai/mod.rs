//! AI assistant: financial context gathering and the chat-completion client
//!
//! The pipeline is deliberately sequential and retry-free: gather the user's
//! aggregates locally, format them into a system prompt, make one API call,
//! strip markdown from the reply. Persisting the exchange (including
//! failures) is the caller's job so the audit trail survives API errors.

pub mod markdown;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::db::{Database, TransactionFilter};
use crate::error::{Error, Result};
use crate::models::{TransactionType, User};
use crate::reports;

/// How many recent transactions to include in the prompt context
const RECENT_CONTEXT_LIMIT: i64 = 10;

/// Token and sampling limits for the completion call
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

/// One category's total in the prompt context
#[derive(Debug, Clone, Serialize)]
pub struct ContextCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub total: Decimal,
}

/// One recent transaction in the prompt context
#[derive(Debug, Clone, Serialize)]
pub struct ContextTransaction {
    pub date: chrono::NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// The locally-aggregated financial picture sent alongside a question
#[derive(Debug, Clone, Serialize)]
pub struct FinancialContext {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub transaction_count: i64,
    pub categories: Vec<ContextCategory>,
    pub recent_transactions: Vec<ContextTransaction>,
}

impl FinancialContext {
    /// Gather a user's all-time aggregates from visible rows
    pub fn gather(db: &Database, user_id: i64) -> Result<Self> {
        let rows = db.visible_transactions(user_id, &TransactionFilter::new())?;
        let stats = reports::statistics(&rows);

        let categories = db.list_categories(user_id)?;
        let breakdown: Vec<ContextCategory> = categories
            .iter()
            .filter_map(|cat| {
                let total: Decimal = rows
                    .iter()
                    .filter(|tx| tx.category_id == Some(cat.id))
                    .map(|tx| tx.amount)
                    .sum();
                if total.is_zero() {
                    None
                } else {
                    Some(ContextCategory {
                        name: cat.name.clone(),
                        kind: cat.kind,
                        total,
                    })
                }
            })
            .collect();

        let category_names: std::collections::HashMap<i64, &str> =
            categories.iter().map(|c| (c.id, c.name.as_str())).collect();
        let recent: Vec<ContextTransaction> = rows
            .iter()
            .rev()
            .take(RECENT_CONTEXT_LIMIT as usize)
            .map(|tx| ContextTransaction {
                date: tx.date,
                kind: tx.kind,
                amount: tx.amount,
                category: tx
                    .category_id
                    .and_then(|id| category_names.get(&id))
                    .map(|name| name.to_string()),
                description: tx.description.clone(),
            })
            .collect();

        Ok(Self {
            total_income: stats.total_income,
            total_expense: stats.total_expense,
            balance: stats.balance,
            transaction_count: stats.transaction_count,
            categories: breakdown,
            recent_transactions: recent,
        })
    }

    /// One-line summary persisted with the chat record
    pub fn summary_line(&self) -> String {
        format!(
            "income={}, expense={}, balance={}, transactions={}",
            self.total_income, self.total_expense, self.balance, self.transaction_count
        )
    }

    fn format_categories(&self) -> String {
        if self.categories.is_empty() {
            return "No categories yet.".to_string();
        }
        self.categories
            .iter()
            .map(|c| format!("- {} ({}): ${:.2}", c.name, c.kind, c.total))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_recent(&self) -> String {
        if self.recent_transactions.is_empty() {
            return "No transactions yet.".to_string();
        }
        self.recent_transactions
            .iter()
            .take(5)
            .map(|t| {
                format!(
                    "- {}: {} ${:.2} ({}) - {}",
                    t.date,
                    t.kind,
                    t.amount,
                    t.category.as_deref().unwrap_or("Uncategorized"),
                    t.description.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions API
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    config: AiConfig,
}

impl AiClient {
    pub fn new(config: AiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// The configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask the assistant one question with the user's financial context.
    ///
    /// Returns the reply with markdown already stripped. No retries; a
    /// failed call surfaces as [`Error::Ai`] for the caller to record.
    pub async fn ask(
        &self,
        user: &User,
        question: &str,
        context: &FinancialContext,
    ) -> Result<String> {
        let system_prompt = build_system_prompt(user, context);
        let request = CompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(model = %self.config.model, "Sending chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!(
                "Chat completion failed with {}: {}",
                status, body
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Ai("Chat completion returned no content".to_string()))?;

        Ok(markdown::clean(&reply))
    }
}

fn build_system_prompt(user: &User, context: &FinancialContext) -> String {
    format!(
        "You are a helpful personal finance assistant.\n\n\
         User Information:\n\
         - Email: {}\n\n\
         Financial Context (all amounts in dollars):\n\
         - Total Income: ${:.2}\n\
         - Total Expenses: ${:.2}\n\
         - Current Balance: ${:.2}\n\
         - Total Transactions: {}\n\n\
         Categories Breakdown:\n{}\n\n\
         Recent Transactions:\n{}\n\n\
         Instructions:\n\
         1. Answer the user's question based on the data above\n\
         2. Be concise and friendly\n\
         3. Use specific numbers from the data\n\
         4. If the question cannot be answered with available data, explain what's missing\n\
         5. Format currency as $X,XXX.XX\n\
         6. Provide actionable insights when appropriate",
        user.email,
        context.total_income,
        context.total_expense,
        context.balance,
        context.transaction_count,
        context.format_categories(),
        context.format_recent(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn context() -> FinancialContext {
        FinancialContext {
            total_income: "3000".parse().unwrap(),
            total_expense: "1500.50".parse().unwrap(),
            balance: "1499.50".parse().unwrap(),
            transaction_count: 3,
            categories: vec![ContextCategory {
                name: "Food".to_string(),
                kind: TransactionType::Expense,
                total: "850.50".parse().unwrap(),
            }],
            recent_transactions: vec![ContextTransaction {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                kind: TransactionType::Expense,
                amount: "12.34".parse().unwrap(),
                category: None,
                description: Some("coffee".to_string()),
            }],
        }
    }

    #[test]
    fn prompt_includes_totals_and_categories() {
        let user = User {
            id: 1,
            email: "a@example.com".to_string(),
            hashed_password: String::new(),
            full_name: None,
            is_active: true,
            is_superuser: false,
            created_at: chrono::Utc::now(),
            updated_at: None,
            last_login_at: None,
        };
        let prompt = build_system_prompt(&user, &context());
        assert!(prompt.contains("a@example.com"));
        assert!(prompt.contains("$3000.00"));
        assert!(prompt.contains("- Food (expense): $850.50"));
        assert!(prompt.contains("(Uncategorized) - coffee"));
    }

    #[test]
    fn summary_line_is_compact() {
        assert_eq!(
            context().summary_line(),
            "income=3000, expense=1500.50, balance=1499.50, transactions=3"
        );
    }
}
