//! AI assistant endpoints
//!
//! Every exchange is persisted, failed ones included, so the history is a
//! complete audit trail of what was asked and what the model was told.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::warn;

use cashflow_core::models::{Chat, NewChat, User};
use cashflow_core::FinancialContext;

use crate::{AppError, AppState, SuccessResponse};

const DEFAULT_HISTORY_LIMIT: i64 = 10;

const FAILURE_REPLY: &str = "Sorry, I could not process your question right now.";

#[derive(Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// POST /api/v1/ai/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<Chat>, AppError> {
    let Some(ai) = &state.ai else {
        return Err(AppError::unavailable("AI assistant is not configured"));
    };

    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::bad_request("Question must not be empty"));
    }

    let context = FinancialContext::gather(&state.db, user.id)?;
    let context_summary = Some(context.summary_line());

    match ai.ask(&user, question, &context).await {
        Ok(response) => {
            let record = state.db.insert_chat(
                user.id,
                &NewChat {
                    question: question.to_string(),
                    response,
                    context_summary,
                    was_successful: true,
                    error_message: None,
                },
            )?;
            Ok(Json(record))
        }
        Err(err) => {
            warn!(user = %user.email, error = %err, "AI request failed");
            // Record the failure so the history stays complete
            state.db.insert_chat(
                user.id,
                &NewChat {
                    question: question.to_string(),
                    response: FAILURE_REPLY.to_string(),
                    context_summary,
                    was_successful: false,
                    error_message: Some(err.to_string()),
                },
            )?;
            Err(AppError::bad_gateway("AI assistant request failed"))
        }
    }
}

/// GET /api/v1/ai/history
pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Chat>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(state.db.list_chats(user.id, limit)?))
}

/// DELETE /api/v1/ai/history/:id
pub async fn delete_chat_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_chat(id, user.id)?;
    Ok(Json(SuccessResponse { success: true }))
}
