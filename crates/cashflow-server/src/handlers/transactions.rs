//! Transaction CRUD, filtering, and statistics

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use cashflow_core::models::{NewTransaction, Transaction, TransactionType, TransactionUpdate, User};
use cashflow_core::reports::Statistics;
use cashflow_core::TransactionFilter;

use crate::{AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};

use super::double_option;

const DEFAULT_PAGE_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ListQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub include_deleted: bool,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> Result<TransactionFilter, AppError> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if skip < 0 || limit < 1 || limit > MAX_PAGE_LIMIT {
            return Err(AppError::bad_request("Invalid pagination parameters"));
        }
        Ok(TransactionFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            kind: self.transaction_type,
            category_id: self.category_id,
            include_deleted: self.include_deleted,
            limit: Some(limit),
            offset: skip,
        })
    }
}

#[derive(Deserialize)]
pub struct StatisticsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub category_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// Absent fields stay untouched; `category_id: null` and `description: null`
/// explicitly clear their values.
#[derive(Deserialize, Default)]
pub struct UpdateTransactionRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
}

/// GET /api/v1/transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let filter = query.into_filter()?;
    Ok(Json(state.db.list_transactions(user.id, &filter)?))
}

/// POST /api/v1/transactions
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<Response, AppError> {
    let new = NewTransaction {
        category_id: body.category_id,
        kind: body.kind,
        amount: body.amount,
        description: body.description.filter(|d| !d.trim().is_empty()),
        date: body.date,
    };
    let tx = state.db.create_transaction(user.id, &new)?;
    Ok((StatusCode::CREATED, Json(tx)).into_response())
}

/// GET /api/v1/transactions/statistics
pub async fn transaction_statistics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<Statistics>, AppError> {
    let filter = TransactionFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        kind: query.transaction_type,
        category_id: query.category_id,
        ..TransactionFilter::new()
    };
    Ok(Json(state.db.transaction_statistics(user.id, &filter)?))
}

/// GET /api/v1/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.db.find_transaction(id, user.id)?))
}

/// PUT /api/v1/transactions/:id
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    let changes = TransactionUpdate {
        category_id: body.category_id,
        kind: body.kind,
        amount: body.amount,
        description: body.description,
        date: body.date,
    };
    Ok(Json(state.db.update_transaction(id, user.id, &changes)?))
}

/// DELETE /api/v1/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.soft_delete_transaction(id, user.id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/v1/transactions/:id/restore
pub async fn restore_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.db.restore_transaction(id, user.id)?))
}
