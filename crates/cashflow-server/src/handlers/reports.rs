//! Report endpoints: summary, breakdown, monthly history, trends

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use cashflow_core::models::{TransactionType, User};
use cashflow_core::reports::{
    CategoryBreakdownReport, MonthlyReport, SummaryReport, TrendGranularity, TrendReport,
    DEFAULT_HISTORY_MONTHS,
};

use crate::{AppError, AppState};

/// Upper bound on the monthly history window
const MAX_HISTORY_MONTHS: u32 = 60;

#[derive(Deserialize)]
pub struct PeriodQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct BreakdownQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
}

#[derive(Deserialize)]
pub struct MonthlyQuery {
    pub months: Option<u32>,
}

#[derive(Deserialize)]
pub struct TrendQuery {
    pub period: Option<String>,
}

/// GET /api/v1/reports/summary
pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<SummaryReport>, AppError> {
    Ok(Json(state.db.summary_report(
        user.id,
        query.start_date,
        query.end_date,
    )?))
}

/// GET /api/v1/reports/by-category
pub async fn report_by_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<BreakdownQuery>,
) -> Result<Json<CategoryBreakdownReport>, AppError> {
    Ok(Json(state.db.category_breakdown_report(
        user.id,
        query.start_date,
        query.end_date,
        query.transaction_type,
    )?))
}

/// GET /api/v1/reports/monthly
pub async fn report_monthly(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Json<MonthlyReport>, AppError> {
    let months = query.months.unwrap_or(DEFAULT_HISTORY_MONTHS);
    if months < 1 || months > MAX_HISTORY_MONTHS {
        return Err(AppError::bad_request("months must be between 1 and 60"));
    }
    Ok(Json(state.db.monthly_report(user.id, months)?))
}

/// GET /api/v1/reports/trends
pub async fn report_trends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendReport>, AppError> {
    let granularity = match query.period.as_deref() {
        Some(raw) => TrendGranularity::parse(raw)?,
        None => TrendGranularity::Monthly,
    };
    Ok(Json(state.db.trends_report(user.id, granularity)?))
}
