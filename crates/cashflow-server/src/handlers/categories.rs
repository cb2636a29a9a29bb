//! Category CRUD with soft delete and restore

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use cashflow_core::models::{Category, NewCategory, TransactionType, User};

use crate::{AppError, AppState, SuccessResponse};

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Category plus its live transaction count, for the detail view
#[derive(Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub transaction_count: i64,
}

/// GET /api/v1/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.db.list_categories(user.id)?))
}

/// POST /api/v1/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<Response, AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Category name must not be empty"));
    }

    let new = NewCategory {
        name: name.to_string(),
        kind: body.kind,
        description: body.description.filter(|d| !d.trim().is_empty()),
    };
    let category = state.db.create_category(user.id, &new)?;
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

/// GET /api/v1/categories/:id
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryDetail>, AppError> {
    let category = state.db.find_category(id, user.id)?;
    let transaction_count = state.db.category_transaction_count(id, user.id)?;
    Ok(Json(CategoryDetail {
        category,
        transaction_count,
    }))
}

/// PUT /api/v1/categories/:id
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    guard_not_default(&state, id, user.id)?;
    let updated = state.db.update_category(
        id,
        user.id,
        body.name.as_deref().map(str::trim),
        body.description.as_deref(),
    )?;
    Ok(Json(updated))
}

/// DELETE /api/v1/categories/:id
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    guard_not_default(&state, id, user.id)?;
    state.db.soft_delete_category(id, user.id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/v1/categories/:id/restore
pub async fn restore_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.db.restore_category(id, user.id)?))
}

/// Default categories are shared and immutable; report an explicit 403
/// rather than the 404 the ownership guard alone would produce.
fn guard_not_default(state: &AppState, id: i64, user_id: i64) -> Result<(), AppError> {
    let category = state.db.find_category(id, user_id)?;
    if category.is_default {
        return Err(AppError::forbidden("Default categories cannot be modified"));
    }
    Ok(())
}
