//! Registration, login, and profile management

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use cashflow_core::auth::{hash_password, verify_password};
use cashflow_core::models::{NewUser, User};

use crate::{AppError, AppState};

/// Minimum password length accepted at registration and profile updates
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub full_name: Option<String>,
    pub password: Option<String>,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') || trimmed.contains(char::is_whitespace) {
        return Err(AppError::bad_request("Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let new = NewUser {
        email: body.email.trim().to_lowercase(),
        hashed_password: hash_password(&body.password)?,
        full_name: body.full_name.filter(|n| !n.trim().is_empty()),
    };
    let user = state.db.create_user(&new)?;
    info!(user = %user.email, "Registered new user");

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let email = body.email.trim().to_lowercase();
    let user = state
        .db
        .find_user_by_email(&email)?
        .ok_or_else(|| AppError::unauthorized("Incorrect email or password"))?;

    if !verify_password(&body.password, &user.hashed_password)? {
        return Err(AppError::unauthorized("Incorrect email or password"));
    }
    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }

    state.db.touch_last_login(user.id)?;
    let access_token = crate::token::issue(
        &user.email,
        &state.config.jwt_secret,
        state.config.token_expire_minutes,
    )
    .map_err(|_| AppError::internal("Could not issue access token"))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// GET /api/v1/auth/me
pub async fn get_me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

/// PUT /api/v1/auth/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<User>, AppError> {
    let hashed = match &body.password {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let updated = state
        .db
        .update_profile(user.id, body.full_name.as_deref(), hashed.as_deref())?;
    Ok(Json(updated))
}
