//! CashFlow Web Server
//!
//! Axum-based REST API for the CashFlow personal finance backend.
//!
//! Security:
//! - JWT bearer authentication (HS256) on every route except register/login
//! - Restrictive CORS policy and standard security headers
//! - Sanitized error responses; full errors go to the log only

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use cashflow_core::db::Database;
use cashflow_core::{AiClient, AppConfig};

mod handlers;
mod token;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub ai: Option<AiClient>,
}

/// Authentication middleware - validates the bearer JWT and resolves the user
///
/// The token's subject is the user's email. The user must still exist and be
/// active; a valid token for a deactivated account is rejected. On success
/// the resolved user is attached to the request for handlers to extract.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "));

    let Some(raw_token) = bearer else {
        return unauthorized("Authentication required");
    };

    let email = match token::validate(raw_token, &state.config.jwt_secret) {
        Ok(email) => email,
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Rejected invalid token");
            return unauthorized("Invalid or expired token");
        }
    };

    let user = match state.db.find_user_by_email(&email) {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            warn!(user = %email, "Token for missing or inactive user");
            return unauthorized("Invalid or expired token");
        }
        Err(e) => {
            error!(error = %e, "User lookup failed during authentication");
            return AppError::internal("An internal error occurred").into_response();
        }
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn unauthorized(msg: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": msg })),
    )
        .into_response()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: AppConfig) -> Router {
    let ai = config.ai.clone().map(AiClient::new);
    match &ai {
        Some(client) => info!(model = %client.model(), "AI assistant configured"),
        None => info!("AI assistant not configured (set OPENAI_API_KEY to enable)"),
    }

    let state = Arc::new(AppState { db, config, ai });

    // Register and login are the only routes reachable without a token
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        // Auth
        .route(
            "/auth/me",
            get(handlers::get_me).put(handlers::update_me),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route("/categories/:id/restore", post(handlers::restore_category))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/statistics",
            get(handlers::transaction_statistics),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        .route(
            "/transactions/:id/restore",
            post(handlers::restore_transaction),
        )
        // Reports
        .route("/reports/summary", get(handlers::report_summary))
        .route("/reports/by-category", get(handlers::report_by_category))
        .route("/reports/monthly", get(handlers::report_monthly))
        .route("/reports/trends", get(handlers::report_trends))
        // AI assistant
        .route("/ai/chat", post(handlers::chat))
        .route("/ai/history", get(handlers::chat_history))
        .route("/ai/history/:id", delete(handlers::delete_chat_entry))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Restrictive CORS default: same-origin, standard methods only
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: AppConfig) -> anyhow::Result<()> {
    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<cashflow_core::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_gateway(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Map core errors onto the response taxonomy. Storage failures stay
/// uncategorized: the client sees a generic 500, the log sees the cause.
impl From<cashflow_core::Error> for AppError {
    fn from(err: cashflow_core::Error) -> Self {
        use cashflow_core::Error;
        match err {
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::Conflict(msg) => Self::conflict(&msg),
            Error::Validation(msg) => Self::bad_request(&msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other),
            },
        }
    }
}

#[cfg(test)]
mod tests;
