//! Session endpoints.
//!
//! - GET `/` - Describe the available session endpoints
//! - POST `/login` - Verify credentials and set the session cookie
//! - POST `/logout` - Clear the session cookie

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::{AuthState, clear_session_cookie, session_cookie};
use crate::db::Database;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct AuthRoutesState {
    pub db: Database,
    pub auth: AuthState,
}

pub fn router(state: AuthRoutesState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_login));

    Router::new()
        .route("/", get(root))
        .route("/logout", post(logout))
        .with_state(state)
        .merge(login_router)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "login": "POST /auth/login",
        "logout": "POST /auth/logout",
    }))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    expires_at: u64,
}

/// Exchange a username and password for a session cookie.
async fn login(
    State(state): State<AuthRoutesState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.as_deref().map(str::trim).unwrap_or("");
    let password = payload.password.as_deref().unwrap_or("");

    if username.is_empty() || password.is_empty() {
        return Err(ApiError::missing_credentials());
    }

    let user = state
        .db
        .users()
        .verify_credentials(username, password)
        .await
        .db_err("Failed to verify credentials")?
        .ok_or_else(|| {
            warn!(username = %username, "Failed login attempt");
            ApiError::unauthorized("Invalid username or password")
        })?;

    let issued = state
        .auth
        .codec
        .create_token(&user.username)
        .internal_err("Failed to create session")?;

    let cookie = HeaderValue::from_str(&session_cookie(
        &issued.token,
        issued.expires_at,
        &state.auth.cookies,
    ))
    .internal_err("Failed to create session")?;

    info!(username = %user.username, "User logged in");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

/// Clear the session cookie. Works whether or not the caller holds a valid session.
async fn logout(State(state): State<AuthRoutesState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(SET_COOKIE, clear_session_cookie(&state.auth.cookies))],
        Json(serde_json::json!({ "success": true })),
    )
}
