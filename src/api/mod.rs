mod auth;
mod error;
mod session;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthState;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use auth::AuthRoutesState;
pub use error::{
    ApiError, MIN_PASSWORD_LENGTH, MISSING_PARAMS_MESSAGE, validate_password, validate_username,
};

/// Create the public session router (login/logout).
pub fn create_auth_router(
    db: Database,
    auth: AuthState,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    auth::router(AuthRoutesState { db, auth }, rate_limit)
}

/// Create the API router. Callers must wrap it in the session gate.
pub fn create_api_router(db: Database) -> Router {
    Router::new()
        .merge(session::router())
        .nest("/user", users::router(users::UsersState { db }))
}
