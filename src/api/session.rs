//! Endpoints describing the caller's own session.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::auth::Session;

pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/session", get(current_session))
}

async fn index() -> Json<&'static str> {
    Json("This is API endpoint")
}

#[derive(Serialize)]
struct SessionResponse {
    username: String,
    expires_at: u64,
}

async fn current_session(session: Session) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: session.claims.username,
        expires_at: session.expires_at,
    })
}
