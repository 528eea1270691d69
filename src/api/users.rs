use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt, validate_password, validate_username};
use crate::auth::Session;
use crate::db::Database;
use crate::password::hash_password;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/{username}", delete(delete_user))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    email: Option<String>,
}

#[derive(Serialize)]
struct CreateUserResponse {
    uuid: String,
    username: String,
}

async fn create_user(
    State(state): State<UsersState>,
    session: Session,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    validate_username(username)?;

    validate_password(&payload.password)?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if let Some(email) = email {
        if !email.contains('@') {
            return Err(ApiError::bad_request("Invalid email address"));
        }
    }

    let available = state
        .db
        .users()
        .is_username_available(username)
        .await
        .db_err("Failed to check username availability")?;

    if !available {
        return Err(ApiError::conflict("User already exist"));
    }

    if let Some(email) = email {
        let available = state
            .db
            .users()
            .is_email_available(email)
            .await
            .db_err("Failed to check email availability")?;

        if !available {
            return Err(ApiError::conflict("Email already taken"));
        }
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .internal_err("Failed to hash password")?
        .internal_err("Failed to hash password")?;

    let uuid = uuid::Uuid::new_v4().to_string();

    state
        .db
        .users()
        .create(&uuid, username, &password_hash, email)
        .await
        .db_err("Failed to create user")?;

    info!(username = %username, created_by = %session.username(), "User created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            uuid,
            username: username.to_string(),
        }),
    ))
}

async fn delete_user(
    State(state): State<UsersState>,
    session: Session,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if username.eq_ignore_ascii_case(session.username()) {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let deleted = state
        .db
        .users()
        .delete_by_username(&username)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    info!(username = %username, deleted_by = %session.username(), "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
