//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum::http::header::InvalidHeaderValue;
use serde::Serialize;

use crate::jwt::TokenError;

/// Why a request failed authentication. Only ever logged; the client sees a
/// single generic response.
#[derive(Debug)]
pub enum AuthErrorKind {
    /// No session cookie on the request
    MissingCookie,
    /// Cookie present but the token failed verification
    InvalidToken(TokenError),
    /// Token verified but its `exp` has passed
    Expired,
    /// Token was stale and a replacement could not be issued
    RenewalFailed(RenewalError),
    /// System clock unusable
    TimeError,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthErrorKind::MissingCookie => write!(f, "No session cookie"),
            AuthErrorKind::InvalidToken(e) => write!(f, "Invalid session token: {}", e),
            AuthErrorKind::Expired => write!(f, "Session token expired"),
            AuthErrorKind::RenewalFailed(e) => write!(f, "Session renewal failed: {}", e),
            AuthErrorKind::TimeError => write!(f, "System time error"),
        }
    }
}

/// Why a stale token could not be replaced.
#[derive(Debug)]
pub enum RenewalError {
    /// Signing the replacement token failed
    Token(TokenError),
    /// The replacement cookie is not a valid header value
    Header(InvalidHeaderValue),
}

impl std::fmt::Display for RenewalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenewalError::Token(e) => write!(f, "{}", e),
            RenewalError::Header(e) => write!(f, "Invalid cookie header: {}", e),
        }
    }
}

/// Rejection returned for any protected request that is not authenticated.
#[derive(Debug)]
pub struct AuthError {
    pub(super) kind: AuthErrorKind,
}

impl AuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &AuthErrorKind {
        &self.kind
    }
}

impl From<AuthErrorKind> for AuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthorized",
            }),
        )
            .into_response()
    }
}
