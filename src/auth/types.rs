//! Authenticated session types.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{AuthError, AuthErrorKind};
use crate::jwt::SessionClaims;

/// A verified session, inserted into request extensions by the gate.
#[derive(Debug, Clone)]
pub struct Session {
    /// Claims of the token the request was authenticated with
    pub claims: SessionClaims,
    /// Expiry of the session as seen by the client after this request
    /// (differs from `claims.exp` when the gate renewed the token)
    pub expires_at: u64,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.claims.username
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AuthError::new(AuthErrorKind::MissingCookie))
    }
}
