//! Authentication gate for protected routes.
//!
//! Every request must carry a valid session cookie. Tokens close to expiry are
//! reissued transparently: the request proceeds and the response carries a new
//! cookie. Any failure, including a failed reissue, rejects the request before
//! the handler runs.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use super::cookie::{SESSION_COOKIE_NAME, get_cookie, session_cookie};
use super::errors::{AuthError, AuthErrorKind, RenewalError};
use super::policy::TokenState;
use super::state::AuthState;
use super::types::Session;
use crate::jwt::{IssuedToken, unix_now};

/// Outcome of a successful authentication.
#[derive(Debug)]
pub struct Authenticated {
    pub session: Session,
    /// Replacement token when the presented one was inside the renewal window
    pub renewed: Option<Renewal>,
}

/// A reissued token together with its ready-to-send `Set-Cookie` value.
#[derive(Debug)]
pub struct Renewal {
    pub token: IssuedToken,
    pub cookie: HeaderValue,
}

/// Authenticate request headers at time `now` (Unix seconds).
pub fn authenticate(
    headers: &HeaderMap,
    auth: &AuthState,
    now: u64,
) -> Result<Authenticated, AuthErrorKind> {
    let token = get_cookie(headers, SESSION_COOKIE_NAME).ok_or(AuthErrorKind::MissingCookie)?;

    let claims = auth
        .codec
        .verify(token)
        .map_err(AuthErrorKind::InvalidToken)?;

    match auth.policy.classify(claims.exp, now) {
        TokenState::Expired => Err(AuthErrorKind::Expired),
        TokenState::Fresh => Ok(Authenticated {
            session: Session {
                expires_at: claims.exp,
                claims,
            },
            renewed: None,
        }),
        TokenState::Stale => {
            let renewal = renew(auth, &claims.username, now).map_err(AuthErrorKind::RenewalFailed)?;

            Ok(Authenticated {
                session: Session {
                    expires_at: renewal.token.expires_at,
                    claims,
                },
                renewed: Some(renewal),
            })
        }
    }
}

fn renew(auth: &AuthState, username: &str, now: u64) -> Result<Renewal, RenewalError> {
    let token = auth
        .codec
        .create_token_at(username, now)
        .map_err(RenewalError::Token)?;

    let cookie = HeaderValue::from_str(&session_cookie(
        &token.token,
        token.expires_at,
        &auth.cookies,
    ))
    .map_err(RenewalError::Header)?;

    Ok(Renewal { token, cookie })
}

/// Middleware enforcing a valid session on every request it wraps.
pub async fn require_session(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let now = match unix_now() {
        Ok(now) => now,
        Err(e) => {
            error!(error = %e, "Cannot authenticate request");
            return AuthError::new(AuthErrorKind::TimeError).into_response();
        }
    };

    let authenticated = match authenticate(request.headers(), &auth, now) {
        Ok(authenticated) => authenticated,
        Err(kind) => {
            log_rejection(request.uri().path(), &kind);
            return AuthError::new(kind).into_response();
        }
    };

    if let Some(renewal) = &authenticated.renewed {
        debug!(
            username = %authenticated.session.username(),
            expires_at = renewal.token.expires_at,
            "Session renewed"
        );
    }

    request.extensions_mut().insert(authenticated.session);

    let mut response = next.run(request).await;

    if let Some(renewal) = authenticated.renewed {
        response.headers_mut().append(SET_COOKIE, renewal.cookie);
    }

    response
}

fn log_rejection(path: &str, kind: &AuthErrorKind) {
    match kind {
        AuthErrorKind::MissingCookie | AuthErrorKind::Expired => {
            debug!(path = %path, reason = %kind, "Rejected request")
        }
        AuthErrorKind::InvalidToken(_) => warn!(path = %path, reason = %kind, "Rejected request"),
        AuthErrorKind::RenewalFailed(_) | AuthErrorKind::TimeError => {
            error!(path = %path, reason = %kind, "Rejected request")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CookieSettings, SessionPolicy};
    use crate::jwt::TokenError;
    use axum::http::header::COOKIE;
    use std::time::Duration;

    const MINUTE: u64 = 60;
    const NOW: u64 = 1_700_000_000;

    fn auth_state(secret: &[u8]) -> AuthState {
        auth_state_with_cookies(secret, CookieSettings::default())
    }

    fn auth_state_with_cookies(secret: &[u8], cookies: CookieSettings) -> AuthState {
        let policy = SessionPolicy::new(
            Duration::from_secs(120 * MINUTE),
            Duration::from_secs(30 * MINUTE),
        )
        .unwrap();
        AuthState::new(secret, policy, cookies)
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE_NAME, token)).unwrap(),
        );
        headers
    }

    /// Token for `alice` whose `exp - NOW` equals `remaining` seconds.
    fn token_with_remaining(auth: &AuthState, remaining: u64) -> String {
        let issued_at = NOW + remaining - auth.policy.ttl().as_secs();
        auth.codec.create_token_at("alice", issued_at).unwrap().token
    }

    #[test]
    fn test_missing_cookie() {
        let auth = auth_state(b"secret");
        let result = authenticate(&HeaderMap::new(), &auth, NOW);
        assert!(matches!(result, Err(AuthErrorKind::MissingCookie)));
    }

    #[test]
    fn test_fresh_token_not_renewed() {
        let auth = auth_state(b"secret");
        let token = token_with_remaining(&auth, 90 * MINUTE);

        let result = authenticate(&headers_with(&token), &auth, NOW).unwrap();
        assert_eq!(result.session.username(), "alice");
        assert_eq!(result.session.expires_at, NOW + 90 * MINUTE);
        assert!(result.renewed.is_none());
    }

    #[test]
    fn test_token_at_window_boundary_is_fresh() {
        let auth = auth_state(b"secret");
        let token = token_with_remaining(&auth, 30 * MINUTE);

        let result = authenticate(&headers_with(&token), &auth, NOW).unwrap();
        assert!(result.renewed.is_none());
    }

    #[test]
    fn test_stale_token_renewed() {
        let auth = auth_state(b"secret");
        let token = token_with_remaining(&auth, 29 * MINUTE);

        let result = authenticate(&headers_with(&token), &auth, NOW).unwrap();
        let renewed = result.renewed.expect("stale token should be renewed").token;

        assert_eq!(renewed.expires_at, NOW + 120 * MINUTE);
        assert!(renewed.expires_at > NOW + 29 * MINUTE);
        assert_eq!(result.session.expires_at, renewed.expires_at);

        let claims = auth.codec.verify(&renewed.token).unwrap();
        assert_eq!(claims.username, "alice");

        // The replacement is itself fresh
        let again = authenticate(&headers_with(&renewed.token), &auth, NOW).unwrap();
        assert!(again.renewed.is_none());
    }

    #[test]
    fn test_renewed_cookie_carries_new_token() {
        let auth = auth_state(b"secret");
        let token = token_with_remaining(&auth, 10 * MINUTE);

        let renewal = authenticate(&headers_with(&token), &auth, NOW)
            .unwrap()
            .renewed
            .unwrap();
        let cookie = renewal.cookie.to_str().unwrap();

        assert!(cookie.starts_with(&format!("TKN={};", renewal.token.token)));
    }

    #[test]
    fn test_stale_token_rejected_when_cookie_cannot_be_built() {
        let auth = auth_state_with_cookies(
            b"secret",
            CookieSettings {
                domain: Some("exa\x7fmple.com".to_string()),
                secure: false,
            },
        );
        let token = token_with_remaining(&auth, 10 * MINUTE);

        let result = authenticate(&headers_with(&token), &auth, NOW);
        assert!(matches!(
            result,
            Err(AuthErrorKind::RenewalFailed(RenewalError::Header(_)))
        ));

        // Fresh tokens never build a cookie and still pass
        let fresh = token_with_remaining(&auth, 90 * MINUTE);
        assert!(authenticate(&headers_with(&fresh), &auth, NOW).is_ok());
    }

    #[test]
    fn test_stale_token_rejected_when_signing_fails() {
        let auth = auth_state(b"secret");
        // 30s left, but `now + ttl` no longer fits in a u64
        let now = u64::MAX - 60;
        let issued_at = now - (auth.policy.ttl().as_secs() - 30);
        let token = auth.codec.create_token_at("alice", issued_at).unwrap().token;

        let result = authenticate(&headers_with(&token), &auth, now);
        assert!(matches!(
            result,
            Err(AuthErrorKind::RenewalFailed(RenewalError::Token(
                TokenError::ExpiryOverflow
            )))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = auth_state(b"secret");
        let token = auth.codec.create_token_at("alice", 0).unwrap().token;

        let result = authenticate(&headers_with(&token), &auth, NOW);
        assert!(matches!(result, Err(AuthErrorKind::Expired)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let auth = auth_state(b"secret");
        let other = auth_state(b"other-secret");
        let token = token_with_remaining(&other, 90 * MINUTE);

        let result = authenticate(&headers_with(&token), &auth, NOW);
        assert!(matches!(
            result,
            Err(AuthErrorKind::InvalidToken(TokenError::InvalidSignature))
        ));
    }

    #[test]
    fn test_expired_foreign_token_reports_signature() {
        let auth = auth_state(b"secret");
        let other = auth_state(b"other-secret");
        let token = other.codec.create_token_at("alice", 0).unwrap().token;

        let result = authenticate(&headers_with(&token), &auth, NOW);
        assert!(matches!(result, Err(AuthErrorKind::InvalidToken(_))));
    }
}
