//! Session cookie parsing and `Set-Cookie` construction.

use axum::http::header;
use chrono::{DateTime, Utc};

/// Cookie name carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "TKN";

/// Cookie attributes shared by every session cookie the server sets.
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    /// `Domain` attribute (omitted when `None`)
    pub domain: Option<String>,
    /// Whether to set the `Secure` flag
    pub secure: bool,
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Build the `Set-Cookie` value for a session token expiring at `expires_at`.
pub fn session_cookie(token: &str, expires_at: u64, settings: &CookieSettings) -> String {
    format!(
        "{}={}; Expires={}; HttpOnly; SameSite=Strict; Path=/{}",
        SESSION_COOKIE_NAME,
        token,
        http_date(expires_at),
        attributes(settings)
    )
}

/// Build the `Set-Cookie` value that makes the client drop its session cookie.
pub fn clear_session_cookie(settings: &CookieSettings) -> String {
    format!(
        "{}=; Expires={}; Max-Age=0; HttpOnly; SameSite=Strict; Path=/{}",
        SESSION_COOKIE_NAME,
        http_date(0),
        attributes(settings)
    )
}

fn attributes(settings: &CookieSettings) -> String {
    let mut attrs = String::new();
    if let Some(domain) = &settings.domain {
        attrs.push_str("; Domain=");
        attrs.push_str(domain);
    }
    if settings.secure {
        attrs.push_str("; Secure");
    }
    attrs
}

/// Format Unix seconds as an IMF-fixdate (`Thu, 01 Jan 1970 00:00:00 GMT`).
fn http_date(secs: u64) -> String {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
