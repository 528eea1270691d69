//! Cookie-carried session tokens with sliding expiration.
//!
//! A login issues a signed token in the `TKN` cookie. The gate verifies it on
//! every protected request and reissues it when it enters the renewal window,
//! so active clients never have to log in again.

mod cookie;
mod errors;
mod gate;
mod ip;
mod policy;
mod state;
mod types;

pub use cookie::{
    CookieSettings, SESSION_COOKIE_NAME, clear_session_cookie, get_cookie, session_cookie,
};
pub use errors::{AuthError, AuthErrorKind, RenewalError};
pub use gate::{Authenticated, Renewal, authenticate, require_session};
pub use ip::extract_client_ip;
pub use policy::{DEFAULT_RENEW_WINDOW, MAX_SESSION_TTL, PolicyError, SessionPolicy, TokenState};
pub use state::AuthState;
pub use types::Session;
