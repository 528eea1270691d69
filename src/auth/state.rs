//! Shared, read-only authentication state.

use std::sync::Arc;

use super::cookie::CookieSettings;
use super::policy::SessionPolicy;
use crate::jwt::SessionCodec;

/// Everything the gate and the login/logout handlers need. Built once in
/// [`crate::create_app`] and cloned into each router; never mutated.
#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<SessionCodec>,
    pub policy: SessionPolicy,
    pub cookies: Arc<CookieSettings>,
}

impl AuthState {
    pub fn new(secret: &[u8], policy: SessionPolicy, cookies: CookieSettings) -> Self {
        Self {
            codec: Arc::new(SessionCodec::new(secret, policy.ttl())),
            policy,
            cookies: Arc::new(cookies),
        }
    }
}
