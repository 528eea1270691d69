//! Sliding-expiration policy for verified session tokens.

use std::time::Duration;

/// Default renewal window: 30 minutes before expiry.
pub const DEFAULT_RENEW_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Longest accepted session lifetime: 365 days.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Temporal state of a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// At least `renew_window` left: accept as is.
    Fresh,
    /// Still valid but inside the renewal window: accept and reissue.
    Stale,
    /// `exp` is at or before now.
    Expired,
}

/// Session lifetime and renewal window, validated once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    ttl: Duration,
    renew_window: Duration,
}

impl SessionPolicy {
    /// Build a policy. The renewal window must be strictly shorter than the
    /// lifetime, otherwise every new token would immediately qualify for renewal.
    pub fn new(ttl: Duration, renew_window: Duration) -> Result<Self, PolicyError> {
        if ttl.as_secs() == 0 {
            return Err(PolicyError::ZeroTtl);
        }
        if ttl > MAX_SESSION_TTL {
            return Err(PolicyError::TtlTooLong { ttl });
        }
        if renew_window >= ttl {
            return Err(PolicyError::WindowNotShorterThanTtl { ttl, renew_window });
        }
        Ok(Self { ttl, renew_window })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn renew_window(&self) -> Duration {
        self.renew_window
    }

    /// Classify a token expiring at `exp` at time `now` (both Unix seconds).
    pub fn classify(&self, exp: u64, now: u64) -> TokenState {
        if exp <= now {
            return TokenState::Expired;
        }
        if exp - now < self.renew_window.as_secs() {
            TokenState::Stale
        } else {
            TokenState::Fresh
        }
    }
}

/// Invalid session timing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    ZeroTtl,
    TtlTooLong {
        ttl: Duration,
    },
    WindowNotShorterThanTtl {
        ttl: Duration,
        renew_window: Duration,
    },
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::ZeroTtl => write!(f, "Session lifetime must be at least one second"),
            PolicyError::TtlTooLong { ttl } => write!(
                f,
                "Session lifetime ({}s) exceeds the maximum of {}s",
                ttl.as_secs(),
                MAX_SESSION_TTL.as_secs()
            ),
            PolicyError::WindowNotShorterThanTtl { ttl, renew_window } => write!(
                f,
                "Renewal window ({}s) must be shorter than the session lifetime ({}s)",
                renew_window.as_secs(),
                ttl.as_secs()
            ),
        }
    }
}

impl std::error::Error for PolicyError {}
