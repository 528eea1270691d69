//! Session token creation and verification.
//!
//! Tokens are HS256 JWTs carrying only the username and an absolute expiry.
//! The codec reports structural and signature validity; whether an `exp` is
//! still acceptable is decided by [`crate::auth::SessionPolicy`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The only algorithm tokens are signed and accepted with.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Default session lifetime: 2 hours
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated principal
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly signed session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds), mirrors the `exp` claim
    pub expires_at: u64,
}

/// Signs and verifies session tokens with the process-wide secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionCodec {
    /// Create a codec with the given secret and session lifetime.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `username` expiring `ttl` from now.
    pub fn create_token(&self, username: &str) -> Result<IssuedToken, TokenError> {
        self.create_token_at(username, unix_now()?)
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn create_token_at(&self, username: &str, now: u64) -> Result<IssuedToken, TokenError> {
        if username.is_empty() {
            return Err(TokenError::EmptyUsername);
        }

        let exp = now
            .checked_add(self.ttl.as_secs())
            .ok_or(TokenError::ExpiryOverflow)?;
        let claims = SessionClaims {
            username: username.to_string(),
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Verify the signature and shape of `token` and return its claims.
    ///
    /// Expiry is not checked here.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(TokenError::from_decode)?;

        if token_data.claims.username.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(token_data.claims)
    }
}

/// Current time as Unix seconds.
pub fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::TimeError)
}

/// Errors that can occur while creating or verifying session tokens.
#[derive(Debug)]
pub enum TokenError {
    /// Signature mismatch, or the token was signed with another algorithm
    InvalidSignature,
    /// Token could not be parsed into the expected claims
    Malformed,
    /// Refused to sign a token without a username
    EmptyUsername,
    /// `now + ttl` does not fit in a Unix timestamp
    ExpiryOverflow,
    /// The signing primitive failed
    Signing(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl TokenError {
    fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::EmptyUsername => write!(f, "Username must not be empty"),
            TokenError::ExpiryOverflow => write!(f, "Token expiry out of range"),
            TokenError::Signing(e) => write!(f, "Failed to sign token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}
