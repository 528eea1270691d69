//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::api::{ApiError, validate_password, validate_username};
use crate::auth::{DEFAULT_RENEW_WINDOW, SessionPolicy};
use crate::db::Database;
use crate::jwt::DEFAULT_SESSION_TTL;
use crate::password::hash_password;
use clap::Parser;
use tracing::{error, info, warn};
use uuid::Uuid;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "acg", about = "Content backend with cookie sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "9999")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "acg.db")]
    pub database: String,

    /// Domain attribute for the session cookie (e.g. "example.com")
    #[arg(long, env = "APP_DOMAIN")]
    pub app_domain: Option<String>,

    /// Path to file containing the session secret. Prefer using SESSION_SECRET env var instead
    #[arg(long)]
    pub session_secret_file: Option<String>,

    /// Session lifetime in minutes
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL.as_secs() / 60)]
    pub session_ttl_minutes: u64,

    /// Reissue session tokens with less than this many minutes left
    #[arg(long, default_value_t = DEFAULT_RENEW_WINDOW.as_secs() / 60)]
    pub renew_window_minutes: u64,

    /// Set the Secure flag on session cookies (enable when served over HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Take client IPs from X-Forwarded-For (only behind a trusted reverse proxy)
    #[arg(long)]
    pub trust_proxy: bool,

    /// Create a user on startup. The password is read from ACG_USER_PASSWORD
    #[arg(long, value_name = "USERNAME")]
    pub create_user: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the session secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_session_secret(session_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("SESSION_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("SESSION_SECRET") };
        secret
    } else if let Some(path) = session_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read session secret file");
                return None;
            }
        }
    } else {
        error!(
            "Session secret is required. Set SESSION_SECRET environment variable (recommended) or use --session-secret-file"
        );
        return None;
    };

    validate_session_secret(&secret)?;
    Some(secret)
}

fn validate_session_secret(secret: &str) -> Option<()> {
    if secret.len() < MIN_SESSION_SECRET_LENGTH {
        error!(
            "Session secret is shorter than {} characters. Use a longer secret",
            MIN_SESSION_SECRET_LENGTH
        );
        return None;
    }
    Some(())
}

/// Build the session policy from the configured minutes.
/// Returns None and logs an error if the renewal window is not shorter than the lifetime.
pub fn build_policy(ttl_minutes: u64, renew_window_minutes: u64) -> Option<SessionPolicy> {
    let ttl = Duration::from_secs(ttl_minutes.saturating_mul(60));
    let renew_window = Duration::from_secs(renew_window_minutes.saturating_mul(60));

    match SessionPolicy::new(ttl, renew_window) {
        Ok(policy) => Some(policy),
        Err(e) => {
            error!(error = %e, "Invalid session timing");
            None
        }
    }
}

/// Normalize the cookie domain: trimmed, no scheme, no port, no path.
/// Anything left that is not a plain hostname is rejected.
pub fn normalize_app_domain(domain: Option<String>) -> Result<Option<String>, &'static str> {
    let Some(domain) = domain else {
        return Ok(None);
    };
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    let domain = domain.split(['/', ':']).next().unwrap_or("");

    if domain.is_empty() {
        return Ok(None);
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err("App domain may only contain letters, digits, '-' and '.'");
    }

    Ok(Some(domain.to_ascii_lowercase()))
}

/// Handle the --create-user flag: create the user with the password from ACG_USER_PASSWORD.
pub async fn handle_create_user(db: &Database, username: &str) {
    let Ok(password) = std::env::var("ACG_USER_PASSWORD") else {
        error!("--create-user requires the ACG_USER_PASSWORD environment variable");
        std::process::exit(1);
    };
    // SAFETY: single-threaded startup, nothing else reads this variable.
    unsafe { std::env::remove_var("ACG_USER_PASSWORD") };

    let username = match validate_new_user(username, &password) {
        Ok(username) => username,
        Err(e) => {
            error!(error = ?e, "Invalid --create-user account");
            std::process::exit(1);
        }
    };

    match db.users().is_username_available(username).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(username = %username, "User already exists, not creating");
            return;
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }

    let hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            std::process::exit(1);
        }
    };

    let uuid = Uuid::new_v4().to_string();
    match db.users().create(&uuid, username, &hash, None).await {
        Ok(_) => info!(username = %username, "User created"),
        Err(e) => {
            error!(error = %e, "Failed to create user");
            std::process::exit(1);
        }
    }
}

/// Apply the same rules as account creation over the API.
/// Returns the trimmed username that will be stored.
fn validate_new_user<'a>(username: &'a str, password: &str) -> Result<&'a str, ApiError> {
    let username = username.trim();
    validate_username(username)?;
    validate_password(password)?;
    Ok(username)
}

/// Warn when nobody can log in yet.
pub async fn warn_if_no_users(db: &Database) {
    match db.users().count().await {
        Ok(0) => warn!("No users registered. Use --create-user to create the first account"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to count users"),
    }
}

/// Build ServerConfig from validated arguments. `app_domain` must already be normalized.
pub fn build_config(
    db: Database,
    session_secret: String,
    policy: SessionPolicy,
    app_domain: Option<String>,
    secure_cookies: bool,
    trust_proxy: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        session_secret: session_secret.into_bytes(),
        policy,
        app_domain,
        secure_cookies,
        trust_proxy,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
