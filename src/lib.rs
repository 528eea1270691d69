pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::{create_api_router, create_auth_router};
use auth::{AuthState, CookieSettings, SessionPolicy, require_session};
use axum::{Router, middleware};
use db::Database;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing session tokens
    pub session_secret: Vec<u8>,
    /// Session lifetime and renewal window
    pub policy: SessionPolicy,
    /// Domain attribute for the session cookie
    pub app_domain: Option<String>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Take client IPs from X-Forwarded-For (requires running behind a proxy)
    pub trust_proxy: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let rate_limit = Arc::new(RateLimitConfig::new(config.trust_proxy));
    create_app_with_rate_limit(config, rate_limit)
}

/// Create the application router with explicit rate limits.
pub fn create_app_with_rate_limit(
    config: &ServerConfig,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth = AuthState::new(
        &config.session_secret,
        config.policy,
        CookieSettings {
            domain: config.app_domain.clone(),
            secure: config.secure_cookies,
        },
    );

    let auth_router = create_auth_router(config.db.clone(), auth.clone(), rate_limit);

    let api_router = create_api_router(config.db.clone())
        .layer(middleware::from_fn_with_state(auth, require_session));

    Router::new()
        .nest("/auth", auth_router)
        .nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
