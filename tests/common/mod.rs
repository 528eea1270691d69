#![allow(dead_code)]

use acg::{
    ServerConfig,
    auth::SessionPolicy,
    create_app_with_rate_limit,
    db::Database,
    jwt::{SessionCodec, unix_now},
    password::hash_password,
    rate_limit::RateLimitConfig,
};
use axum::{
    body::Body,
    http::{Request, Response},
};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SECRET: &[u8] = b"test-session-secret-for-testing-0123456789";
pub const TEST_IP: &str = "127.0.0.1";
pub const TTL_SECS: u64 = 2 * 60 * 60;
pub const RENEW_WINDOW_SECS: u64 = 30 * 60;

pub struct TestApp {
    pub app: axum::Router,
    pub db: Database,
    /// Codec sharing the app's secret and lifetime, for minting tokens directly
    pub codec: SessionCodec,
}

pub fn test_policy() -> SessionPolicy {
    SessionPolicy::new(
        Duration::from_secs(TTL_SECS),
        Duration::from_secs(RENEW_WINDOW_SECS),
    )
    .unwrap()
}

/// Create a test app on an in-memory database. Client IPs come from X-Forwarded-For.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_domain(None).await
}

pub async fn create_test_app_with_domain(app_domain: Option<&str>) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        session_secret: TEST_SECRET.to_vec(),
        policy: test_policy(),
        app_domain: app_domain.map(|d| d.to_string()),
        secure_cookies: false,
        trust_proxy: true,
    };
    let app = create_app_with_rate_limit(&config, Arc::new(RateLimitConfig::new(true)));

    TestApp {
        app,
        db,
        codec: SessionCodec::new(TEST_SECRET, Duration::from_secs(TTL_SECS)),
    }
}

/// Store a user with the given password.
pub async fn create_user(db: &Database, username: &str, password: &str) {
    let hash = hash_password(password).unwrap();
    let uuid = uuid::Uuid::new_v4().to_string();
    db.users().create(&uuid, username, &hash, None).await.unwrap();
}

/// Token for `username` whose remaining lifetime is `remaining` seconds.
pub fn token_with_remaining(codec: &SessionCodec, username: &str, remaining: i64) -> String {
    let now = unix_now().unwrap() as i64;
    let issued_at = now + remaining - TTL_SECS as i64;
    codec
        .create_token_at(username, issued_at as u64)
        .unwrap()
        .token
}

pub fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", TEST_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("cookie", format!("TKN={}", token))
        .body(Body::empty())
        .unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of the `TKN` cookie set on the response, if any.
pub fn session_token_from(response: &Response<Body>) -> Option<String> {
    extract_set_cookies(response)
        .into_iter()
        .find_map(|c| {
            c.strip_prefix("TKN=")
                .and_then(|rest| rest.split(';').next())
                .map(|v| v.to_string())
        })
        .filter(|v| !v.is_empty())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
