//! Client IP extraction.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::HeaderMap, http::Extensions};

/// Extract the client IP address.
///
/// With `trust_proxy`, the first address of `X-Forwarded-For` is used and a
/// missing header is an error (no fallback to the socket address, which would
/// be the proxy's). Otherwise the peer address from `ConnectInfo` is used.
pub fn extract_client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy: bool,
) -> Result<String, &'static str> {
    if trust_proxy {
        let value = headers
            .get("x-forwarded-for")
            .ok_or("X-Forwarded-For header not present")?
            .to_str()
            .map_err(|_| "X-Forwarded-For contains invalid characters")?;
        let first = value.split(',').next().unwrap_or("").trim();
        if first.is_empty() {
            return Err("X-Forwarded-For is empty");
        }
        return Ok(first.to_string());
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .ok_or("No client IP available")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_first_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, &Extensions::new(), true).unwrap();
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_required_behind_proxy() {
        assert!(extract_client_ip(&HeaderMap::new(), &Extensions::new(), true).is_err());
    }

    #[test]
    fn test_forwarded_for_ignored_without_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));

        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let ip = extract_client_ip(&headers, &extensions, false).unwrap();
        assert_eq!(ip, "127.0.0.1");
    }
}
