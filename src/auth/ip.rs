//! Client key extraction for rate limiting.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Extract the key a client is counted under.
///
/// With `trust_forwarded_for` the first `X-Forwarded-For` entry is used and a
/// missing header is an error (no fallback to the socket address, which would
/// be the proxy). Otherwise the peer address from `ConnectInfo` is used.
pub fn extract_client_key(
    request: &Request,
    trust_forwarded_for: bool,
) -> Result<String, &'static str> {
    if trust_forwarded_for {
        let value = request
            .headers()
            .get("x-forwarded-for")
            .ok_or("X-Forwarded-For header not present")?
            .to_str()
            .map_err(|_| "X-Forwarded-For header contains invalid characters")?;
        let first = value.split(',').next().unwrap_or_default().trim();
        if first.is_empty() {
            return Err("X-Forwarded-For header is empty");
        }
        return Ok(first.to_string());
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .ok_or("No client IP available")
}
