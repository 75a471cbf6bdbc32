//! Refresh cookie formatting and request header parsing.

use axum::http::{HeaderMap, header};

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
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

/// Extract the token from an `Authorization: Bearer <token>` header.
/// Returns None if the header is missing, not a bearer credential, or empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Refresh cookie descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCookie {
    pub value: String,
    /// Max-Age in seconds; 0 clears the cookie
    pub max_age: u64,
}

impl RefreshCookie {
    pub fn new(value: impl Into<String>, max_age: u64) -> Self {
        Self {
            value: value.into(),
            max_age,
        }
    }

    /// Cookie that removes the refresh token from the client.
    pub fn cleared() -> Self {
        Self::new("", 0)
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header(&self) -> String {
        format!(
            "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
            REFRESH_COOKIE_NAME, self.value, self.max_age
        )
    }
}
