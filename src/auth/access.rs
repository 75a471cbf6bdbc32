//! Short-lived access token issuance and validation.

use std::sync::Arc;
use std::time::Duration;

use crate::jwt::{SignedToken, TokenCodec, TokenError, TokenKind};

/// Mints and checks access tokens with a fixed TTL.
#[derive(Debug, Clone)]
pub struct AccessTokenIssuer {
    codec: Arc<TokenCodec>,
    ttl: Duration,
}

impl AccessTokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, ttl: Duration) -> Self {
        Self { codec, ttl }
    }

    pub fn issue(&self, subject: &str) -> Result<SignedToken, TokenError> {
        self.codec.sign(subject, TokenKind::Access, self.ttl)
    }

    /// Recover the subject, keeping the failure kind for logging.
    pub fn subject(&self, token: &str) -> Result<String, TokenError> {
        self.codec.verify_subject(token, TokenKind::Access)
    }

    /// True only if the token verifies and was issued to `expected_subject`.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        matches!(self.subject(token), Ok(subject) if subject == expected_subject)
    }
}
