//! Signed token encoding and verification.
//!
//! Access and refresh tokens share one format: an HS256 JWT carrying the
//! subject, issue and expiry timestamps, a random `jti`, and a token type.
//! Expiry is checked against the injected [`Clock`], not the system time.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived, stateless
    Access,
    /// Long-lived, persisted and rotated on use
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Unique token id; keeps two tokens minted in the same second distinct
    pub jti: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
}

/// Result of signing a token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// The compact JWT string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token lifetime in seconds
    pub duration: u64,
}

/// Token verification and signing failures.
///
/// `Expired` and `InvalidSignature` are kept apart so callers can tell
/// "log in again" from "somebody tampered with this".
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies tokens with a process-wide symmetric key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: SharedClock,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], clock: SharedClock) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            clock,
        }
    }

    /// Current time according to the codec's clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Sign a token for `subject` valid for `ttl` from now.
    pub fn sign(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<SignedToken, TokenError> {
        let now = self.clock.now();
        let duration = ttl.as_secs();
        let exp = now.saturating_add(duration);

        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
            kind,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(SignedToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration,
        })
    }

    /// Verify a token of the given kind and return its claims.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        // Parse the structure ourselves first so that a broken header or payload
        // is reported as malformed and anything failing after that as a bad signature.
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(TokenError::Malformed);
        }
        jsonwebtoken::decode_header(token).map_err(|_| TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(segments[1])
            .map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice::<Claims>(&payload).map_err(|_| TokenError::Malformed)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::InvalidSignature)?
            .claims;

        if self.clock.now() > claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.kind != kind {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }

    /// Verify a token and return only its subject.
    pub fn verify_subject(&self, token: &str, kind: TokenKind) -> Result<String, TokenError> {
        self.verify(token, kind).map(|claims| claims.sub)
    }
}
