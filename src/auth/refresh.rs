//! Refresh token lifecycle: issue, rotate, revoke.
//!
//! Per user the token moves through `NONE -> ACTIVE`, then on use either
//! rotates back to `ACTIVE` with a new value, or drops to `NONE` when it has
//! expired or is revoked. The stored value is the only valid one; rotation
//! overwrites it, so a used token can never be presented twice.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::access::AccessTokenIssuer;
use super::cookie::RefreshCookie;
use super::errors::AuthError;
use super::state::UserDirectory;
use crate::db::{Database, RefreshTokenRecord, User};
use crate::jwt::{SignedToken, TokenCodec, TokenError, TokenKind};

/// A freshly issued refresh token and the cookie that carries it.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: SignedToken,
    pub cookie: RefreshCookie,
}

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct RotatedTokens {
    pub access_token: SignedToken,
    pub refresh: IssuedRefreshToken,
}

#[derive(Clone)]
pub struct RefreshTokenService {
    codec: Arc<TokenCodec>,
    access: AccessTokenIssuer,
    db: Database,
    users: Arc<dyn UserDirectory>,
    ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(
        codec: Arc<TokenCodec>,
        access: AccessTokenIssuer,
        db: Database,
        users: Arc<dyn UserDirectory>,
        ttl: Duration,
    ) -> Self {
        Self {
            codec,
            access,
            db,
            users,
            ttl,
        }
    }

    /// Issue a refresh token for `user`, replacing any token they already hold.
    pub async fn issue_for(&self, user: &User) -> Result<IssuedRefreshToken, AuthError> {
        let token = self.codec.sign(&user.email, TokenKind::Refresh, self.ttl)?;

        self.db
            .tokens()
            .put(user.id, &token.token, stored_expiry(&token)?)
            .await?;

        debug!(user_id = user.id, "Issued refresh token");

        let cookie = RefreshCookie::new(token.token.clone(), token.duration);
        Ok(IssuedRefreshToken { token, cookie })
    }

    /// Exchange a refresh token for a new access token and a new refresh token.
    pub async fn rotate(&self, presented: &str) -> Result<RotatedTokens, AuthError> {
        let record = self
            .db
            .tokens()
            .find_by_token(presented)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let subject = match self.codec.verify_subject(presented, TokenKind::Refresh) {
            Ok(subject) => subject,
            Err(TokenError::Expired) => return Err(self.expire(&record).await),
            Err(e) => return Err(e.into()),
        };

        let user = self
            .users
            .find_by_email(&subject)
            .await?
            .filter(|user| user.id == record.user_id)
            .ok_or_else(|| {
                warn!(user_id = record.user_id, "Refresh token subject does not match owner");
                AuthError::SubjectMismatch
            })?;

        if record.expires_at <= self.now() {
            return Err(self.expire(&record).await);
        }

        let token = self.codec.sign(&user.email, TokenKind::Refresh, self.ttl)?;
        let replaced = self
            .db
            .tokens()
            .replace(user.id, presented, &token.token, stored_expiry(&token)?)
            .await?;

        // Lost a race with another rotation or a logout
        if !replaced {
            return Err(AuthError::TokenNotFound);
        }

        let access_token = self.access.issue(&user.email)?;

        info!(user_id = user.id, "Rotated refresh token");

        let cookie = RefreshCookie::new(token.token.clone(), token.duration);
        Ok(RotatedTokens {
            access_token,
            refresh: IssuedRefreshToken { token, cookie },
        })
    }

    /// Delete the record holding `presented`.
    /// Fails with `TokenNotFound` if nothing was stored under that value.
    pub async fn revoke(&self, presented: &str) -> Result<(), AuthError> {
        if self.db.tokens().delete_by_token(presented).await? {
            Ok(())
        } else {
            Err(AuthError::TokenNotFound)
        }
    }

    /// Delete whatever refresh token `user_id` holds.
    pub async fn revoke_all(&self, user_id: i64) -> Result<bool, AuthError> {
        Ok(self.db.tokens().delete_by_user(user_id).await?)
    }

    /// True once the record's expiry lies strictly in the past.
    pub fn is_expired(&self, record: &RefreshTokenRecord) -> bool {
        record.expires_at < self.now()
    }

    fn now(&self) -> i64 {
        i64::try_from(self.codec.now()).unwrap_or(i64::MAX)
    }

    async fn expire(&self, record: &RefreshTokenRecord) -> AuthError {
        if let Err(e) = self.db.tokens().delete_by_token(&record.token).await {
            return e.into();
        }
        info!(user_id = record.user_id, "Deleted expired refresh token");
        AuthError::ExpiredToken
    }
}

/// Expiry as stored in the `expires_at` column.
fn stored_expiry(token: &SignedToken) -> Result<i64, AuthError> {
    i64::try_from(token.expires_at)
        .map_err(|_| AuthError::Internal("refresh token expiry out of range".to_string()))
}
