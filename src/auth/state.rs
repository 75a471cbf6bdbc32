//! Shared authentication backend and the user lookup it depends on.

use std::sync::Arc;

use async_trait::async_trait;

use super::access::AccessTokenIssuer;
use super::refresh::RefreshTokenService;
use crate::clock::SharedClock;
use crate::db::{Database, NewUser, User};
use crate::jwt::TokenCodec;
use crate::server_config::AuthSettings;

/// User lookup owned by the account-management side of the application.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    async fn save(&self, user: &NewUser) -> Result<User, sqlx::Error>;
    async fn delete(&self, id: i64) -> Result<bool, sqlx::Error>;
}

/// Everything the middleware and token endpoints need, cheap to clone.
#[derive(Clone)]
pub struct AuthBackend {
    pub access: AccessTokenIssuer,
    pub refresh: RefreshTokenService,
    pub users: Arc<dyn UserDirectory>,
}

impl AuthBackend {
    /// Wire the backend against the database's user store.
    pub fn new(db: &Database, secret: &[u8], settings: AuthSettings, clock: SharedClock) -> Self {
        let codec = Arc::new(TokenCodec::new(secret, clock));
        let users: Arc<dyn UserDirectory> = Arc::new(db.users());
        let access = AccessTokenIssuer::new(codec.clone(), settings.access_token_ttl);
        let refresh = RefreshTokenService::new(
            codec,
            access.clone(),
            db.clone(),
            users.clone(),
            settings.refresh_token_ttl,
        );

        Self {
            access,
            refresh,
            users,
        }
    }
}
