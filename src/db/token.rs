//! Refresh token storage for rotation and revocation.
//!
//! Each user owns at most one refresh token row. Issuing a new token for a
//! user overwrites the existing row instead of adding another one.
//! Access tokens are stateless and never stored.

use sqlx::sqlite::SqlitePool;

/// A persisted refresh token record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

/// Store for managing refresh tokens.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the refresh token owned by `user_id`.
    ///
    /// The `UNIQUE(user_id)` constraint serializes concurrent writers for the
    /// same owner; the last one wins and no duplicate row is ever created.
    pub async fn put(
        &self,
        user_id: i64,
        token: &str,
        expires_at: i64,
    ) -> Result<RefreshTokenRecord, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET token = excluded.token, expires_at = excluded.expires_at
             RETURNING id, user_id, token, expires_at",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Replace the owner's token only if it still holds `current`.
    /// Returns false when another writer rotated or revoked it first.
    pub async fn replace(
        &self,
        user_id: i64,
        current: &str,
        token: &str,
        expires_at: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET token = ?, expires_at = ? WHERE user_id = ? AND token = ?",
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .bind(current)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a record by its exact token value.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, user_id, token, expires_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get the record owned by a user.
    pub async fn find_by_user(
        &self,
        user_id: i64,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, user_id, token, expires_at FROM refresh_tokens WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a record by its token value (revoke).
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the record owned by a user.
    pub async fn delete_by_user(&self, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all records that expired before `now`.
    pub async fn delete_expired(&self, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count stored records.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
