//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::TokenError;

/// Literal body returned to rate-limited clients.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Failures of the token lifecycle and request admission.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    ExpiredToken,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("token subject does not match its owner")]
    SubjectMismatch,
    #[error("token not found")]
    TokenNotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed => Self::MalformedToken,
            TokenError::InvalidSignature => Self::InvalidSignature,
            TokenError::Expired => Self::ExpiredToken,
            TokenError::WrongTokenType => Self::WrongTokenType,
            TokenError::Encoding(e) => Self::Internal(e.to_string()),
        }
    }
}

impl AuthError {
    /// True when the presented credential can never succeed again.
    /// Infrastructure failures leave a stored refresh token usable.
    pub fn is_dead_credential(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken
                | Self::InvalidSignature
                | Self::ExpiredToken
                | Self::WrongTokenType
                | Self::SubjectMismatch
                | Self::TokenNotFound
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedToken
            | Self::InvalidSignature
            | Self::WrongTokenType
            | Self::SubjectMismatch
            | Self::TokenNotFound
            | Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            // The refresh token is gone for good: log in again instead of retrying
            Self::ExpiredToken => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::MalformedToken
            | Self::InvalidSignature
            | Self::WrongTokenType
            | Self::SubjectMismatch
            | Self::TokenNotFound => "Invalid refresh token",
            Self::ExpiredToken => "Refresh token expired. Please log in again",
            Self::RateLimited => RATE_LIMITED_MESSAGE,
            Self::NotAuthenticated => "Not authenticated",
            Self::Database(_) => "Database error",
            Self::Internal(_) => "Internal error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        match &self {
            Self::RateLimited => return (self.status_code(), self.message()).into_response(),
            Self::Database(e) => tracing::error!(error = %e, "Database error during authentication"),
            Self::Internal(e) => tracing::error!(error = %e, "Internal authentication error"),
            _ => {}
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
