//! Token management API endpoints.
//!
//! - POST `/refresh` - Exchange the refresh cookie for a new token pair
//! - POST `/logout` - Revoke the refresh token and clear the cookie

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::ApiError;
use super::{AccessTokenResponse, ApiState};
use crate::auth::{AuthError, REFRESH_COOKIE_NAME, RefreshCookie, get_cookie};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
}

/// Rotate the refresh token.
/// A dead credential clears the cookie; a server-side failure leaves it in place
/// so the client can retry.
async fn refresh_token(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(presented) = get_cookie(&headers, REFRESH_COOKIE_NAME) else {
        return ApiError::unauthorized("No refresh token").into_response();
    };

    match state.backend.refresh.rotate(presented).await {
        Ok(rotated) => (
            [(SET_COOKIE, rotated.refresh.cookie.to_header())],
            Json(AccessTokenResponse {
                access_token: rotated.access_token.token,
            }),
        )
            .into_response(),
        Err(e) if e.is_dead_credential() => {
            debug!(error = %e, "Refresh rejected");
            (
                [(SET_COOKIE, RefreshCookie::cleared().to_header())],
                ApiError::from(e),
            )
                .into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Revoke the presented refresh token.
/// Always succeeds from the client's point of view.
async fn logout(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(presented) = get_cookie(&headers, REFRESH_COOKIE_NAME) {
        match state.backend.refresh.revoke(presented).await {
            Ok(()) => debug!("Revoked refresh token on logout"),
            Err(AuthError::TokenNotFound) => debug!("Logout with unknown refresh token"),
            Err(e) => warn!(error = %e, "Failed to revoke refresh token on logout"),
        }
    }

    (
        [(SET_COOKIE, RefreshCookie::cleared().to_header())],
        Json(LogoutResponse { success: true }),
    )
}
