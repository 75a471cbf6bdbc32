//! Endpoints for the signed-in user.
//!
//! - GET `/me` - Profile of the authenticated user
//! - DELETE `/me` - Delete the account and every session it holds

use axum::{
    Json, Router,
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tracing::info;

use super::ApiState;
use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, RefreshCookie};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/me", get(me).delete(delete_me))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    email: String,
    username: String,
    role: &'static str,
    email_verified: bool,
}

async fn me(Auth(user): Auth) -> Json<MeResponse> {
    Json(MeResponse {
        email: user.email,
        username: user.username,
        role: user.role.as_str(),
        email_verified: user.email_verified,
    })
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn delete_me(
    State(state): State<ApiState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.backend.refresh.revoke_all(user.user_id).await?;

    let deleted = state
        .backend
        .users
        .delete(user.user_id)
        .await
        .db_err("Failed to delete user")?;

    if deleted {
        info!(user_id = user.user_id, "Deleted user");
    }

    Ok((
        [(SET_COOKIE, RefreshCookie::cleared().to_header())],
        Json(DeleteResponse { success: true }),
    ))
}
