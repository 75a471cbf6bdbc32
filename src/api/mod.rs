mod auth;
mod error;
mod tokens;
mod users;

use std::sync::{Arc, OnceLock};

use axum::{Router, middleware};
use serde::Serialize;
use tower::ServiceBuilder;

use crate::auth::{AuthBackend, authenticate};
use crate::password::PasswordEncoder;
use crate::rate_limit::{RateLimitState, rate_limit};

pub use error::ApiError;

/// State shared by all API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub backend: AuthBackend,
    pub passwords: Arc<dyn PasswordEncoder>,
    /// Hash verified for unknown emails; built on first use
    dummy_hash: Arc<OnceLock<String>>,
}

impl ApiState {
    pub fn new(backend: AuthBackend, passwords: Arc<dyn PasswordEncoder>) -> Self {
        Self {
            backend,
            passwords,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }
}

/// Body returned whenever a new access token is handed out.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
}

/// Create the API router.
///
/// Credential endpoints are rate limited before authentication runs;
/// user endpoints only pass through authentication.
pub fn create_api_router(state: ApiState, rate_limit_state: RateLimitState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.backend.clone(), authenticate);

    let auth_routes = Router::new()
        .merge(auth::router(state.clone()))
        .merge(tokens::router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit))
                .layer(auth_layer.clone()),
        );

    let user_routes = users::router(state).layer(auth_layer);

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
}
