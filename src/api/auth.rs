//! Credential endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/login` - Check email and password and start a session

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::info;

use super::error::{ApiError, ResultExt};
use super::{AccessTokenResponse, ApiState};
use crate::db::{NewUser, User, UserRole};
use crate::password::PasswordEncoder;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_USERNAME_LENGTH: usize = 32;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(ApiError::bad_request("Invalid email address")),
    }
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "Password cannot be longer than 128 characters",
        ));
    }
    Ok(())
}

/// Hash on the blocking pool; Argon2 is deliberately slow.
async fn encode_password(
    passwords: Arc<dyn PasswordEncoder>,
    raw: String,
) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || passwords.encode(&raw))
        .await
        .map_err(|e| ApiError::internal(format!("Password task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            ApiError::internal("Failed to hash password")
        })
}

async fn password_matches(
    passwords: Arc<dyn PasswordEncoder>,
    raw: String,
    encoded: String,
) -> bool {
    tokio::task::spawn_blocking(move || passwords.matches(&raw, &encoded))
        .await
        .unwrap_or(false)
}

/// Hash checked when the email is unknown, so both login failures
/// pay for one password verification.
async fn dummy_hash(state: &ApiState) -> Option<String> {
    if let Some(hash) = state.dummy_hash.get() {
        return Some(hash.clone());
    }
    let hash = encode_password(state.passwords.clone(), "placeholder-password".to_string())
        .await
        .ok()?;
    Some(state.dummy_hash.get_or_init(|| hash).clone())
}

/// Issue the access/refresh pair for a freshly authenticated user.
async fn start_session(
    state: &ApiState,
    user: &User,
    status: StatusCode,
) -> Result<Response, ApiError> {
    let refresh = state.backend.refresh.issue_for(user).await?;
    let access = state
        .backend
        .access
        .issue(&user.email)
        .map_err(crate::auth::AuthError::from)?;

    Ok((
        status,
        [(SET_COOKIE, refresh.cookie.to_header())],
        Json(AccessTokenResponse {
            access_token: access.token,
        }),
    )
        .into_response())
}

async fn register(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim();

    validate_email(&email)?;
    validate_username(username)?;
    validate_password(&payload.password)?;

    let users = &state.backend.users;

    if users
        .find_by_email(&email)
        .await
        .db_err("Failed to check email")?
        .is_some()
    {
        return Err(ApiError::conflict("Email is already registered"));
    }

    if users
        .find_by_username(username)
        .await
        .db_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let password_hash = encode_password(state.passwords.clone(), payload.password).await?;

    let user = users
        .save(&NewUser {
            email,
            username: username.to_string(),
            password_hash,
            role: UserRole::User,
        })
        .await
        .map_err(|e| match e.as_database_error() {
            // Lost a race with a concurrent registration
            Some(db_err) if db_err.is_unique_violation() => {
                ApiError::conflict("Email or username is already taken")
            }
            _ => ApiError::db_error("Failed to create user", e),
        })?;

    info!(user_id = user.id, "Registered user");

    start_session(&state, &user, StatusCode::CREATED).await
}

async fn login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .backend
        .users
        .find_by_email(&email)
        .await
        .db_err("Failed to get user")?;

    // Same answer and same work for unknown email and wrong password
    let Some(user) = user else {
        if let Some(hash) = dummy_hash(&state).await {
            password_matches(state.passwords.clone(), payload.password, hash).await;
        }
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    if !password_matches(
        state.passwords.clone(),
        payload.password,
        user.password_hash.clone(),
    )
    .await
    {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    info!(user_id = user.id, "User logged in");

    start_session(&state, &user, StatusCode::OK).await
}
