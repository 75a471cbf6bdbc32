//! Per-request bearer token authentication.
//!
//! The middleware never rejects a request. A missing or bad token only means
//! no identity is attached; handlers that require one use the [`Auth`]
//! extractor, which turns the absence into a 401.
//!
//! [`Auth`]: super::Auth

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use super::cookie::bearer_token;
use super::state::AuthBackend;
use super::types::AuthenticatedUser;

/// Attach an [`AuthenticatedUser`] to the request if it carries a valid access token.
pub async fn authenticate(
    State(backend): State<AuthBackend>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none()
        && let Some(user) = resolve_identity(&backend, request.headers()).await
    {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

async fn resolve_identity(backend: &AuthBackend, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let token = bearer_token(headers)?;

    let subject = match backend.access.subject(token) {
        Ok(subject) => subject,
        Err(e) => {
            warn!(error = %e, "Ignoring bearer token");
            return None;
        }
    };

    let user = match backend.users.find_by_email(&subject).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Bearer token subject has no matching user");
            return None;
        }
        Err(e) => {
            error!(error = %e, "Failed to look up token subject");
            return None;
        }
    };

    // The lookup is case-insensitive; the token must name this exact identity
    if !backend.access.validate(token, &user.email) {
        warn!(user_id = user.id, "Bearer token subject does not match user");
        return None;
    }

    Some(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Auth, OptionalAuth};
    use crate::clock::ManualClock;
    use crate::db::{Database, NewUser, UserRole};
    use crate::server_config::AuthSettings;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn setup() -> (Router, AuthBackend, ManualClock) {
        let db = Database::open(":memory:").await.unwrap();
        db.users()
            .create(&NewUser {
                email: "u1@example.com".to_string(),
                username: "u1".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            })
            .await
            .unwrap();

        let clock = ManualClock::new(1_700_000_000);
        let backend = AuthBackend::new(
            &db,
            b"test-secret-key-for-testing-0123456789",
            AuthSettings::default(),
            Arc::new(clock.clone()),
        );

        let app = Router::new()
            .route(
                "/whoami",
                get(|OptionalAuth(user): OptionalAuth| async move {
                    user.map(|u| u.email).unwrap_or_else(|| "anonymous".to_string())
                }),
            )
            .route(
                "/private",
                get(|Auth(user): Auth| async move { user.username }),
            )
            .layer(middleware::from_fn_with_state(backend.clone(), authenticate));

        (app, backend, clock)
    }

    async fn get_text(app: Router, uri: &str, auth: Option<String>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let (app, backend, _) = setup().await;
        let token = backend.access.issue("u1@example.com").unwrap().token;

        let (status, body) =
            get_text(app.clone(), "/whoami", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1@example.com");

        let (status, body) = get_text(app, "/private", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_passes_through() {
        let (app, _, _) = setup().await;

        for auth in [
            None,
            Some("Bearer garbage".to_string()),
            Some("Basic dTE6cHc=".to_string()),
            Some("Bearer a.b.c".to_string()),
        ] {
            let (status, body) = get_text(app.clone(), "/whoami", auth.clone()).await;
            assert_eq!(status, StatusCode::OK, "{:?}", auth);
            assert_eq!(body, "anonymous");

            let (status, body) = get_text(app.clone(), "/private", auth).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(!body.contains("garbage"), "token must not be echoed");
        }
    }

    #[tokio::test]
    async fn test_expired_token_passes_through_unauthenticated() {
        let (app, backend, clock) = setup().await;
        let token = backend.access.issue("u1@example.com").unwrap().token;

        clock.advance(15 * 60 + 1);

        let (status, body) = get_text(app, "/whoami", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_unknown_subject_passes_through() {
        let (app, backend, _) = setup().await;
        let token = backend.access.issue("ghost@example.com").unwrap().token;

        let (status, _) = get_text(app, "/private", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_subject_case_drift_is_rejected() {
        let (app, backend, _) = setup().await;
        // Finds the user through the case-insensitive lookup but names a different subject
        let token = backend.access.issue("U1@EXAMPLE.COM").unwrap().token;

        let (status, body) = get_text(app, "/whoami", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_existing_identity_is_not_overwritten() {
        let (_, backend, _) = setup().await;
        let token = backend.access.issue("u1@example.com").unwrap().token;

        let app = Router::new()
            .route("/whoami", get(|Auth(user): Auth| async move { user.email }))
            .layer(middleware::from_fn_with_state(backend.clone(), authenticate))
            .layer(middleware::from_fn(
                |mut request: Request, next: Next| async move {
                    request.extensions_mut().insert(AuthenticatedUser {
                        user_id: 99,
                        email: "preset@example.com".to_string(),
                        username: "preset".to_string(),
                        role: UserRole::Admin,
                        email_verified: true,
                    });
                    next.run(request).await
                },
            ));

        let (status, body) = get_text(app, "/whoami", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "preset@example.com");
    }
}
