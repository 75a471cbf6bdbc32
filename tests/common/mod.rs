#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use serde_json::Value;
use sessiongate::{
    ServerConfig,
    clock::ManualClock,
    create_app,
    db::Database,
    rate_limit::FixedWindowLimiter,
    server_config::{AuthSettings, RateLimitSettings},
};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough-for-hs256";

/// Clock start for tests, a fixed point well after the epoch
pub const START: u64 = 1_700_000_000;

pub const PASSWORD: &str = "correct horse battery";

/// Address test requests claim to come from
pub const CLIENT_IP: &str = "203.0.113.10";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub clock: ManualClock,
    pub limiter: Arc<FixedWindowLimiter>,
}

pub async fn setup() -> TestApp {
    setup_with_rate_limit(RateLimitSettings {
        max_requests: 1_000,
        window: Duration::from_secs(60),
        trust_forwarded_for: true,
    })
    .await
}

pub async fn setup_with_rate_limit(rate_limit: RateLimitSettings) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let clock = ManualClock::new(START);

    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: JWT_SECRET.to_vec(),
        auth: AuthSettings::default(),
        rate_limit,
        clock: Arc::new(clock.clone()),
    };
    let app = create_app(&config);

    TestApp {
        router: app.router,
        db,
        clock,
        limiter: app.limiter,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn register(&self, email: &str, username: &str) -> Response<Body> {
        let body = serde_json::json!({
            "email": email,
            "username": username,
            "password": PASSWORD,
        });
        self.send(json_request("/api/auth/register", &body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response<Body> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send(json_request("/api/auth/login", &body)).await
    }

    pub async fn refresh(&self, refresh_token: Option<&str>) -> Response<Body> {
        self.send(cookie_request("/api/auth/refresh", refresh_token))
            .await
    }

    pub async fn logout(&self, refresh_token: Option<&str>) -> Response<Body> {
        self.send(cookie_request("/api/auth/logout", refresh_token))
            .await
    }

    pub async fn me(&self, access_token: &str) -> Response<Body> {
        let request = Request::builder()
            .uri("/api/users/me")
            .header("x-forwarded-for", CLIENT_IP)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Register a user and return (access_token, refresh_token).
    pub async fn signed_up(&self, email: &str, username: &str) -> (String, String) {
        let response = self.register(email, username).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let refresh = refresh_cookie_value(&response).expect("register sets the refresh cookie");
        let body = body_json(response).await;
        let access = body["accessToken"]
            .as_str()
            .expect("accessToken in body")
            .to_string();
        (access, refresh)
    }
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn cookie_request(uri: &str, refresh_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP);
    if let Some(token) = refresh_token {
        builder = builder.header(header::COOKIE, format!("refreshToken={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Raw `Set-Cookie` header for the refresh cookie, if any.
pub fn refresh_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(str::to_string)
}

/// Value of the refresh cookie, if set to something non-empty.
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    let header = refresh_set_cookie(response)?;
    let value = header
        .strip_prefix("refreshToken=")?
        .split(';')
        .next()?
        .to_string();
    (!value.is_empty()).then_some(value)
}

/// True if the response clears the refresh cookie.
pub fn clears_refresh_cookie(response: &Response<Body>) -> bool {
    refresh_set_cookie(response)
        .is_some_and(|v| v.starts_with("refreshToken=;") && v.contains("Max-Age=0"))
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
