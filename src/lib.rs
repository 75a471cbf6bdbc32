pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod server_config;

use api::{ApiState, create_api_router};
use auth::AuthBackend;
use axum::Router;
use clock::SharedClock;
use db::Database;
use password::Argon2Encoder;
use rate_limit::{FixedWindowLimiter, RateLimitState};
use server_config::{AuthSettings, RateLimitSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Token lifetimes
    pub auth: AuthSettings,
    /// Rate limiting for the credential endpoints
    pub rate_limit: RateLimitSettings,
    /// Time source for token issue and expiry checks
    pub clock: SharedClock,
}

/// The assembled application.
pub struct App {
    pub router: Router,
    /// Shared with the router; the reset scheduler and tests clear it directly
    pub limiter: Arc<FixedWindowLimiter>,
    pub backend: AuthBackend,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> App {
    let backend = AuthBackend::new(
        &config.db,
        &config.jwt_secret,
        config.auth,
        config.clock.clone(),
    );

    let limiter = Arc::new(FixedWindowLimiter::from_settings(&config.rate_limit));
    let rate_limit_state = RateLimitState {
        limiter: limiter.clone(),
        trust_forwarded_for: config.rate_limit.trust_forwarded_for,
    };

    let state = ApiState::new(backend.clone(), Arc::new(Argon2Encoder));

    let router = Router::new().nest("/api", create_api_router(state, rate_limit_state));

    App {
        router,
        limiter,
        backend,
    }
}

/// Run cleanup once and spawn the background schedulers.
/// Call this before starting the server.
pub async fn init_background_tasks(config: &ServerConfig, limiter: Arc<FixedWindowLimiter>) {
    cleanup::run_cleanup(&config.db, &config.clock).await;
    cleanup::spawn_cleanup_scheduler(config.db.clone(), config.clock.clone());
    rate_limit::spawn_reset_scheduler(limiter);
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    init_background_tasks(&config, app.limiter.clone()).await;

    let make_service = app
        .router
        .into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
