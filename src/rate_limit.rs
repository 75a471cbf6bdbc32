//! Fixed-window rate limiting for authentication endpoints.
//!
//! Every client key gets a counter. Once it reaches the ceiling further
//! requests are rejected until the next global reset, which clears all
//! counters at once on a fixed period. A client is never blocked for longer
//! than one window after the last reset.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::auth::{AuthError, extract_client_key};
use crate::server_config::RateLimitSettings;

/// Per-key request counters with a global reset.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    counters: RwLock<HashMap<String, Arc<AtomicU32>>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, settings.window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request for `key`. Returns false, without counting, once the
    /// key has used up its allowance for the current window.
    pub fn admit(&self, key: &str) -> bool {
        let counter = self.counter(key);
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < self.max_requests).then_some(count + 1)
            })
            .is_ok()
    }

    /// Clear every counter.
    pub fn reset(&self) {
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        counters.clear();
    }

    /// Number of keys seen since the last reset.
    pub fn tracked_keys(&self) -> usize {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn counter(&self, key: &str) -> Arc<AtomicU32> {
        if let Some(counter) = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return counter.clone();
        }

        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

/// Spawn a background task that resets the limiter every window.
/// Returns a handle that can be used to abort the task.
pub fn spawn_reset_scheduler(limiter: Arc<FixedWindowLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let keys = limiter.tracked_keys();
            limiter.reset();
            debug!(keys, "Reset rate limit counters");
        }
    })
}

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<FixedWindowLimiter>,
    pub trust_forwarded_for: bool,
}

/// Middleware rejecting clients that exceeded their allowance.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let key = match extract_client_key(&request, state.trust_forwarded_for) {
        Ok(key) => key,
        Err(reason) => {
            warn!(reason, "Unable to determine client IP");
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    if state.limiter.admit(&key) {
        next.run(request).await
    } else {
        warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        AuthError::RateLimited.into_response()
    }
}
