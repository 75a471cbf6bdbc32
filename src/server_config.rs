//! Token lifetimes and rate-limit parameters loaded once at startup.

use std::time::Duration;

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: u64 = 15;

/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: u64 = 7;

/// Longest accepted access token lifetime: 1 day
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: u64 = 24 * 60;

/// Longest accepted refresh token lifetime: 1 year
pub const MAX_REFRESH_TOKEN_TTL_DAYS: u64 = 365;

/// Default rate-limit ceiling per window
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 10;

/// Default rate-limit window: 1 minute
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthSettings {
    /// Lifetimes are clamped to the accepted maximums.
    pub fn from_units(access_minutes: u64, refresh_days: u64) -> Self {
        let access_minutes = access_minutes.min(MAX_ACCESS_TOKEN_TTL_MINUTES);
        let refresh_days = refresh_days.min(MAX_REFRESH_TOKEN_TTL_DAYS);
        Self {
            access_token_ttl: Duration::from_secs(access_minutes * 60),
            refresh_token_ttl: Duration::from_secs(refresh_days * 24 * 60 * 60),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::from_units(
            DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            DEFAULT_REFRESH_TOKEN_TTL_DAYS,
        )
    }
}

/// Fixed-window rate limiting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests admitted per key per window
    pub max_requests: u32,
    /// Interval between global counter resets
    pub window: Duration,
    /// Key clients by the first `X-Forwarded-For` entry instead of the socket address.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            trust_forwarded_for: false,
        }
    }
}
