//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::clock::system_clock;
use crate::db::Database;
use crate::server_config::{
    AuthSettings, DEFAULT_ACCESS_TOKEN_TTL_MINUTES, DEFAULT_RATE_LIMIT_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_MS, DEFAULT_REFRESH_TOKEN_TTL_DAYS, MAX_ACCESS_TOKEN_TTL_MINUTES,
    MAX_REFRESH_TOKEN_TTL_DAYS, RateLimitSettings,
};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessiongate",
    about = "Token-based user authentication backend"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "sessiongate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in minutes (at most one day)
    #[arg(long, env = "ACCESS_TOKEN_TTL_MINUTES", default_value_t = DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
        value_parser = clap::value_parser!(u64).range(1..=MAX_ACCESS_TOKEN_TTL_MINUTES))]
    pub access_token_ttl_minutes: u64,

    /// Refresh token lifetime in days (at most one year)
    #[arg(long, env = "REFRESH_TOKEN_TTL_DAYS", default_value_t = DEFAULT_REFRESH_TOKEN_TTL_DAYS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_REFRESH_TOKEN_TTL_DAYS))]
    pub refresh_token_ttl_days: u64,

    /// Requests each client may make to the auth endpoints per window
    #[arg(long, env = "RATE_LIMIT_REQUESTS", default_value_t = DEFAULT_RATE_LIMIT_REQUESTS,
        value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit_requests: u32,

    /// Length of the rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = DEFAULT_RATE_LIMIT_WINDOW_MS,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_limit_window_ms: u64,

    /// Identify clients by the first X-Forwarded-For entry (only behind a trusted proxy)
    #[arg(long, env = "TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        auth: AuthSettings::from_units(args.access_token_ttl_minutes, args.refresh_token_ttl_days),
        rate_limit: RateLimitSettings {
            max_requests: args.rate_limit_requests,
            window: Duration::from_millis(args.rate_limit_window_ms),
            trust_forwarded_for: args.trust_forwarded_for,
        },
        clock: system_clock(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sessiongate"]).unwrap();
        assert_eq!(args.access_token_ttl_minutes, 15);
        assert_eq!(args.refresh_token_ttl_days, 7);
        assert_eq!(args.rate_limit_requests, 10);
        assert_eq!(args.rate_limit_window_ms, 60_000);
        assert!(!args.trust_forwarded_for);
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(Args::try_parse_from(["sessiongate", "--rate-limit-requests", "0"]).is_err());
        assert!(Args::try_parse_from(["sessiongate", "--rate-limit-window-ms", "0"]).is_err());
        assert!(Args::try_parse_from(["sessiongate", "--access-token-ttl-minutes", "0"]).is_err());
    }

    #[test]
    fn test_oversized_lifetimes_rejected() {
        assert!(
            Args::try_parse_from(["sessiongate", "--refresh-token-ttl-days", "300000000000000"])
                .is_err()
        );
        assert!(Args::try_parse_from(["sessiongate", "--refresh-token-ttl-days", "366"]).is_err());
        assert!(
            Args::try_parse_from(["sessiongate", "--access-token-ttl-minutes", "1441"]).is_err()
        );

        let args = Args::try_parse_from([
            "sessiongate",
            "--refresh-token-ttl-days",
            "365",
            "--access-token-ttl-minutes",
            "1440",
        ])
        .unwrap();
        assert_eq!(args.refresh_token_ttl_days, 365);
        assert_eq!(args.access_token_ttl_minutes, 1440);
    }
}
