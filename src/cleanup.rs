//! Scheduled cleanup of expired refresh tokens.
//!
//! Rotation and logout already delete tokens they touch; this catches the ones
//! that simply ran out without ever being presented again.

use std::time::Duration;

use tracing::{error, info};

use crate::clock::SharedClock;
use crate::db::Database;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once. Returns the number of deleted tokens.
pub async fn run_cleanup(db: &Database, clock: &SharedClock) -> u64 {
    match db.tokens().delete_expired(clock.now() as i64).await {
        Ok(count) => {
            if count > 0 {
                info!("Cleaned up {} expired refresh tokens", count);
            }
            count
        }
        Err(e) => {
            error!("Failed to clean up expired refresh tokens: {}", e);
            0
        }
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database, clock: SharedClock) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db, &clock).await;
        }
    })
}
