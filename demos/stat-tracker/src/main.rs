//! A tiny "game" that records one finished match through the companion.
//!
//! Launch it the way the companion would:
//!
//! ```text
//! RUST_LOG=lanyard=debug,stat_tracker=info \
//!     stat-tracker --token <t> --user-id <u> --port 7423
//! ```

use std::time::Duration;

use lanyard::prelude::*;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

const GAME_ID: &str = "stat-tracker";

const MATCHES_PLAYED: &str = "matches_played";
const MINUTES_PLAYED: &str = "minutes_played";
const FIRST_MATCH: &str = "first_match";
const TEN_MATCHES: &str = "ten_matches";

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

/// Count one finished match and push the new totals.
///
/// Returns the number of matches played so far.
async fn record_match<P: RemoteSessionProvider>(
    lanyard: &Lanyard<P>,
    length: Duration,
) -> Result<i64, LanyardError> {
    let stats = lanyard.stats();
    if !stats.is_loaded() {
        stats.request_stats().await?;
    }

    let matches = stats.get_int(MATCHES_PLAYED)? + 1;
    stats.set_int(MATCHES_PLAYED, matches)?;
    let minutes = stats.get_float(MINUTES_PLAYED)? + length.as_secs_f64() / 60.0;
    stats.set_float(MINUTES_PLAYED, minutes)?;
    stats.store_stats().await?;

    let achievements = lanyard.achievements();
    if !achievements.is_unlocked(FIRST_MATCH) {
        achievements.unlock(FIRST_MATCH).await?;
    }
    achievements
        .set_progress(TEN_MATCHES, matches as f32 / 10.0)
        .await?;

    Ok(matches)
}

/// Log companion events until the bus closes. Returns how many were seen.
async fn log_events(mut events: broadcast::Receiver<Event>) -> usize {
    let mut seen = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                seen += 1;
                info!(?event, "companion event");
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log fell behind"),
            Err(RecvError::Closed) => return seen,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), LanyardError> {
    lanyard::init_tracing_with("lanyard=info,stat_tracker=info");

    let lanyard = Lanyard::builder().build_http(HttpConfig::default(), ProcessHost)?;

    tokio::spawn(log_events(lanyard.subscribe()));

    // On failure the process is already on its way out.
    if let Err(err) = lanyard.authenticate(Identity::game(GAME_ID)).await {
        warn!(error = %err, "not authenticated");
        return Err(err);
    }
    if let Ok(user) = lanyard.user_info().await {
        info!(user = %user.name, "playing as");
    }

    let matches = record_match(&lanyard, Duration::from_secs(7 * 60)).await?;
    info!(matches, "match recorded");

    lanyard.shutdown();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
