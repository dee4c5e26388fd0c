use std::time::Duration;

use tracing::{info, warn};

use crate::state::AppState;

const REAP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn start_session_reaper(state: AppState) {
    let ttl = state.config.session_ttl();
    info!("🧹 Starting session reaper (idle ttl {:?})", ttl);

    let mut ticker = tokio::time::interval(REAP_INTERVAL);
    loop {
        ticker.tick().await;
        reap_expired(&state, ttl);
    }
}

/// Ends sessions idle for longer than `ttl` and reclaims their staged
/// uploads. Returns how many sessions were ended.
pub fn reap_expired(state: &AppState, ttl: Duration) -> usize {
    let expired = state.sessions.expire(ttl);
    let count = expired.len();

    for (id, session) in expired {
        if let Some(input) = session.into_staged() {
            info!("Reclaiming staged input {} of expired session {}", input.id(), id);
            state.controller.finalize(input, None);
        }
    }

    if count > 0 {
        info!(
            "Expired {} idle sessions, {} still open",
            count,
            state.sessions.len()
        );
        match state.controller.storage().count() {
            Ok(left) => info!("{} transient files still in use", left),
            Err(e) => warn!("Could not inspect transient storage: {}", e),
        }
    }

    count
}
