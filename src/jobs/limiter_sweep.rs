use std::time::Duration;

use tracing::{debug, info};

use crate::app::rate_limiter::RateLimiter;

/// Periodically evict stale throttle entries so the map stays bounded under
/// sustained traffic from many distinct actor/resource pairs. Runs for the
/// life of the process; disabled sweeping shows up only as memory growth.
pub async fn run(limiter: RateLimiter, interval: Duration) {
    info!(interval_seconds = interval.as_secs(), "rate limiter sweeper started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let removed = limiter.sweep();
        if removed > 0 {
            debug!(removed, remaining = limiter.len(), "swept stale throttle entries");
        }
    }
}
