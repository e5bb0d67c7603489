use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use tracing::{error, info};

use crate::clock::Clock;
use crate::observability;
use crate::store::ReservationStore;

const WEEK_SECONDS: i64 = 7 * 24 * 3600;

/// Seconds from `now` until the next weekly reset boundary: Monday 00:00 in
/// the reference timezone, strictly in the future (on the boundary itself
/// the next one is a full week away).
pub fn secs_until_next_reset(now: DateTime<FixedOffset>) -> u64 {
    let days_to_monday = (7 - now.weekday().num_days_from_monday() as i64) % 7;
    let secs_today = now.time().num_seconds_from_midnight() as i64;
    let mut wait = days_to_monday * 24 * 3600 - secs_today;
    if wait <= 0 {
        wait += WEEK_SECONDS;
    }
    wait as u64
}

/// Background task that clears every reservation at each weekly boundary.
///
/// The sweep is unconditional: no per-user exemption, no partial delete, and
/// user rows are never touched. A failed sweep is logged and waits for the
/// next boundary; nothing is surfaced to request traffic.
pub async fn run_sweeper(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) {
    loop {
        let wait = secs_until_next_reset(clock.now());
        info!("next weekly reset in {wait}s");
        tokio::time::sleep(Duration::from_secs(wait)).await;

        match store.delete_all().await {
            Ok(cleared) => {
                info!("weekly reset cleared {cleared} reservations");
                metrics::counter!(observability::SWEEPS_TOTAL).increment(1);
                metrics::gauge!(observability::RESERVATIONS_ACTIVE).set(0.0);
            }
            Err(e) => {
                error!("weekly reset failed: {e}");
                metrics::counter!(observability::SWEEP_FAILURES_TOTAL).increment(1);
            }
        }
    }
}
