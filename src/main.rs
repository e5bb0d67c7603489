use std::sync::Arc;

use chrono::FixedOffset;
use tracing::info;

use slotd::clock::SystemClock;
use slotd::store::MemoryStore;
use slotd::sweeper;

/// Weekly reset worker: runs the sweep schedule against the reservation
/// store, independent of any request traffic.
///
/// The store here is a process-local `MemoryStore`; a deployment plugs in a
/// durable `ReservationStore` backend shared with the request path, and
/// until then this binary exercises the schedule wiring only.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("SLOTD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    slotd::observability::init(metrics_port);

    let offset_minutes: i32 = std::env::var("SLOTD_UTC_OFFSET_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .ok_or("SLOTD_UTC_OFFSET_MINUTES out of range")?;

    let clock = Arc::new(SystemClock::new(offset));
    let store = Arc::new(MemoryStore::new());

    info!("slotd reset worker starting");
    info!("  reference offset: {offset}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    let sweeper = tokio::spawn(sweeper::run_sweeper(store, clock));

    // Stop cleanly on SIGTERM/ctrl-c.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    shutdown.await;

    info!("shutdown signal received");
    sweeper.abort();
    info!("slotd reset worker stopped");
    Ok(())
}
