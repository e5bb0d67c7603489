use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reserve decisions. Labels: outcome (accepted or rejection reason).
pub const RESERVE_DECISIONS_TOTAL: &str = "slotd_reserve_decisions_total";

/// Counter: cancel decisions. Labels: outcome (cancelled or rejection reason).
pub const CANCEL_DECISIONS_TOTAL: &str = "slotd_cancel_decisions_total";

// ── USE metrics (state) ─────────────────────────────────────────

/// Gauge: currently active reservations.
pub const RESERVATIONS_ACTIVE: &str = "slotd_reservations_active";

/// Counter: completed weekly sweeps.
pub const SWEEPS_TOTAL: &str = "slotd_sweeps_total";

/// Counter: weekly sweeps that failed (deferred to the next boundary).
pub const SWEEP_FAILURES_TOTAL: &str = "slotd_sweep_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
