use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: appointments successfully created.
pub const APPOINTMENTS_CREATED_TOTAL: &str = "mowbook_appointments_created_total";

/// Counter: mutations rejected because the requested slot was taken.
pub const CONFLICTS_TOTAL: &str = "mowbook_conflicts_total";

/// Counter: failed password verifications (login and password change).
pub const AUTH_FAILURES_TOTAL: &str = "mowbook_auth_failures_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: live admin sessions.
pub const SESSIONS_ACTIVE: &str = "mowbook_sessions_active";

/// Histogram: appointment store flush duration in seconds.
pub const STORE_FLUSH_DURATION_SECONDS: &str = "mowbook_store_flush_duration_seconds";

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
