use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: schedule mutations. Labels: op (add/remove/cancel/uncancel), outcome.
pub const MUTATIONS_TOTAL: &str = "roomfinder_mutations_total";

/// Histogram: query latency in seconds. Labels: query.
pub const QUERY_DURATION_SECONDS: &str = "roomfinder_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: document log group-commit flush duration in seconds.
pub const LOG_FLUSH_DURATION_SECONDS: &str = "roomfinder_log_flush_duration_seconds";

/// Histogram: document log group-commit batch size (records per flush).
pub const LOG_FLUSH_BATCH_SIZE: &str = "roomfinder_log_flush_batch_size";

/// Gauge: rooms held by the document store.
pub const ROOMS_LOADED: &str = "roomfinder_rooms_loaded";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub fn record_mutation(op: &'static str, outcome: &'static str) {
    metrics::counter!(MUTATIONS_TOTAL, "op" => op, "outcome" => outcome).increment(1);
}
