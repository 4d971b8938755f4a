//! Prometheus metrics helpers for pressroom.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pressroom_core::metrics::{start_metrics_server, try_init_metrics};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     if let Some(handle) = try_init_metrics() {
//!         start_metrics_server(9091, handle).await?;
//!     }
//!
//!     metrics::counter!("gateway_requests_total", "mode" => "draft").increment(1);
//!     Ok(())
//! }
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`gateway_`, `live_`, `draft_mode_`, `cache_`)
//! - Suffix: unit or type (`_total`, `_active`)
//! - Labels: only low-cardinality ones (`mode`, `action`)

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Install the Prometheus recorder and describe every pressroom series.
///
/// Returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_common_metrics();
    Some(handle)
}

/// Start the Prometheus metrics HTTP server.
///
/// Binds `0.0.0.0:{port}`, serves `/metrics` from a background task and
/// returns once the listener is bound.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

/// Register descriptions for every metric pressroom records.
fn register_common_metrics() {
    // =========================================================================
    // Query Execution Gateway
    // =========================================================================

    describe_counter!(
        "gateway_requests_total",
        "Content queries executed (label: mode)"
    );
    describe_counter!(
        "gateway_cache_hits_total",
        "Content queries answered from the tagged cache"
    );
    describe_counter!(
        "gateway_upstream_errors_total",
        "Content queries that failed upstream"
    );

    // =========================================================================
    // Draft Mode / Cache Invalidation
    // =========================================================================

    describe_counter!(
        "draft_mode_toggles_total",
        "Draft mode session changes (label: action)"
    );
    describe_counter!(
        "cache_invalidations_total",
        "Tag invalidations triggered by the webhook"
    );

    // =========================================================================
    // Live Updates
    // =========================================================================

    describe_gauge!(
        "live_subscriptions_active",
        "Live-update subscriptions currently mounted"
    );
    describe_counter!("live_updates_total", "Live updates applied to mounted views");
    describe_counter!("live_errors_total", "Live subscriptions that ended in error");
}

// =============================================================================
// Metric Recording Helpers
// =============================================================================

/// Increment a counter.
#[inline]
pub fn increment(name: &'static str, count: u64) {
    metrics::counter!(name).increment(count);
}

/// Adjust a gauge by `delta`.
#[inline]
pub fn adjust_gauge(name: &'static str, delta: f64) {
    if delta >= 0.0 {
        metrics::gauge!(name).increment(delta);
    } else {
        metrics::gauge!(name).decrement(-delta);
    }
}
