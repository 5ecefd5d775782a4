//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::get,
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tunedeck_logins_total", "Total number of login attempts"),
        &["method", "outcome"]
    ).expect("metric can be created");
    pub static ref SESSIONS_ISSUED_TOTAL: IntCounter = IntCounter::new(
        "tunedeck_sessions_issued_total",
        "Total number of session tokens issued"
    ).expect("metric can be created");
    pub static ref SESSION_VERIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "tunedeck_session_verifications_total",
            "Total number of session token verifications at the gate"
        ),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref ACCOUNTS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tunedeck_accounts_created_total", "Total number of accounts created"),
        &["method"]
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tunedeck_errors_total", "Total number of application errors"),
        &["code"]
    ).expect("metric can be created");
}

/// Register all metrics with the global registry.
///
/// Must be called once at startup, before the first request.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ISSUED_TOTAL.clone()))
        .expect("SESSIONS_ISSUED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSION_VERIFICATIONS_TOTAL.clone()))
        .expect("SESSION_VERIFICATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACCOUNTS_CREATED_TOTAL.clone()))
        .expect("ACCOUNTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registered");
}

/// Metrics endpoint handler
///
/// Returns all metrics in Prometheus text format.
async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(metrics_handler))
}
