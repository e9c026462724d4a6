//! HTTP API: scrape endpoint plus health checks
//!
//! Every `GET /metrics` runs a full collection cycle; nothing is cached
//! between scrapes.

use crate::collector::NsxCollector;
use crate::exposition;
use crate::health::{ComponentStatus, HealthRegistry};
use crate::observability::{ExporterMetrics, StructuredLogger};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<NsxCollector>,
    pub health_registry: HealthRegistry,
    pub metrics: ExporterMetrics,
    pub logger: StructuredLogger,
    /// Upper bound for one collection cycle
    pub cycle_timeout: Duration,
}

impl AppState {
    pub fn new(
        collector: Arc<NsxCollector>,
        health_registry: HealthRegistry,
        logger: StructuredLogger,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            collector,
            health_registry,
            metrics: ExporterMetrics::new(),
            logger,
            cycle_timeout,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Scrape endpoint: run one cycle and render its records
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let report = match tokio::time::timeout(state.cycle_timeout, state.collector.collect()).await
    {
        Ok(report) => report,
        Err(_) => {
            state.metrics.inc_cycle_timeouts();
            state.logger.log_cycle_timeout(state.cycle_timeout);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "collection cycle timed out\n",
            )
                .into_response();
        }
    };

    if report.is_total_failure() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "no resource class could be collected\n",
        )
            .into_response();
    }

    match exposition::render(report.records()) {
        Ok((buffer, exported)) => {
            state.metrics.set_records_exported(exported as i64);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, exposition::content_type())],
                buffer,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics\n").into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting metrics server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
