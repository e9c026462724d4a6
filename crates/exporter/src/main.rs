//! NSX exporter - Prometheus exporter for NSX Application Platform metrics
//!
//! Polls the controller for edge node, tier-0 gateway, tier-0 interface and
//! tier-1 gateway counters on every scrape and serves them on /metrics.

use anyhow::Result;
use nsx_lib::{
    api,
    client::{HttpController, RateLimiter},
    collector::NsxCollector,
    health::HealthRegistry,
    observability::{ExporterMetrics, StructuredLogger},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration comes first so debug mode can pick the log level
    let config = config::ExporterConfig::load()?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json())
        .init();

    info!(config = ?config, "Exporter configured");

    // Register self-metrics before the first scrape
    ExporterMetrics::new();

    let logger = StructuredLogger::new(&config.host);
    logger.log_startup(EXPORTER_VERSION, config.port);

    // One limiter for the whole process
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_config()));
    let controller = Arc::new(HttpController::new(config.client_config(), limiter)?);

    let health_registry = HealthRegistry::new();
    let collector = Arc::new(NsxCollector::new(
        controller,
        config.collector_config(),
        health_registry.clone(),
        logger.clone(),
    ));
    collector.register_health().await;

    let app_state = Arc::new(api::AppState::new(
        collector,
        health_registry.clone(),
        logger.clone(),
        config.cycle_timeout(),
    ));

    health_registry.set_ready(true).await;

    let server = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        result = server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
