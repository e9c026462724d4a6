//! Library for the NSX Application Platform metrics exporter
//!
//! This crate provides:
//! - A rate-limited client for the controller REST API
//! - Resource discovery, chunked metric retrieval and record shaping
//!   for edge nodes, tier-0 gateways, tier-0 interfaces and tier-1 gateways
//! - Prometheus text exposition of the collected records
//! - Health checks and self-observability

pub mod api;
pub mod client;
pub mod collector;
pub mod error;
pub mod exposition;
pub mod health;
pub mod models;
pub mod observability;

pub use error::{CollectorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ExporterMetrics, StructuredLogger};
