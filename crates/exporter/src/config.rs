//! Exporter configuration
//!
//! Read once at startup from `NSX_*` environment variables.

use anyhow::{bail, Context, Result};
use nsx_lib::client::{ClientConfig, RateLimitConfig};
use nsx_lib::collector::{CollectorConfig, DEFAULT_CHUNK_SIZE};
use serde::Deserialize;
use std::time::Duration;

/// Exporter configuration
#[derive(Clone, Deserialize)]
pub struct ExporterConfig {
    /// Controller hostname (NSX_HOST)
    pub host: String,

    /// API user (NSX_USER)
    #[serde(rename = "user")]
    pub username: String,

    /// API password (NSX_PASS)
    #[serde(rename = "pass")]
    pub password: String,

    /// Debug logging including request/response bodies (NSX_DEBUGMODE)
    #[serde(default, rename = "debugmode")]
    pub debug: bool,

    /// Calls allowed before the rate limiter pauses (NSX_RATELIMITER)
    #[serde(default = "default_rate_limit_threshold", rename = "ratelimiter")]
    pub rate_limit_threshold: u32,

    /// Whether the rate limiter pauses at all (NSX_RATELIMITING)
    #[serde(default = "default_true", rename = "ratelimiting")]
    pub rate_limiting: bool,

    /// Validate the controller certificate (NSX_VERIFY_TLS). Disabled by
    /// default since controllers usually present a self-signed certificate.
    #[serde(default)]
    pub verify_tls: bool,

    /// Metric keys per batch request (NSX_CHUNK_SIZE)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Port serving /metrics (NSX_PORT)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds (NSX_REQUEST_TIMEOUT_SECS)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Per-cycle timeout in seconds (NSX_CYCLE_TIMEOUT_SECS)
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,
}

fn default_rate_limit_threshold() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_port() -> u16 {
    8125
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cycle_timeout() -> u64 {
    120
}

impl std::fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("debug", &self.debug)
            .field("rate_limit_threshold", &self.rate_limit_threshold)
            .field("rate_limiting", &self.rate_limiting)
            .field("verify_tls", &self.verify_tls)
            .field("chunk_size", &self.chunk_size)
            .field("port", &self.port)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cycle_timeout_secs", &self.cycle_timeout_secs)
            .finish()
    }
}

impl ExporterConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix("NSX"))
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read NSX_* environment")?;

        let config: ExporterConfig = config
            .try_deserialize()
            .context("Invalid configuration: NSX_HOST, NSX_USER and NSX_PASS are required")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("NSX_HOST must not be empty");
        }
        if self.chunk_size == 0 {
            bail!("NSX_CHUNK_SIZE must be at least 1");
        }
        if self.rate_limiting && self.rate_limit_threshold == 0 {
            bail!("NSX_RATELIMITER must be at least 1 when rate limiting is enabled");
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: format!("https://{}", self.host),
            username: self.username.clone(),
            password: self.password.clone(),
            verify_tls: self.verify_tls,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            log_bodies: self.debug,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            threshold: self.rate_limit_threshold,
            enabled: self.rate_limiting,
            ..Default::default()
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            chunk_size: self.chunk_size,
            ..Default::default()
        }
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}
