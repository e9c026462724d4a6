//! HTTPS client for the controller with basic authentication

use super::{async_trait, ControllerApi, RateLimiter};
use crate::error::{CollectorError, Result};
use crate::observability::ExporterMetrics;
use anyhow::Context;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the controller client
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. "https://nsx-manager.local"
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Validate the controller certificate. Off by default because the
    /// controller ships with a self-signed certificate.
    pub verify_tls: bool,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Log every request path and response body at debug level
    pub log_bodies: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            username: String::new(),
            password: String::new(),
            verify_tls: false,
            request_timeout: Duration::from_secs(30),
            log_bodies: false,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout", &self.request_timeout)
            .field("log_bodies", &self.log_bodies)
            .finish()
    }
}

/// Controller client over reqwest
pub struct HttpController {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    log_bodies: bool,
    limiter: Arc<RateLimiter>,
    metrics: ExporterMetrics,
}

impl HttpController {
    /// Build a client; the rate limiter is shared process-wide
    pub fn new(config: ClientConfig, limiter: Arc<RateLimiter>) -> anyhow::Result<Self> {
        if !config.verify_tls {
            warn!(
                base_url = %config.base_url,
                "Controller certificate validation is disabled"
            );
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("Invalid controller URL")?;

        Ok(Self {
            client,
            base_url,
            username: config.username,
            password: config.password,
            log_bodies: config.log_bodies,
            limiter,
            metrics: ExporterMetrics::new(),
        })
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.limiter.acquire().await;

        let method_label = method.as_str().to_string();
        let result = self.send(method, path, body).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        self.metrics.inc_api_request(&method_label, outcome);

        result
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| CollectorError::Shape {
                path: path.to_string(),
                reason: format!("invalid request path: {}", e),
            })?;

        if self.log_bodies {
            debug!(method = %method, path = %path, body = ?body, "Controller request");
        }

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |source| CollectorError::Transport {
            path: path.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if self.log_bodies {
            debug!(path = %path, status = status.as_u16(), body = %text, "Controller response");
        }

        if !status.is_success() {
            warn!(path = %path, status = status.as_u16(), "Controller request failed");
            return Err(CollectorError::Api {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        serde_json::from_str(&text).map_err(|source| CollectorError::Malformed {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ControllerApi for HttpController {
    async fn get_json(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }
}
