//! Controller REST API access
//!
//! [`ControllerApi`] is the seam the collector talks through. The production
//! implementation is [`HttpController`]; tests substitute in-memory fakes.

mod http;
mod rate_limit;

pub use http::{ClientConfig, HttpController};
pub use rate_limit::{RateLimitConfig, RateLimiter};

use crate::error::{CollectorError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use async_trait::async_trait;

/// Raw JSON access to the controller
#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// Issue a GET and return the parsed body
    async fn get_json(&self, path: &str) -> Result<Value>;

    /// Issue a POST with a JSON body and return the parsed response
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Decode a JSON value into a typed response, naming the path on mismatch
pub fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| CollectorError::Malformed {
        path: path.to_string(),
        source,
    })
}

/// GET a path and decode it into `T`
pub async fn get_typed<T: DeserializeOwned>(api: &dyn ControllerApi, path: &str) -> Result<T> {
    let value = api.get_json(path).await?;
    decode(path, value)
}
