//! Error types for controller access and metric collection

use thiserror::Error;

/// Errors raised while talking to the controller or interpreting its responses
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Network or TLS failure; the controller could not be reached
    #[error("transport failure calling {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The controller answered with a non-success status
    #[error("controller returned HTTP {status} for {path}")]
    Api { status: u16, path: String },

    /// The response body was not the JSON shape we expected
    #[error("malformed response from {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON that lacks a field required for this resource class
    #[error("unexpected response shape from {path}: {reason}")]
    Shape { path: String, reason: String },
}

impl CollectorError {
    /// Transport failures abort the rest of the collection cycle
    pub fn is_transport(&self) -> bool {
        matches!(self, CollectorError::Transport { .. })
    }

    /// Short label used for the `outcome` dimension of request metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CollectorError::Transport { .. } => "transport_error",
            CollectorError::Api { .. } => "api_error",
            CollectorError::Malformed { .. } => "malformed",
            CollectorError::Shape { .. } => "shape",
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
