//! Error types for the validator monitor.

use reqwest::StatusCode;
use std::{
    io,
    net::SocketAddr,
};
use thiserror::Error;

/// Failure fetching a resource from the node's RPC surface.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a response.
    #[error("HTTP request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The node answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    /// The node answered 2xx but the body carried a JSON-RPC error object.
    #[error("{endpoint} returned JSON-RPC error {code}: {message}")]
    JsonRpc {
        endpoint: String,
        code: i64,
        message: String,
        body: String,
    },

    /// The body did not match the expected shape.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// A required field was missing or could not be parsed.
    #[error("invalid {field} in response from {endpoint}: {value:?}")]
    InvalidField {
        endpoint: String,
        field: &'static str,
        value: String,
        /// Raw response body; empty until attached by the HTTP client.
        body: String,
    },

    #[error("invalid RPC URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RpcError {
    /// Raw diagnostic text carried into the fetch-failure alert.
    ///
    /// Prefers the response body as the node sent it; falls back to the
    /// error description when no body was received.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Status { body, .. } | Self::JsonRpc { body, .. } | Self::Decode { body, .. } => {
                body.clone()
            }
            Self::InvalidField { body, .. } if !body.is_empty() => body.clone(),
            Self::Transport { source, .. } => source.to_string(),
            Self::InvalidField { .. } | Self::Url(_) => self.to_string(),
        }
    }

    /// Attach the raw response body to an [`RpcError::InvalidField`].
    pub(crate) fn with_body(self, raw: &str) -> Self {
        match self {
            Self::InvalidField {
                endpoint,
                field,
                value,
                body,
            } if body.is_empty() => {
                Self::InvalidField {
                    endpoint,
                    field,
                    value,
                    body: raw.to_string(),
                }
            }
            other => other,
        }
    }
}

/// Failure delivering an alert to the webhook.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("HTTP request to alert webhook failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert webhook rejected message with HTTP {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Failure loading or validating the monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A monitor cycle that aborted before completing every check.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Failure of the inbound trigger surface.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind trigger server address: {addr}")]
    BindAddress {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("trigger server error on {addr}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}
