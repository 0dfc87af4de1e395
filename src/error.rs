//! Typed errors for callers that need to tell failure modes apart.
//!
//! Everything else in the crate reports through `anyhow`.

use thiserror::Error;

/// Failures talking to a Model Context Protocol tool server.
#[derive(Debug, Error)]
pub enum MCPError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid message endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("event stream error: {0}")]
    Stream(String),

    #[error("server closed the event stream")]
    Closed,

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed server payload: {0}")]
    Decode(#[from] serde_json::Error),
}
