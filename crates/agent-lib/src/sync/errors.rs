//! Errors raised while talking to DX

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransmitError {
    /// DX answered with `ok: false` (any HTTP status)
    #[error("Error communicating with DX: {0}")]
    Remote(String),

    /// Non-2xx response without an embedded failure flag
    #[error("Error communicating with DX ({status}): {body}")]
    Transport { status: StatusCode, body: String },

    /// 2xx response whose body is not JSON
    #[error("Error communicating with DX: unreadable response ({status}): {source}")]
    InvalidResponse {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("Error communicating with DX: {0}")]
    Network(#[from] reqwest::Error),

    /// Ingest protocol: some chunks were rejected, the rest were delivered
    #[error("{failed} of {total} ingest chunks failed; first failure: {first}")]
    Ingest {
        failed: usize,
        total: usize,
        #[source]
        first: Box<TransmitError>,
    },
}

impl TransmitError {
    pub fn is_remote(&self) -> bool {
        matches!(self, TransmitError::Remote(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, TransmitError::Transport { .. })
    }
}
