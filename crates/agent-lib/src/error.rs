//! Error types shared across the sync pipeline

use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::sync::TransmitError;
use thiserror::Error;

/// Invalid configuration, detected before the sync task is scheduled
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration for `{key}`: {message}")]
    InvalidDuration { key: String, message: String },

    #[error("`{key}` must be greater than zero")]
    ZeroDuration { key: String },

    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure of a single sync run, one variant per pipeline stage
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to obtain service token: {0}")]
    Credential(#[from] AuthError),

    #[error("failed to fetch catalog entities: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Transmit(#[from] TransmitError),
}

impl SyncError {
    /// Short label used for metrics and structured logs
    pub fn stage(&self) -> &'static str {
        match self {
            SyncError::Credential(_) => "credential",
            SyncError::Catalog(_) => "catalog",
            SyncError::Transmit(_) => "transmit",
        }
    }
}
