//! Catalog read client
//!
//! The sync task reads the full entity set in one request. [`CatalogApi`] is
//! the seam; [`CatalogClient`] talks to the catalog plugin over HTTP.

use crate::auth::ServiceToken;
use crate::discovery::{HostDiscovery, CATALOG_PLUGIN_ID};
use crate::models::Entity;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Restricts the catalog read to a set of entity kinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFilter {
    kinds: Vec<String>,
}

impl EntityFilter {
    pub fn kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind_values(&self) -> &[String] {
        &self.kinds
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// `filter` query value: `kind=Component,kind=API` matches either kind
    pub fn query_value(&self) -> Option<String> {
        if self.kinds.is_empty() {
            return None;
        }
        Some(
            self.kinds
                .iter()
                .map(|kind| format!("kind={}", kind))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("catalog responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("catalog response is not a list of entities: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read access to the software catalog
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch every entity matching `filter` (all entities when `None`)
    async fn get_entities(
        &self,
        filter: Option<&EntityFilter>,
        token: Option<&ServiceToken>,
    ) -> Result<Vec<Entity>, CatalogError>;
}

/// HTTP client for the catalog plugin's `/entities` endpoint
pub struct CatalogClient {
    client: Client,
    discovery: HostDiscovery,
}

impl CatalogClient {
    pub fn new(
        discovery: HostDiscovery,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, discovery })
    }

    fn entities_url(&self) -> String {
        format!("{}/entities", self.discovery.base_url(CATALOG_PLUGIN_ID))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn get_entities(
        &self,
        filter: Option<&EntityFilter>,
        token: Option<&ServiceToken>,
    ) -> Result<Vec<Entity>, CatalogError> {
        let url = self.entities_url();
        let mut request = self.client.get(&url);

        if let Some(query) = filter.and_then(EntityFilter::query_value) {
            request = request.query(&[("filter", query)]);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token.secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CatalogError::Status { status, body });
        }

        let entities: Vec<Entity> = serde_json::from_str(&body)?;
        debug!(url = %url, entities = entities.len(), "Fetched catalog entities");

        Ok(entities)
    }
}
