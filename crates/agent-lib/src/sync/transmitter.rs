//! Batch transmission of catalog entities to DX
//!
//! Two protocols are supported:
//! - lifecycle: `catalogSyncStart`, one `catalogSyncChunk` per batch, then
//!   `catalogSyncComplete`. The first failure aborts the sequence.
//! - ingest: one `catalogIngest` per batch with no markers. Every batch is
//!   attempted; failures are reported together at the end.
//!
//! Requests are always issued one at a time, in batch order.

use super::batch::chunk;
use super::client::DxClient;
use super::errors::TransmitError;
use crate::auth::ServiceToken;
use crate::models::{ApplicationDescriptor, Entity, SyncRequest};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Batch size for the lifecycle protocol
pub const LIFECYCLE_CHUNK_SIZE: usize = 100;

/// Batch size for the ingest protocol
pub const INGEST_CHUNK_SIZE: usize = 1000;

/// DX endpoint names, relative to `{destination}/api/`
pub mod endpoints {
    pub const SYNC_START: &str = "backstage.catalogSyncStart";
    pub const SYNC_CHUNK: &str = "backstage.catalogSyncChunk";
    pub const SYNC_COMPLETE: &str = "backstage.catalogSyncComplete";
    pub const INGEST: &str = "backstage.catalogIngest";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncProtocol {
    #[default]
    Lifecycle,
    Ingest,
}

impl SyncProtocol {
    pub fn chunk_size(&self) -> usize {
        match self {
            SyncProtocol::Lifecycle => LIFECYCLE_CHUNK_SIZE,
            SyncProtocol::Ingest => INGEST_CHUNK_SIZE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncProtocol::Lifecycle => "lifecycle",
            SyncProtocol::Ingest => "ingest",
        }
    }
}

/// What a successful transmission delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitSummary {
    pub entities: usize,
    pub batches: usize,
}

/// Sends entity lists to DX in sequential batches
#[derive(Debug, Clone)]
pub struct BatchTransmitter {
    client: DxClient,
    protocol: SyncProtocol,
    chunk_size: usize,
}

impl BatchTransmitter {
    pub fn new(client: DxClient, protocol: SyncProtocol) -> Self {
        Self {
            client,
            protocol,
            chunk_size: protocol.chunk_size(),
        }
    }

    /// Override the protocol's batch size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn protocol(&self) -> SyncProtocol {
        self.protocol
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Deliver `entities` to the DX API rooted at `destination`
    pub async fn transmit(
        &self,
        entities: &[Entity],
        destination: &str,
        application: &ApplicationDescriptor,
        credential: Option<&ServiceToken>,
    ) -> Result<TransmitSummary, TransmitError> {
        match self.protocol {
            SyncProtocol::Lifecycle => {
                self.transmit_lifecycle(entities, destination, application, credential)
                    .await
            }
            SyncProtocol::Ingest => {
                self.transmit_ingest(entities, destination, application, credential)
                    .await
            }
        }
    }

    async fn transmit_lifecycle(
        &self,
        entities: &[Entity],
        destination: &str,
        application: &ApplicationDescriptor,
        credential: Option<&ServiceToken>,
    ) -> Result<TransmitSummary, TransmitError> {
        self.client
            .post(
                &endpoint_url(destination, endpoints::SYNC_START),
                &SyncRequest::marker(application),
                credential,
            )
            .await?;
        debug!("DX catalog sync started");

        let chunk_url = endpoint_url(destination, endpoints::SYNC_CHUNK);
        let batches = chunk(entities, self.chunk_size);
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            self.client
                .post(&chunk_url, &SyncRequest::chunk(application, batch), credential)
                .await?;
            debug!(
                batch = index + 1,
                of = total,
                size = batch.len(),
                first = %first_ref(batch),
                "Sent catalog chunk"
            );
        }

        self.client
            .post(
                &endpoint_url(destination, endpoints::SYNC_COMPLETE),
                &SyncRequest::marker(application),
                credential,
            )
            .await?;

        info!(entities = entities.len(), batches = total, "DX catalog sync delivered");

        Ok(TransmitSummary {
            entities: entities.len(),
            batches: total,
        })
    }

    async fn transmit_ingest(
        &self,
        entities: &[Entity],
        destination: &str,
        application: &ApplicationDescriptor,
        credential: Option<&ServiceToken>,
    ) -> Result<TransmitSummary, TransmitError> {
        let url = endpoint_url(destination, endpoints::INGEST);
        let batches = chunk(entities, self.chunk_size);
        let total = batches.len();

        let mut failed = 0;
        let mut first_failure = None;

        for (index, batch) in batches.into_iter().enumerate() {
            match self
                .client
                .post(&url, &SyncRequest::chunk(application, batch), credential)
                .await
            {
                Ok(_) => {
                    debug!(
                        batch = index + 1,
                        of = total,
                        size = batch.len(),
                        first = %first_ref(batch),
                        "Ingested catalog chunk"
                    );
                }
                Err(e) => {
                    warn!(
                        batch = index + 1,
                        of = total,
                        first = %first_ref(batch),
                        error = %e,
                        "Ingest chunk rejected, continuing"
                    );
                    failed += 1;
                    first_failure.get_or_insert(e);
                }
            }
        }

        if let Some(first) = first_failure {
            return Err(TransmitError::Ingest {
                failed,
                total,
                first: Box::new(first),
            });
        }

        info!(entities = entities.len(), batches = total, "DX catalog ingest delivered");

        Ok(TransmitSummary {
            entities: entities.len(),
            batches: total,
        })
    }
}

/// Reference of a batch's first entity, to locate it in the catalog
fn first_ref(batch: &[Entity]) -> String {
    batch.first().map(Entity::entity_ref).unwrap_or_default()
}

fn endpoint_url(destination: &str, endpoint: &str) -> String {
    format!("{}/api/{}", destination.trim_end_matches('/'), endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_chunk_sizes() {
        assert_eq!(SyncProtocol::Lifecycle.chunk_size(), 100);
        assert_eq!(SyncProtocol::Ingest.chunk_size(), 1000);
        assert_eq!(SyncProtocol::default(), SyncProtocol::Lifecycle);
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("http://backstage/api/proxy/dx/", endpoints::SYNC_START),
            "http://backstage/api/proxy/dx/api/backstage.catalogSyncStart"
        );
    }

    #[test]
    fn test_first_ref_names_leading_entity() {
        let batch = vec![
            Entity::new(serde_json::json!({
                "kind": "API",
                "metadata": { "name": "orders", "namespace": "shop" },
            })),
            Entity::new(serde_json::json!({ "kind": "Component" })),
        ];
        assert_eq!(first_ref(&batch), "api:shop/orders");
        assert_eq!(first_ref(&[]), "");
    }

    #[test]
    fn test_chunk_size_override() {
        let client = DxClient::builder().build().unwrap();
        let transmitter = BatchTransmitter::new(client, SyncProtocol::Ingest).with_chunk_size(7);
        assert_eq!(transmitter.chunk_size(), 7);
        assert_eq!(transmitter.protocol(), SyncProtocol::Ingest);
    }
}
