//! The scheduled DX catalog sync task
//!
//! Each invocation reads the catalog and hands the full entity set to the
//! [`BatchTransmitter`]. Runs are stateless: every tick is a complete sync.

use crate::auth::{ServiceToken, StaticTokenProvider, TokenProvider};
use crate::catalog::{CatalogApi, CatalogClient};
use crate::discovery::{HostDiscovery, CATALOG_PLUGIN_ID, PROXY_PLUGIN_ID};
use crate::error::{ConfigError, SyncError};
use crate::health::{components, HealthRegistry};
use crate::models::RunOutcome;
use crate::observability::{StructuredLogger, SyncMetrics};
use crate::schedule::ScheduledTask;
use crate::settings::Settings;
use crate::sync::{BatchTransmitter, DxClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Identifier the sync task is registered under
pub const TASK_ID: &str = "dx-catalog-sync";

pub struct CatalogSyncTask {
    settings: Arc<Settings>,
    catalog: Arc<dyn CatalogApi>,
    transmitter: BatchTransmitter,
    discovery: HostDiscovery,
    tokens: Option<Arc<dyn TokenProvider>>,
    health: Option<HealthRegistry>,
    metrics: SyncMetrics,
    logger: StructuredLogger,
}

impl CatalogSyncTask {
    pub fn new(
        settings: Arc<Settings>,
        catalog: Arc<dyn CatalogApi>,
        transmitter: BatchTransmitter,
        discovery: HostDiscovery,
    ) -> Self {
        Self {
            settings,
            catalog,
            transmitter,
            discovery,
            tokens: None,
            health: None,
            metrics: SyncMetrics::new(),
            logger: StructuredLogger::new(TASK_ID),
        }
    }

    /// Wire the HTTP clients described by `settings`
    pub fn from_settings(settings: Arc<Settings>) -> Result<Self, ConfigError> {
        let discovery = HostDiscovery::new(&settings.backend.base_url)?;
        let request_timeout = settings.request_timeout()?;

        let catalog = CatalogClient::new(discovery.clone(), request_timeout)?;
        let client = DxClient::builder()
            .request_timeout(request_timeout)
            .build()?;
        let transmitter = BatchTransmitter::new(client, settings.dx.sync_protocol);

        let token = settings.backend.auth.token.clone();
        let mut task = Self::new(settings, Arc::new(catalog), transmitter, discovery);
        if let Some(token) = token {
            task = task.with_token_provider(Arc::new(StaticTokenProvider::new(token)));
        }

        Ok(task)
    }

    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Report run results to the `catalog_sync` health component
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// One sync run; errors are returned, not logged
    pub async fn execute(&self) -> Result<RunOutcome, SyncError> {
        if self.settings.dx.disable_catalog_sync {
            self.logger.log_sync_skipped();
            return Ok(RunOutcome::Skipped);
        }

        let filter = self.settings.entity_filter();
        self.logger.log_sync_started(
            self.transmitter.protocol().as_str(),
            filter.as_ref().map(|f| f.kind_values()),
        );

        let catalog_token = self.token_for(CATALOG_PLUGIN_ID).await?;
        let entities = self
            .catalog
            .get_entities(filter.as_ref(), catalog_token.as_ref())
            .await?;

        let proxy_token = self.token_for(PROXY_PLUGIN_ID).await?;
        let summary = self
            .transmitter
            .transmit(
                &entities,
                &self.discovery.dx_base_url(),
                &self.settings.application(),
                proxy_token.as_ref(),
            )
            .await?;

        Ok(RunOutcome::Completed {
            entities: summary.entities,
            batches: summary.batches,
        })
    }

    async fn token_for(&self, plugin_id: &str) -> Result<Option<ServiceToken>, SyncError> {
        match &self.tokens {
            Some(tokens) => Ok(Some(tokens.plugin_request_token(plugin_id).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ScheduledTask for CatalogSyncTask {
    async fn run(&self) {
        let started = Instant::now();
        let result = self.execute().await;
        let elapsed = started.elapsed();

        match result {
            Ok(RunOutcome::Skipped) => {
                self.metrics.record_skipped();
            }
            Ok(RunOutcome::Completed { entities, batches }) => {
                self.metrics
                    .record_success(entities, batches, elapsed.as_secs_f64());
                if let Some(health) = &self.health {
                    health.set_healthy(components::CATALOG_SYNC).await;
                }
                self.logger.log_sync_finished(
                    Some(entities),
                    Some(batches),
                    elapsed.as_millis() as u64,
                );
            }
            Err(e) => {
                let message = e.to_string();
                self.logger.log_sync_failed(e.stage(), &message);
                self.metrics.record_failure(elapsed.as_secs_f64());
                if let Some(health) = &self.health {
                    health.set_degraded(components::CATALOG_SYNC, message).await;
                }
                self.logger
                    .log_sync_finished(None, None, elapsed.as_millis() as u64);
            }
        }
    }
}
