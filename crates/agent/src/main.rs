//! DX sync agent
//!
//! Runs next to the software catalog, pushing the catalog to DX on a fixed
//! schedule and serving health and metrics endpoints.

use anyhow::{Context, Result};
use dx_sync_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    schedule::{LocalScheduler, TaskScheduler},
    task::{CatalogSyncTask, TASK_ID},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let logger = StructuredLogger::new(TASK_ID);
    logger.log_startup(AGENT_VERSION);

    // Load configuration
    let settings = Arc::new(config::load()?);
    let definition = settings
        .dx
        .schedule
        .to_definition(TASK_ID)
        .context("invalid dx.schedule configuration")?;
    info!(
        backend = %settings.backend.base_url,
        protocol = settings.dx.sync_protocol.as_str(),
        disabled = settings.dx.disable_catalog_sync,
        "Agent configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SCHEDULER).await;
    health_registry.register(components::CATALOG_SYNC).await;
    health_registry.register(components::API).await;

    let task = CatalogSyncTask::from_settings(settings.clone())
        .context("failed to set up catalog sync")?
        .with_health(health_registry.clone());

    // Start health and metrics server
    let app_state = Arc::new(api::AppState::new(health_registry.clone()));
    let mut api_handle = tokio::spawn(api::serve(settings.backend.listen.port, app_state));

    let scheduler = LocalScheduler::new();
    scheduler
        .schedule_task(definition, Arc::new(task))
        .await
        .context("failed to schedule catalog sync")?;

    // Mark agent as ready once the task is registered
    health_registry.set_ready(true).await;

    // Wait for shutdown signal, or for the API server to die
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = &mut api_handle => {
            health_registry
                .set_unhealthy(components::API, "API server stopped")
                .await;
            scheduler.shutdown().await;
            return match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("API server exited unexpectedly")),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    Err(e)
                }
                Err(e) => Err(e.into()),
            };
        }
    }

    health_registry.set_ready(false).await;
    scheduler.shutdown().await;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
