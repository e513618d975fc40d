//! DX catalog sync library
//!
//! This crate provides the core functionality for:
//! - Reading entities from the software catalog
//! - Batched delivery of the catalog to DX
//! - Scheduling the periodic sync task
//! - Health checks and observability

pub mod auth;
pub mod catalog;
pub mod discovery;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod schedule;
pub mod settings;
pub mod sync;
pub mod task;

pub use error::{ConfigError, SyncError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, SyncMetrics};
pub use schedule::{LocalScheduler, ScheduledTask, TaskScheduleDefinition, TaskScheduler};
pub use settings::Settings;
pub use task::{CatalogSyncTask, TASK_ID};
