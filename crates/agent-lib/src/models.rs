//! Core data models for catalog sync

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace assumed for entities that do not declare one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Catalog entity, transported to DX without interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Value);

impl Entity {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace").unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Compact `kind:namespace/name` reference for log lines
    pub fn entity_ref(&self) -> String {
        format!(
            "{}:{}/{}",
            self.kind().unwrap_or("unknown").to_lowercase(),
            self.namespace(),
            self.name().unwrap_or("unknown")
        )
    }

    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
    }
}

/// Identifies this catalog instance to DX
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Body of every request sent to DX
#[derive(Debug, Clone, Serialize)]
pub struct SyncRequest<'a> {
    pub application: &'a ApplicationDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<&'a [Entity]>,
}

impl<'a> SyncRequest<'a> {
    /// Body carrying only the application descriptor (start/complete markers)
    pub fn marker(application: &'a ApplicationDescriptor) -> Self {
        Self {
            application,
            entities: None,
        }
    }

    pub fn chunk(application: &'a ApplicationDescriptor, entities: &'a [Entity]) -> Self {
        Self {
            application,
            entities: Some(entities),
        }
    }
}

/// Result of a single sync run that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Sync disabled by configuration; nothing was read or sent
    Skipped,
    /// Entities were fetched and transmitted
    Completed { entities: usize, batches: usize },
}
