//! Typed view of the sync configuration
//!
//! Keys are read in camelCase (`dx.appId`) as well as snake_case
//! (`dx.app_id`). Some `config` sources lower-case keys, which is why the
//! all-lowercase aliases are listed too.

use crate::catalog::EntityFilter;
use crate::error::ConfigError;
use crate::models::ApplicationDescriptor;
use crate::schedule::{DurationSpec, ScheduleScope, TaskScheduleDefinition};
use crate::sync::SyncProtocol;
use serde::Deserialize;
use std::time::Duration;

/// Default host backend used for plugin discovery
pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:7007";

/// Default port for the health/metrics server
pub const DEFAULT_LISTEN_PORT: u16 = 7007;

/// Default per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Root configuration document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dx: DxSettings,
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub backend: BackendSettings,
}

/// `dx.*` keys
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DxSettings {
    /// Identifies this instance to DX; DX assigns one when absent
    #[serde(default, alias = "appId", alias = "appid")]
    pub app_id: Option<String>,

    #[serde(default, alias = "disableCatalogSync", alias = "disablecatalogsync")]
    pub disable_catalog_sync: bool,

    #[serde(
        default,
        alias = "catalogSyncAllowedKinds",
        alias = "catalogsyncallowedkinds"
    )]
    pub catalog_sync_allowed_kinds: Option<Vec<String>>,

    #[serde(default, alias = "syncProtocol", alias = "syncprotocol")]
    pub sync_protocol: SyncProtocol,

    #[serde(default)]
    pub schedule: ScheduleSettings,
}

/// `app.*` keys forwarded in the application descriptor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "baseUrl", alias = "baseurl")]
    pub base_url: Option<String>,
}

/// `backend.*` keys
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    #[serde(
        default = "default_backend_base_url",
        alias = "baseUrl",
        alias = "baseurl"
    )]
    pub base_url: String,

    #[serde(default)]
    pub listen: ListenSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default, alias = "requestTimeout", alias = "requesttimeout")]
    pub request_timeout: Option<DurationSpec>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            listen: ListenSettings::default(),
            auth: AuthSettings::default(),
            request_timeout: None,
        }
    }
}

fn default_backend_base_url() -> String {
    DEFAULT_BACKEND_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenSettings {
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            port: default_listen_port(),
        }
    }
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

/// Service-to-service credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    /// Static token; enables bearer auth towards the catalog and proxy
    #[serde(default)]
    pub token: Option<String>,
}

/// `dx.schedule.*` keys, all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default)]
    pub frequency: Option<DurationSpec>,
    #[serde(default)]
    pub timeout: Option<DurationSpec>,
    #[serde(default, alias = "initialDelay", alias = "initialdelay")]
    pub initial_delay: Option<DurationSpec>,
    #[serde(default)]
    pub scope: Option<ScheduleScope>,
}

impl ScheduleSettings {
    /// Resolve the configured values against the defaults
    pub fn to_definition(&self, task_id: &str) -> Result<TaskScheduleDefinition, ConfigError> {
        let mut definition = TaskScheduleDefinition::with_defaults(task_id);

        if let Some(spec) = &self.frequency {
            definition.frequency = spec.resolve("dx.schedule.frequency")?;
        }
        if let Some(spec) = &self.timeout {
            definition.timeout = spec.resolve("dx.schedule.timeout")?;
        }
        if let Some(spec) = &self.initial_delay {
            definition.initial_delay = spec.resolve("dx.schedule.initialDelay")?;
        }
        if let Some(scope) = self.scope {
            definition.scope = scope;
        }

        definition.validate()?;
        Ok(definition)
    }
}

impl Settings {
    /// Application descriptor sent with every DX request
    pub fn application(&self) -> ApplicationDescriptor {
        ApplicationDescriptor {
            id: self.dx.app_id.clone(),
            title: self.app.title.clone(),
            base_url: self.app.base_url.clone(),
        }
    }

    /// Kind filter for the catalog read; `None` fetches every entity
    pub fn entity_filter(&self) -> Option<EntityFilter> {
        self.dx
            .catalog_sync_allowed_kinds
            .as_ref()
            .map(|kinds| EntityFilter::kinds(kinds.iter().cloned()))
            .filter(|filter| !filter.is_empty())
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        let timeout = match &self.backend.request_timeout {
            Some(spec) => spec.resolve("backend.requestTimeout")?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        if timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                key: "backend.requestTimeout".to_string(),
            });
        }
        Ok(timeout)
    }
}
