//! Agent configuration
//!
//! Sources, later ones win:
//! 1. `app-config.yaml` (or the file named by `DX_SYNC_CONFIG`), optional
//! 2. `DX_SYNC__`-prefixed environment variables, `__` between key segments,
//!    e.g. `DX_SYNC__DX__DISABLE_CATALOG_SYNC=true`

use anyhow::{Context, Result};
use dx_sync_lib::settings::Settings;
use std::path::{Path, PathBuf};

/// Config file read when `DX_SYNC_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "app-config.yaml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "DX_SYNC_CONFIG";

const ENV_PREFIX: &str = "DX_SYNC";

/// Resolve the config file path from the environment
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load configuration from the config file and environment
pub fn load() -> Result<Settings> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> Result<Settings> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("dx.catalog_sync_allowed_kinds"),
        )
        .build()
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;

    config
        .try_deserialize()
        .context("invalid DX sync configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dx_sync_lib::schedule::ScheduleScope;
    use dx_sync_lib::sync::SyncProtocol;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = load_from(Path::new("/nonexistent/app-config.yaml")).unwrap();

        assert!(!settings.dx.disable_catalog_sync);
        assert!(settings.dx.app_id.is_none());
        assert_eq!(settings.backend.base_url, "http://localhost:7007");
        assert_eq!(settings.backend.listen.port, 7007);
        assert_eq!(settings.dx.sync_protocol, SyncProtocol::Lifecycle);
    }

    #[test]
    fn test_loads_camel_case_yaml() {
        let file = yaml_file(
            r#"
app:
  title: Acme Portal
  baseUrl: https://portal.acme.test
backend:
  baseUrl: http://backstage:7007
  listen:
    port: 7100
dx:
  appId: app-123
  disableCatalogSync: false
  catalogSyncAllowedKinds: [Component, API]
  syncProtocol: ingest
  schedule:
    frequency: { minutes: 30 }
    timeout: 90s
    scope: local
"#,
        );

        let settings = load_from(file.path()).unwrap();

        assert_eq!(settings.app.title.as_deref(), Some("Acme Portal"));
        assert_eq!(
            settings.app.base_url.as_deref(),
            Some("https://portal.acme.test")
        );
        assert_eq!(settings.backend.base_url, "http://backstage:7007");
        assert_eq!(settings.backend.listen.port, 7100);
        assert_eq!(settings.dx.app_id.as_deref(), Some("app-123"));
        assert_eq!(
            settings.dx.catalog_sync_allowed_kinds,
            Some(vec!["Component".to_string(), "API".to_string()])
        );
        assert_eq!(settings.dx.sync_protocol, SyncProtocol::Ingest);

        let definition = settings.dx.schedule.to_definition("dx-catalog-sync").unwrap();
        assert_eq!(definition.frequency, Duration::from_secs(30 * 60));
        assert_eq!(definition.timeout, Duration::from_secs(90));
        assert_eq!(definition.initial_delay, Duration::from_secs(3));
        assert_eq!(definition.scope, ScheduleScope::Local);
    }

    #[test]
    fn test_invalid_protocol_is_rejected() {
        let file = yaml_file("dx:\n  syncProtocol: carrier-pigeon\n");
        assert!(load_from(file.path()).is_err());
    }

    #[test]
    fn test_config_path_defaults_to_app_config() {
        if std::env::var_os(CONFIG_PATH_ENV).is_none() {
            assert_eq!(config_path(), PathBuf::from(DEFAULT_CONFIG_FILE));
        }
    }
}
