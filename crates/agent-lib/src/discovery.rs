//! Plugin endpoint discovery on the host backend

use crate::error::ConfigError;
use url::Url;

pub const CATALOG_PLUGIN_ID: &str = "catalog";
pub const PROXY_PLUGIN_ID: &str = "proxy";

/// Route under the proxy plugin that forwards to DX
pub const DX_PROXY_ROUTE: &str = "dx";

/// Resolves plugin ids to `{backend}/api/{plugin}` base URLs
#[derive(Debug, Clone)]
pub struct HostDiscovery {
    backend_base_url: String,
}

impl HostDiscovery {
    pub fn new(backend_base_url: &str) -> Result<Self, ConfigError> {
        Url::parse(backend_base_url).map_err(|source| ConfigError::InvalidUrl {
            url: backend_base_url.to_string(),
            source,
        })?;

        Ok(Self {
            backend_base_url: backend_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self, plugin_id: &str) -> String {
        format!("{}/api/{}", self.backend_base_url, plugin_id)
    }

    /// Base URL of the DX API as reached through the proxy route
    pub fn dx_base_url(&self) -> String {
        format!("{}/{}", self.base_url(PROXY_PLUGIN_ID), DX_PROXY_ROUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_urls() {
        let discovery = HostDiscovery::new("http://backstage:7007/").unwrap();

        assert_eq!(
            discovery.base_url(CATALOG_PLUGIN_ID),
            "http://backstage:7007/api/catalog"
        );
        assert_eq!(discovery.dx_base_url(), "http://backstage:7007/api/proxy/dx");
    }

    #[test]
    fn test_rejects_invalid_url() {
        let err = HostDiscovery::new("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }
}
