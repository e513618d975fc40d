//! Service-to-service credentials
//!
//! Token issuance is owned by the host's identity service. This module only
//! defines the provider seam and a static-token implementation.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Short-lived bearer token proving the sync task's identity
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceToken(String);

impl ServiceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for the `Authorization` header only
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceToken(***)")
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token for plugin `{target}` could not be issued: {message}")]
    Issue { target: String, message: String },
}

/// Issues tokens scoped to a target plugin of the host backend
///
/// Dependency-injection seam; tests substitute in-memory providers.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn plugin_request_token(&self, target_plugin_id: &str)
        -> Result<ServiceToken, AuthError>;
}

/// Hands out the same configured token for every target
pub struct StaticTokenProvider {
    token: ServiceToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: ServiceToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn plugin_request_token(
        &self,
        target_plugin_id: &str,
    ) -> Result<ServiceToken, AuthError> {
        if self.token.secret().is_empty() {
            return Err(AuthError::Issue {
                target: target_plugin_id.to_string(),
                message: "configured token is empty".to_string(),
            });
        }
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = ServiceToken::new("s3cr3t");
        assert_eq!(format!("{:?}", token), "ServiceToken(***)");
        assert_eq!(token.secret(), "s3cr3t");
    }

    #[tokio::test]
    async fn test_static_provider_returns_token_for_any_target() {
        let provider = StaticTokenProvider::new("service-token");

        let catalog = provider.plugin_request_token("catalog").await.unwrap();
        let proxy = provider.plugin_request_token("proxy").await.unwrap();

        assert_eq!(catalog.secret(), "service-token");
        assert_eq!(catalog, proxy);
    }

    #[tokio::test]
    async fn test_static_provider_rejects_empty_token() {
        let provider = StaticTokenProvider::new("");
        let err = provider.plugin_request_token("catalog").await.unwrap_err();
        assert!(err.to_string().contains("catalog"));
    }
}
