//! HTTP client for the DX API
//!
//! Every call is a JSON POST. Responses are classified in two tiers: an
//! embedded `ok: false` flag wins over the HTTP status, then any non-2xx
//! status is a transport failure.

use super::errors::TransmitError;
use crate::auth::ServiceToken;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Configuration for the DX client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout, covering the response body
    pub request_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("dx-sync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// JSON-over-HTTP client for DX endpoints
#[derive(Debug, Clone)]
pub struct DxClient {
    client: Client,
}

impl DxClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn builder() -> DxClientBuilder {
        DxClientBuilder::new()
    }

    /// POST `body` as JSON and classify the response
    pub async fn post<B>(
        &self,
        url: &str,
        body: &B,
        token: Option<&ServiceToken>,
    ) -> Result<Value, TransmitError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(url = %url, status = status.as_u16(), "DX responded");

        classify_response(status, &text)
    }
}

/// Builder for [`DxClient`]
pub struct DxClientBuilder {
    config: ClientConfig,
}

impl DxClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<DxClient, reqwest::Error> {
        DxClient::new(self.config)
    }
}

impl Default for DxClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn classify_response(status: StatusCode, body: &str) -> Result<Value, TransmitError> {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => {
            if let Some(message) = embedded_failure(&parsed) {
                return Err(TransmitError::Remote(message));
            }
            if !status.is_success() {
                return Err(TransmitError::Transport {
                    status,
                    body: body.to_string(),
                });
            }
            Ok(parsed)
        }
        Err(source) if status.is_success() => {
            Err(TransmitError::InvalidResponse { status, source })
        }
        Err(_) => Err(TransmitError::Transport {
            status,
            body: body.to_string(),
        }),
    }
}

/// Message of a body carrying a falsy `ok` field
fn embedded_failure(body: &Value) -> Option<String> {
    let falsy = match body.get("ok")? {
        Value::Bool(ok) => !ok,
        Value::Null => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    if !falsy {
        return None;
    }

    Some(match body.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    })
}
