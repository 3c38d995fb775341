//! HTTP transport for the Home Assistant REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::Value;

use crate::backend::AutomationBackend;
use crate::error::HaError;
use crate::types::{validate_entity_id, ConnectionStatus, EntityState, ServiceCall};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a Home Assistant instance
pub struct HaClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HaClient {
    /// Create a client for `base_url` authenticated with a long-lived `token`
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, HaError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a request and decode the JSON body (empty body → `None`)
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, HaError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HaError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[async_trait]
impl AutomationBackend for HaClient {
    async fn check_connection(&self) -> ConnectionStatus {
        match self.request(Method::GET, "/api/", None).await {
            Ok(value) => ConnectionStatus {
                connected: true,
                message: value
                    .as_ref()
                    .and_then(|v| v.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("Connected")
                    .to_string(),
            },
            Err(e) => {
                tracing::warn!("Home Assistant connection check failed: {}", e);
                ConnectionStatus {
                    connected: false,
                    message: "Cannot connect to Home Assistant".to_string(),
                }
            }
        }
    }

    async fn get_states(&self) -> Result<Vec<EntityState>, HaError> {
        match self.request(Method::GET, "/api/states", None).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn call_service(&self, call: &ServiceCall) -> Result<(), HaError> {
        validate_entity_id(&call.entity_id)?;
        self.request(Method::POST, &call.path(), Some(&call.body()))
            .await?;
        tracing::debug!(
            "Called {}.{} on {}",
            call.domain,
            call.service,
            call.entity_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HaClient::new("http://ha.local:8123/", "token", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://ha.local:8123");
    }

    #[tokio::test]
    async fn test_unreachable_backend_reports_disconnected() {
        let client =
            HaClient::new("http://127.0.0.1:9", "token", Duration::from_millis(500)).unwrap();
        let status = client.check_connection().await;
        assert!(!status.connected);
        assert!(client.get_states().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_entity_rejected_before_request() {
        let client = HaClient::new("http://127.0.0.1:9", "token", DEFAULT_TIMEOUT).unwrap();
        let call = ServiceCall::new("light", "turn_on", "not-an-entity");
        assert!(matches!(
            client.call_service(&call).await,
            Err(HaError::InvalidEntityId(_))
        ));
    }
}
