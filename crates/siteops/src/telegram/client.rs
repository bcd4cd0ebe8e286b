//! HTTP client for the Bot API webhook methods.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiEnvelope, DeleteWebhookRequest, SetWebhookRequest, WebhookApi};
use crate::error::{truncate_body, ApiError};
use crate::types::{Secret, WebhookState};

/// Base URL for the Bot API.
pub const API_BASE_URL: &str = "https://api.telegram.org";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bot API client scoped to a single bot token.
#[derive(Clone)]
pub struct BotApiClient {
    client: Client,
    base_url: String,
    token: Secret,
}

impl BotApiClient {
    /// Create a client against the public Bot API.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(token: Secret) -> Result<Self, ApiError> {
        Self::with_base_url(token, API_BASE_URL)
    }

    /// Create a client against a custom base URL (local Bot API server, tests).
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_base_url(token: Secret, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Method URL. Contains the token, so it is never logged and is stripped
    /// from transport errors.
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token.expose())
    }

    async fn call_get<T: DeserializeOwned>(&self, method: &str) -> Result<Option<T>, ApiError> {
        debug!(method, "Bot API GET");
        let response = self
            .client
            .get(self.method_url(method))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        Self::handle_response(method, response).await
    }

    async fn call_post<T, B>(&self, method: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + Sync,
    {
        debug!(method, "Bot API POST");
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        Self::handle_response(method, response).await
    }

    /// Decode the `ok` envelope. Rejections carry their envelope even on
    /// non-2xx statuses, so the envelope is tried first.
    async fn handle_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<Option<T>, ApiError> {
        let status = response.status();
        let text = response.text().await.map_err(reqwest::Error::without_url)?;

        match serde_json::from_str::<ApiEnvelope<T>>(&text) {
            Ok(envelope) => {
                let result = envelope.into_result();
                if let Err(e) = &result {
                    warn!(method, status = %status, error = %e, "Bot API rejected request");
                }
                result
            }
            Err(e) if status.is_success() => {
                warn!(method, error = %e, body = %truncate_body(&text, 200), "Failed to parse response");
                Err(ApiError::Decode(e))
            }
            Err(_) => Err(ApiError::Http {
                status: status.as_u16(),
                body: truncate_body(&text, 200),
            }),
        }
    }
}

#[async_trait]
impl WebhookApi for BotApiClient {
    async fn get_webhook_info(&self) -> Result<WebhookState, ApiError> {
        self.call_get::<WebhookState>("getWebhookInfo")
            .await?
            .ok_or_else(|| ApiError::Rejected {
                code: None,
                description: "getWebhookInfo returned no result".to_string(),
            })
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), ApiError> {
        let body = DeleteWebhookRequest {
            drop_pending_updates,
        };
        self.call_post::<serde_json::Value, _>("deleteWebhook", &body)
            .await
            .map(|_| ())
    }

    async fn set_webhook(&self, request: &SetWebhookRequest) -> Result<(), ApiError> {
        self.call_post::<serde_json::Value, _>("setWebhook", request)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let client =
            BotApiClient::with_base_url(Secret::new("123:abc"), "http://localhost:8081/").unwrap();
        assert_eq!(
            client.method_url("getWebhookInfo"),
            "http://localhost:8081/bot123:abc/getWebhookInfo"
        );
    }
}
