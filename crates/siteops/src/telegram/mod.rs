//! Telegram Bot API webhook control.
//!
//! Only the three webhook-control calls are covered: `getWebhookInfo`,
//! `deleteWebhook` and `setWebhook`.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::{WebhookConfig, WebhookState};

pub use client::BotApiClient;

/// Webhook control surface of the Bot API.
#[async_trait]
pub trait WebhookApi: Send + Sync {
    /// Fetch the current webhook state.
    async fn get_webhook_info(&self) -> Result<WebhookState, ApiError>;

    /// Remove the current subscription.
    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), ApiError>;

    /// Install a subscription, replacing any existing one.
    async fn set_webhook(&self, request: &SetWebhookRequest) -> Result<(), ApiError>;
}

/// `setWebhook` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetWebhookRequest {
    pub url: String,
    pub secret_token: String,
    pub allowed_updates: Vec<String>,
    pub max_connections: u32,
    pub drop_pending_updates: bool,
}

impl From<&WebhookConfig> for SetWebhookRequest {
    fn from(config: &WebhookConfig) -> Self {
        Self {
            url: config.url().to_string(),
            secret_token: config.secret_token().expose().to_string(),
            allowed_updates: config.allowed_updates().to_vec(),
            max_connections: config.max_connections(),
            drop_pending_updates: config.drop_pending_updates(),
        }
    }
}

/// `deleteWebhook` body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteWebhookRequest {
    pub drop_pending_updates: bool,
}

/// Response envelope shared by every Bot API method.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl<T> ApiEnvelope<T> {
    /// Convert into the result, treating `ok: false` as a rejection.
    ///
    /// # Errors
    /// Returns [`ApiError::Rejected`] when the API reported failure.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(ApiError::Rejected {
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            })
        }
    }
}
