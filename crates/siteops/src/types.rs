//! Core data model shared by the drainer, the reconciler, and the CLI.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Update kinds requested when none are configured.
pub const DEFAULT_ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Bot API default for concurrent webhook connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 40;

/// Bot API upper bound for `max_connections`.
pub const MAX_CONNECTIONS_LIMIT: u32 = 100;

/// Backlog tables drained when none are configured.
pub const DEFAULT_TABLES: &[&str] = &["telegram_jobs", "telegram_submissions"];

// =============================================================================
// Secret
// =============================================================================

/// A credential that never prints in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building requests only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masked form: first and last four characters, or `****` for short values.
    #[must_use]
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 12 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.masked())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

// =============================================================================
// WebhookConfig
// =============================================================================

/// Desired webhook subscription. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    url: String,
    secret_token: Secret,
    allowed_updates: Vec<String>,
    max_connections: u32,
    drop_pending_updates: bool,
}

impl WebhookConfig {
    /// Build a config with default update kinds, 40 connections, and pending
    /// updates dropped.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the URL is not absolute HTTPS or the secret
    /// token is not accepted by the Bot API.
    pub fn new(url: impl Into<String>, secret_token: Secret) -> Result<Self, ConfigError> {
        let url = url.into();
        validate_webhook_url(&url)?;
        validate_secret_token(&secret_token)?;

        Ok(Self {
            url,
            secret_token,
            allowed_updates: DEFAULT_ALLOWED_UPDATES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            drop_pending_updates: true,
        })
    }

    /// Replace the allowed update kinds. Duplicates and blanks are dropped,
    /// first occurrence order is kept.
    #[must_use]
    pub fn with_allowed_updates<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for kind in kinds {
            let kind = kind.into().trim().to_string();
            if !kind.is_empty() && !out.contains(&kind) {
                out.push(kind);
            }
        }
        self.allowed_updates = out;
        self
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] outside `1..=100`.
    pub fn with_max_connections(mut self, max_connections: u32) -> Result<Self, ConfigError> {
        if max_connections == 0 || max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(ConfigError::Invalid {
                field: "max_connections",
                reason: format!("{max_connections} is outside 1..={MAX_CONNECTIONS_LIMIT}"),
            });
        }
        self.max_connections = max_connections;
        Ok(self)
    }

    #[must_use]
    pub fn with_drop_pending_updates(mut self, drop: bool) -> Self {
        self.drop_pending_updates = drop;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn secret_token(&self) -> &Secret {
        &self.secret_token
    }

    #[must_use]
    pub fn allowed_updates(&self) -> &[String] {
        &self.allowed_updates
    }

    #[must_use]
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    #[must_use]
    pub fn drop_pending_updates(&self) -> bool {
        self.drop_pending_updates
    }
}

fn validate_webhook_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        field: "webhook_url",
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "https" {
        return Err(ConfigError::Invalid {
            field: "webhook_url",
            reason: format!("scheme must be https, got {}", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Invalid {
            field: "webhook_url",
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

/// Bot API accepts 1-256 characters of `A-Z`, `a-z`, `0-9`, `_` and `-`.
fn validate_secret_token(token: &Secret) -> Result<(), ConfigError> {
    let raw = token.expose();
    let len = raw.chars().count();
    if len == 0 || len > 256 {
        return Err(ConfigError::Invalid {
            field: "secret_token",
            reason: format!("length {len} is outside 1..=256"),
        });
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Invalid {
            field: "secret_token",
            reason: "only A-Z, a-z, 0-9, _ and - are allowed".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// WebhookState
// =============================================================================

/// Observed remote webhook state (`getWebhookInfo` result).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookState {
    /// Current callback URL; empty when no webhook is set.
    #[serde(rename = "url", default)]
    pub current_url: String,
    #[serde(default)]
    pub pending_update_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    /// Unix time of the most recent delivery error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

impl WebhookState {
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.current_url.is_empty()
    }

    #[must_use]
    pub fn last_error_at(&self) -> Option<DateTime<Utc>> {
        self.last_error_date
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    }
}

// =============================================================================
// TableName
// =============================================================================

/// Name of a backlog table, safe to place in a PostgREST path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    /// # Errors
    /// Returns [`ConfigError::Invalid`] unless the name is an ASCII identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid {
                field: "table",
                reason: format!("'{name}' is not a valid table identifier"),
            });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The default backlog tables.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_TABLES.iter().map(|t| Self((*t).to_string())).collect()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TableName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
