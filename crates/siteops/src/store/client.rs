//! PostgREST client for backlog tables.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::{BacklogStore, DeleteOutcome, RowProbe};
use crate::error::{truncate_body, StoreError};
use crate::types::{Secret, TableName};

/// REST path prefix under the project URL.
const REST_PATH: &str = "/rest/v1";

/// Default timeout for store requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// PostgREST client authenticated with a service key.
#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    rest_url: String,
    service_key: Secret,
    primary_key: String,
}

impl PostgrestClient {
    /// Create a client for the project at `base_url` (e.g. `https://xyz.supabase.co`).
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        base_url: &str,
        service_key: Secret,
        primary_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            rest_url: format!("{}{REST_PATH}", base_url.trim_end_matches('/')),
            service_key,
            primary_key: primary_key.into(),
        })
    }

    fn table_url(&self, table: &TableName) -> String {
        format!("{}/{}", self.rest_url, table.as_str())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.service_key.expose();
        request
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=minimal")
    }

    async fn error_body(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StoreError::Http {
            status,
            body: truncate_body(&body, 120),
        }
    }
}

#[async_trait]
impl BacklogStore for PostgrestClient {
    async fn delete_all(&self, table: &TableName) -> Result<DeleteOutcome, StoreError> {
        debug!(table = %table, "DELETE all rows");
        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&[(self.primary_key.as_str(), "not.is.null")])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(DeleteOutcome::Cleared),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            _ => {
                let err = Self::error_body(response).await;
                warn!(table = %table, error = %err, "Delete request failed");
                Err(err)
            }
        }
    }

    async fn probe(&self, table: &TableName, limit: usize) -> Result<RowProbe, StoreError> {
        debug!(table = %table, limit, "GET probe");
        let limit = limit.to_string();
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[
                ("select", self.primary_key.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                let text = response.text().await?;
                let rows: Vec<serde_json::Value> = serde_json::from_str(&text)?;
                Ok(RowProbe::Rows(rows.len()))
            }
            StatusCode::NOT_FOUND => Ok(RowProbe::NotFound),
            _ => {
                let err = Self::error_body(response).await;
                warn!(table = %table, error = %err, "Probe request failed");
                Err(err)
            }
        }
    }
}

/// Supabase project reference (`xyz` in `https://xyz.supabase.co`), if the
/// URL is a hosted Supabase project.
#[must_use]
pub fn project_ref(base_url: &str) -> Option<String> {
    let parsed = url::Url::parse(base_url).ok()?;
    let host = parsed.host_str()?;
    let (reference, domain) = host.split_once('.')?;
    (domain == "supabase.co" && !reference.is_empty()).then(|| reference.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let client =
            PostgrestClient::new("https://xyz.supabase.co/", Secret::new("key"), "id").unwrap();
        let table = TableName::new("telegram_jobs").unwrap();
        assert_eq!(
            client.table_url(&table),
            "https://xyz.supabase.co/rest/v1/telegram_jobs"
        );
    }

    #[test]
    fn test_project_ref() {
        assert_eq!(
            project_ref("https://dlello.supabase.co"),
            Some("dlello".to_string())
        );
        assert_eq!(project_ref("https://db.example.org"), None);
        assert_eq!(project_ref("not a url"), None);
    }
}
