//! REST collection client
//!
//! The backend exposes one collection endpoint per resource kind
//! (list/create/update/delete). The reconciler talks to it through the
//! [`CollectionApi`] trait so the replay logic can be exercised against an
//! in-memory server in tests.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{Record, ResourceKind};
use crate::util::compact_text;

/// Overall client timeout; exceeding it is reported as a sync failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Collection operations the reconciler depends on.
pub trait CollectionApi: Send + Sync {
    /// Full ordered list of the tailor's non-deleted records.
    fn list(&self, kind: ResourceKind) -> impl std::future::Future<Output = Result<Vec<Record>>> + Send;

    /// Create a record; the response carries the server-assigned id.
    fn create(
        &self,
        kind: ResourceKind,
        payload: &Map<String, Value>,
    ) -> impl std::future::Future<Output = Result<Record>> + Send;

    /// Patch a record with a partial payload.
    fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        payload: &Map<String, Value>,
    ) -> impl std::future::Future<Output = Result<Record>> + Send;

    /// Delete a record; success is signaled by status alone.
    fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// reqwest-backed client for the TailorMade backend.
#[derive(Clone)]
pub struct RestCollectionApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestCollectionApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestCollectionApi")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestCollectionApi {
    /// Build a client from validated engine configuration.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.api_base_url().to_string(),
            token: config.api_token().to_string(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
        })
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base_url, kind.collection_path())
    }

    fn record_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, kind.collection_path(), id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = parse_api_error(&body);
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth(message));
        }
        if status.is_client_error() {
            return Err(Error::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Err(Error::Http {
            status: status.as_u16(),
            message,
        })
    }
}

impl CollectionApi for RestCollectionApi {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<Record>> {
        let response = self
            .client
            .get(self.collection_url(kind))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let documents = Self::check(response).await?.json::<Vec<Value>>().await?;
        documents.into_iter().map(Record::from_remote).collect()
    }

    async fn create(&self, kind: ResourceKind, payload: &Map<String, Value>) -> Result<Record> {
        let response = self
            .client
            .post(self.collection_url(kind))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        let document = Self::check(response).await?.json::<Value>().await?;
        Record::from_remote(document)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        payload: &Map<String, Value>,
    ) -> Result<Record> {
        let response = self
            .client
            .patch(self.record_url(kind, id))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        let document = Self::check(response).await?.json::<Value>().await?;
        Record::from_remote(document)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.record_url(kind, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed
    }
}
