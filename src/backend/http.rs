//! HTTP implementation of the backend contract (reqwest, JSON).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use super::{AnalyticsSummary, BulkResponse, Pagination, TaskBackend, TaskPage};
use crate::error::StoreError;
use crate::filter::{FilterSpec, SortDirection, SortKey};
use crate::health::HealthProbe;
use crate::task::{Task, TaskDraft, TaskStatus};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Task-execution backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        url::Url::parse(&base_url).map_err(|e| StoreError::InvalidOperation {
            message: format!("invalid backend base URL '{}': {}", base_url, e),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network {
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_request_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            StoreError::Network {
                message: err.to_string(),
            }
        }
    }

    /// Turn a response into a decoded body or a classified error.
    async fn decode<T: DeserializeOwned>(&self, resp: Response) -> Result<T, StoreError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;
        if !status.is_success() {
            return Err(StoreError::from_http_status(status.as_u16(), text));
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Decode {
            message: format!("{} (body: {:.200})", e, text),
        })
    }

    fn filter_query(filter: &FilterSpec, page: &Pagination) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if !filter.search.trim().is_empty() {
            pairs.push(("search".to_string(), filter.search.clone()));
        }
        if let Some(statuses) = &filter.statuses {
            let mut values: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
            values.sort();
            pairs.push(("status".to_string(), values.join(",")));
        }
        if let Some(models) = &filter.models {
            let mut values: Vec<String> = models.iter().map(|m| m.to_string()).collect();
            values.sort();
            pairs.push(("model".to_string(), values.join(",")));
        }
        if let Some(group) = &filter.group_contains {
            pairs.push(("group".to_string(), group.clone()));
        }
        if let Some(after) = filter.created_after {
            pairs.push(("created_after".to_string(), after.to_rfc3339()));
        }
        if let Some(before) = filter.created_before {
            pairs.push(("created_before".to_string(), before.to_rfc3339()));
        }
        if let Some(min) = filter.score_min {
            pairs.push(("score_min".to_string(), min.to_string()));
        }
        if let Some(max) = filter.score_max {
            pairs.push(("score_max".to_string(), max.to_string()));
        }
        let sort = match filter.sort_key {
            SortKey::Identifier => "identifier",
            SortKey::Status => "status",
            SortKey::ComplexityScore => "complexity_score",
            SortKey::CreatedAt => "created_at",
        };
        let order = match filter.sort_dir {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        pairs.push(("sort".to_string(), sort.to_string()));
        pairs.push(("order".to_string(), order.to_string()));
        pairs.push(("limit".to_string(), page.limit.to_string()));
        pairs.push(("offset".to_string(), page.offset.to_string()));
        pairs
    }
}

#[async_trait]
impl TaskBackend for HttpBackend {
    async fn list_tasks(
        &self,
        filter: &FilterSpec,
        page: &Pagination,
    ) -> Result<TaskPage, StoreError> {
        let resp = self
            .client
            .get(format!("{}/tasks", self.base_url))
            .query(&Self::filter_query(filter, page))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        self.decode(resp).await
    }

    async fn get_task(&self, identifier: &str) -> Result<Option<Task>, StoreError> {
        let resp = self
            .client
            .get(format!("{}/tasks/{}", self.base_url, identifier))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.decode(resp).await.map(Some)
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        let resp = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .json(draft)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        self.decode(resp).await
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkResponse, StoreError> {
        let resp = self
            .client
            .post(format!("{}/tasks/bulk-delete", self.base_url))
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        self.decode(resp).await
    }

    async fn bulk_status(
        &self,
        ids: &[Uuid],
        status: TaskStatus,
    ) -> Result<BulkResponse, StoreError> {
        let resp = self
            .client
            .post(format!("{}/tasks/bulk-status", self.base_url))
            .json(&json!({ "ids": ids, "status": status }))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        self.decode(resp).await
    }

    async fn analytics(&self) -> Result<AnalyticsSummary, StoreError> {
        let resp = self
            .client
            .get(format!("{}/tasks/analytics", self.base_url))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        self.decode(resp).await
    }
}

#[async_trait]
impl HealthProbe for HttpBackend {
    /// Probe `GET /health`; any 2xx inside the timeout counts as healthy.
    async fn probe(&self) -> Result<u64, StoreError> {
        let started = Instant::now();
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::from_http_status(status.as_u16(), body));
        }
        Ok(started.elapsed().as_millis() as u64)
    }
}
