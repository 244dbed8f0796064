//! Backend contract: the trait the store talks to, plus wire types.
//!
//! The remote task-execution service is an external collaborator; this
//! module pins down exactly what the core expects from it. One real
//! implementation exists ([`http::HttpBackend`]); tests substitute their
//! own.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::filter::FilterSpec;
use crate::task::{ComplexityClass, ModelTier, Task, TaskDraft, TaskStatus};

pub use http::HttpBackend;

/// Window into the task list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// One page of tasks plus the unpaginated total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: usize,
}

/// Per-item failure inside a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    pub id: Uuid,
    pub message: String,
}

/// Result of a bulk operation.
///
/// Bulk operations are partial-success by contract: `success` only says
/// the request itself completed; the per-item outcome lives in
/// `processed` and `failed` and must be inspected separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub success: bool,
    #[serde(default)]
    pub processed: Vec<Uuid>,
    #[serde(default)]
    pub failed: Vec<BulkItemError>,
}

impl BulkResponse {
    /// An outcome that never touched the backend (e.g. every id was
    /// screened out locally).
    pub fn empty() -> Self {
        Self {
            success: true,
            processed: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Aggregate analytics computed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_tasks: u64,
    pub completed: u64,
    pub failed: u64,
    pub running: u64,
    pub pending: u64,
    /// Completed / (completed + failed), 0 when nothing finished yet
    pub success_rate: f64,
    pub avg_execution_secs: f64,
    #[serde(default)]
    pub by_model: HashMap<ModelTier, u64>,
    #[serde(default)]
    pub by_complexity: HashMap<ComplexityClass, u64>,
}

/// The remote task-execution service, as seen by the store.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// List tasks matching a filter, windowed by pagination.
    async fn list_tasks(
        &self,
        filter: &FilterSpec,
        page: &Pagination,
    ) -> Result<TaskPage, StoreError>;

    /// Fetch a single task by identifier; `None` if unknown.
    async fn get_task(&self, identifier: &str) -> Result<Option<Task>, StoreError>;

    /// Create a task. The backend assigns id, status and timestamps.
    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError>;

    /// Delete a set of tasks; partial success per [`BulkResponse`].
    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkResponse, StoreError>;

    /// Update the status of a set of tasks; partial success per
    /// [`BulkResponse`].
    async fn bulk_status(
        &self,
        ids: &[Uuid],
        status: TaskStatus,
    ) -> Result<BulkResponse, StoreError>;

    /// Fetch the aggregate analytics snapshot.
    async fn analytics(&self) -> Result<AnalyticsSummary, StoreError>;
}
