//! # taskdeck
//!
//! Client-side orchestration and resilience core for a dashboard that
//! operates a remote AI task-execution backend.
//!
//! This library provides:
//! - A task model with validation, complexity estimation and batch
//!   dependency checks
//! - A store that owns the in-memory collection and keeps it consistent
//!   under an unreliable network (two-tier cache TTLs, request
//!   coalescing, optimistic mutations, partial-success bulk operations)
//! - A health monitor that probes backend reachability and classifies
//!   connection quality
//!
//! ## Architecture
//!
//! ```text
//!   UI (pages, cards, forms — out of scope)
//!        │ intents                │ snapshots (watch)
//!        ▼                        ▲
//!   ┌──────────────────────────────────┐
//!   │            TaskStore             │
//!   │  cache · coalescing · fallback   │
//!   └──────┬─────────────┬─────────────┘
//!          │             │ reads
//!          ▼             ▼
//!   ┌────────────┐ ┌───────────────┐
//!   │ TaskBackend│ │ HealthMonitor │
//!   │  (HTTP)    │ │ (probe loop)  │
//!   └────────────┘ └───────────────┘
//! ```
//!
//! ## Degradation ladder
//! Fetches never strand the UI without data: live results, then the
//! last-known-good cache (with a stale notice), then a bundled dataset
//! (with an offline notice). Validation and dependency errors are
//! resolved locally and never reach the network.
//!
//! ## Modules
//! - `task`: entities, validation, estimation, dependency checks
//! - `store`: the orchestrating store and its cache policy
//! - `backend`: the backend trait and its HTTP implementation
//! - `health`: reachability probing and quality classification
//! - `filter`: the pure filter/sort engine
//! - `prefs`: persisted saved-filter/view-mode blob

use std::sync::Arc;

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod health;
pub mod prefs;
pub mod retry;
pub mod store;
pub mod task;

pub use backend::{AnalyticsSummary, BulkResponse, HttpBackend, Pagination, TaskBackend};
pub use config::{Config, ConfigError};
pub use error::{CreateError, StoreError};
pub use filter::{apply, FilterSpec, SortDirection, SortKey};
pub use health::{ConnectionQuality, HealthMonitor, HealthProbe, HealthSample, HealthStatus};
pub use prefs::{Prefs, PrefsStore, SavedFilter, ViewMode};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use store::{
    AnalyticsResult, DataSource, FetchResult, Notice, StoreConfig, TaskSnapshot, TaskStore,
};
pub use task::{
    ComplexityClass, ComplexityEstimate, ModelTier, Task, TaskDraft, TaskMetadata, TaskStatus,
};

/// Wire up a store against an HTTP backend from a [`Config`].
///
/// The returned store shares its backend with the health monitor; call
/// `store.monitor().start()` to begin probing.
pub fn build_store(config: &Config) -> Result<TaskStore, StoreError> {
    let backend = Arc::new(HttpBackend::with_timeout(
        config.backend_url.clone(),
        config.http_timeout,
    )?);
    let monitor = Arc::new(HealthMonitor::new(backend.clone(), config.health.clone()));
    Ok(TaskStore::new(backend, monitor, config.store.clone()))
}
