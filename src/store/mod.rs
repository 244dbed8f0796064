//! The task store: authoritative in-memory collection, cache policy,
//! request coalescing, optimistic mutations and the offline fallback
//! ladder.
//!
//! One store instance owns the collection; everything else receives
//! snapshots. Construction is explicit (`TaskStore::new`) with the
//! backend and health monitor injected, so tests build fresh stores
//! instead of sharing global state.
//!
//! ## Fallback ladder
//! Network failure never leaves the caller with zero data while any
//! fallback exists: serve the last-known-good cache with a `StaleData`
//! notice, or — if nothing was ever fetched — the bundled dataset with
//! an `OfflineFallback` notice. Only permanent errors (backend
//! rejections, decode failures) propagate as `Err`.

pub mod cache;
pub mod fallback;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use uuid::Uuid;

use crate::backend::{AnalyticsSummary, BulkResponse, Pagination, TaskBackend, TaskPage};
use crate::error::{CreateError, StoreError};
use crate::filter::{self, FilterSpec};
use crate::health::{HealthMonitor, HealthStatus};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::task::{
    estimate, has_blocking, validate_batch, validate_draft, FieldValidation, Task, TaskDraft,
    TaskMetadata, TaskStatus,
};

pub use cache::{CacheTtl, Freshness};

/// Where the data in a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Mirrors a successful backend fetch
    Live,
    /// Last-known-good data, backend currently failing
    Cache,
    /// Bundled dataset, nothing was ever fetched
    Fallback,
}

/// Degradation notice for the UI.
///
/// `StaleData` renders as a non-blocking banner, `OfflineFallback` as a
/// prominent one; operation errors (`Err` returns) map to transient
/// toasts. Exactly one of these three signals accompanies every
/// degraded outcome — nothing fails silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    StaleData,
    OfflineFallback,
}

/// Current view pushed to subscribers.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    /// Collection filtered and sorted by the store's current filter
    pub tasks: Vec<Task>,
    pub source: DataSource,
    pub notice: Option<Notice>,
}

impl Default for TaskSnapshot {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            source: DataSource::Live,
            notice: None,
        }
    }
}

/// Result of a `fetch` call.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// One page of the filtered, sorted view
    pub tasks: Vec<Task>,
    /// Size of the filtered view before pagination
    pub total: usize,
    pub source: DataSource,
    pub notice: Option<Notice>,
}

/// Result of an analytics refresh.
#[derive(Debug, Clone)]
pub struct AnalyticsResult {
    pub summary: AnalyticsSummary,
    pub source: DataSource,
    pub notice: Option<Notice>,
}

/// Store tuning knobs.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub ttl: CacheTtl,
    pub retry: RetryPolicy,
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>, StoreError>>>;
type InflightSlot<T> = Arc<Mutex<Option<(u64, SharedFetch<T>)>>>;

struct StoreState {
    tasks: Vec<Task>,
    /// Last successful network commit; `None` until the first one, and
    /// deliberately untouched by fallback installs so offline data never
    /// satisfies a TTL.
    fetched_at: Option<Instant>,
    stamps: cache::RequestStamps,
    /// Identifiers the dependency validator may reference.
    known_identifiers: HashSet<String>,
    source: DataSource,
    notice: Option<Notice>,
    current_filter: FilterSpec,
    analytics: Option<AnalyticsSummary>,
    analytics_fetched_at: Option<Instant>,
    analytics_stamps: cache::RequestStamps,
    analytics_source: DataSource,
    analytics_notice: Option<Notice>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            tasks: Vec::new(),
            fetched_at: None,
            stamps: cache::RequestStamps::default(),
            known_identifiers: HashSet::new(),
            source: DataSource::Live,
            notice: None,
            current_filter: FilterSpec::default(),
            analytics: None,
            analytics_fetched_at: None,
            analytics_stamps: cache::RequestStamps::default(),
            analytics_source: DataSource::Live,
            analytics_notice: None,
        }
    }
}

/// Client-side store over the remote task-execution backend.
///
/// Cheap to clone: all state is shared behind `Arc`s, so clones observe
/// the same collection (used internally for background revalidation).
#[derive(Clone)]
pub struct TaskStore {
    backend: Arc<dyn TaskBackend>,
    monitor: Arc<HealthMonitor>,
    config: StoreConfig,
    state: Arc<RwLock<StoreState>>,
    inflight_tasks: InflightSlot<TaskPage>,
    inflight_analytics: InflightSlot<AnalyticsSummary>,
    snapshot_tx: watch::Sender<TaskSnapshot>,
}

impl TaskStore {
    pub fn new(
        backend: Arc<dyn TaskBackend>,
        monitor: Arc<HealthMonitor>,
        config: StoreConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(TaskSnapshot::default());
        Self {
            backend,
            monitor,
            config,
            state: Arc::new(RwLock::new(StoreState::new())),
            inflight_tasks: Arc::new(Mutex::new(None)),
            inflight_analytics: Arc::new(Mutex::new(None)),
            snapshot_tx,
        }
    }

    /// Tear down background work owned by this store's collaborators.
    pub fn dispose(&self) {
        self.monitor.stop();
    }

    /// Subscribe to view snapshots.
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current view snapshot, without subscribing.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Current connectivity state (read-only, owned by the monitor).
    pub fn health(&self) -> HealthStatus {
        self.monitor.status()
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    /// Replace the filter driving the subscriber view.
    pub async fn set_filters(&self, filter: FilterSpec) {
        let mut state = self.state.write().await;
        state.current_filter = filter;
        self.publish(&state);
    }

    pub async fn current_filter(&self) -> FilterSpec {
        self.state.read().await.current_filter.clone()
    }

    /// Identifiers the dependency validator currently resolves against.
    pub async fn known_identifiers(&self) -> HashSet<String> {
        self.state.read().await.known_identifiers.clone()
    }

    // ── Fetch ────────────────────────────────────────────────────────

    /// Fetch one page of the filtered view.
    ///
    /// Two-tier TTL: below the short TTL the cache is served without any
    /// network activity; between the TTLs it is still served
    /// synchronously while a coalesced revalidation runs in the
    /// background; past the long TTL (or with `force`) the call waits
    /// for the network and then falls down the cache/fallback ladder on
    /// transient failure.
    pub async fn fetch(
        &self,
        filter: &FilterSpec,
        page: &Pagination,
        force: bool,
    ) -> Result<FetchResult, StoreError> {
        if !force {
            let freshness = {
                let state = self.state.read().await;
                cache::freshness(state.fetched_at, self.config.ttl.short, self.config.ttl.long)
            };
            match freshness {
                Freshness::Fresh => return Ok(self.local_view(filter, page).await),
                Freshness::Aging => {
                    let store = self.clone();
                    let filter_clone = filter.clone();
                    let page_clone = *page;
                    tokio::spawn(async move {
                        if let Err(err) = store
                            .fetch_tasks_coalesced(&filter_clone, &page_clone, false)
                            .await
                        {
                            tracing::debug!(error = %err, "Background revalidation failed");
                        }
                    });
                    return Ok(self.local_view(filter, page).await);
                }
                Freshness::Stale => {}
            }
        }

        match self.fetch_tasks_coalesced(filter, page, force).await {
            Ok(_) => Ok(self.local_view(filter, page).await),
            Err(err) if err.is_transient() => {
                let quality = self.monitor.status().quality;
                {
                    let mut state = self.state.write().await;
                    if state.fetched_at.is_some() {
                        state.source = DataSource::Cache;
                        state.notice = Some(Notice::StaleData);
                        tracing::warn!(
                            error = %err,
                            %quality,
                            "Fetch failed, serving last-known-good cache"
                        );
                    } else {
                        if state.source != DataSource::Fallback {
                            state.tasks = fallback::bundled_tasks();
                            let identifiers: Vec<String> =
                                state.tasks.iter().map(|t| t.identifier.clone()).collect();
                            state.known_identifiers.extend(identifiers);
                        }
                        state.source = DataSource::Fallback;
                        state.notice = Some(Notice::OfflineFallback);
                        tracing::warn!(
                            error = %err,
                            %quality,
                            "Fetch failed with no cache, serving bundled dataset"
                        );
                    }
                    self.publish(&state);
                }
                Ok(self.local_view(filter, page).await)
            }
            Err(err) => Err(err),
        }
    }

    /// One in-flight network fetch per cache key: later callers await
    /// the existing request instead of issuing duplicates. A `force`
    /// caller supersedes the slot with a fresh request; the superseded
    /// response is discarded at commit time by its older stamp.
    async fn fetch_tasks_coalesced(
        &self,
        filter: &FilterSpec,
        page: &Pagination,
        force: bool,
    ) -> Result<Arc<TaskPage>, StoreError> {
        let (stamp, shared) = {
            let mut slot = self.inflight_tasks.lock().await;
            match slot.as_ref() {
                Some((stamp, shared)) if !force => (*stamp, shared.clone()),
                _ => {
                    let stamp = self.state.write().await.stamps.issue();
                    let store = self.clone();
                    let filter = filter.clone();
                    let page = *page;
                    let fut: SharedFetch<TaskPage> = async move {
                        let result = store.backend.list_tasks(&filter, &page).await;
                        match result {
                            Ok(task_page) => {
                                let task_page = Arc::new(task_page);
                                store.commit_tasks(stamp, &task_page).await;
                                Ok(task_page)
                            }
                            Err(err) => Err(err),
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some((stamp, fut.clone()));
                    (stamp, fut)
                }
            }
        };

        let result = shared.await;

        let mut slot = self.inflight_tasks.lock().await;
        if matches!(slot.as_ref(), Some((s, _)) if *s == stamp) {
            *slot = None;
        }
        result
    }

    async fn commit_tasks(&self, stamp: u64, page: &Arc<TaskPage>) {
        let mut state = self.state.write().await;
        if !state.stamps.try_commit(stamp) {
            tracing::debug!(stamp, "Discarding superseded fetch response");
            return;
        }
        state.tasks = page.tasks.clone();
        state.fetched_at = Some(Instant::now());
        state.source = DataSource::Live;
        state.notice = None;
        let identifiers: Vec<String> = page.tasks.iter().map(|t| t.identifier.clone()).collect();
        state.known_identifiers.extend(identifiers);
        self.publish(&state);
        tracing::debug!(tasks = page.tasks.len(), "Committed fresh task collection");
    }

    async fn local_view(&self, filter: &FilterSpec, page: &Pagination) -> FetchResult {
        let state = self.state.read().await;
        let filtered = filter::apply(&state.tasks, filter);
        let total = filtered.len();
        let tasks = filtered
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        FetchResult {
            tasks,
            total,
            source: state.source,
            notice: state.notice,
        }
    }

    // ── Create ───────────────────────────────────────────────────────

    /// Create a single task. See [`TaskStore::create_batch`].
    pub async fn create(&self, draft: TaskDraft) -> Result<Task, CreateError> {
        let mut created = self.create_batch(vec![draft]).await?;
        // A successful one-element batch always yields one task.
        created.pop().ok_or_else(|| {
            CreateError::Store(StoreError::Decode {
                message: "backend returned an empty create result".to_string(),
            })
        })
    }

    /// Validate and submit a batch of drafts (an orchestration group is
    /// submitted as one batch so `depends_on` can reference batch
    /// members).
    ///
    /// Field validation and dependency validation run locally and
    /// synchronously before any network call; failures never reach the
    /// backend. Each created task is optimistically inserted at the head
    /// of the collection and its identifier recorded for later
    /// dependency resolution, so an immediate fetch observes the insert.
    pub async fn create_batch(&self, drafts: Vec<TaskDraft>) -> Result<Vec<Task>, CreateError> {
        let known = {
            let state = self.state.read().await;
            state.known_identifiers.clone()
        };

        let mut results: Vec<FieldValidation> = Vec::new();
        let mut batch_identifiers: HashSet<&str> = HashSet::new();
        for draft in &drafts {
            results.extend(validate_draft(draft));
            if known.contains(&draft.identifier) {
                results.push(FieldValidation::error(
                    "identifier",
                    format!("'{}' already exists", draft.identifier),
                ));
            }
            if !batch_identifiers.insert(draft.identifier.as_str()) {
                results.push(FieldValidation::error(
                    "identifier",
                    format!("'{}' appears twice in this batch", draft.identifier),
                ));
            }
        }
        if has_blocking(&results) {
            return Err(CreateError::Invalid(results));
        }

        validate_batch(&drafts, &known)?;

        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            let task = retry_with_backoff(&self.config.retry, "create_task", || {
                self.backend.create_task(draft)
            })
            .await?;

            let mut state = self.state.write().await;
            state.known_identifiers.insert(task.identifier.clone());
            state.tasks.insert(0, task.clone());
            self.publish(&state);
            drop(state);

            tracing::info!(identifier = %task.identifier, id = %task.id, "Task created");
            created.push(task);
        }
        Ok(created)
    }

    /// Estimate metadata for a draft the way the store will at creation
    /// time (for pre-submission display).
    pub fn preview_metadata(draft: &TaskDraft) -> TaskMetadata {
        let estimate = estimate(&draft.execution_prompt, draft.model);
        TaskMetadata::from_estimate(&estimate, draft.template.clone())
    }

    // ── Bulk operations ──────────────────────────────────────────────

    /// Delete a set of tasks.
    ///
    /// Partial-success contract: exactly the ids the backend reports as
    /// processed are removed locally; failed ids stay untouched and are
    /// returned to the caller. Ids of `Running` tasks are screened out
    /// locally (a running task cannot be deleted) and reported in the
    /// failed list without ever reaching the backend.
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkResponse, StoreError> {
        let (eligible, mut screened): (Vec<Uuid>, Vec<crate::backend::BulkItemError>) = {
            let state = self.state.read().await;
            let running: HashSet<Uuid> = state
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Running)
                .map(|t| t.id)
                .collect();
            let mut eligible = Vec::new();
            let mut screened = Vec::new();
            for &id in ids {
                if running.contains(&id) {
                    screened.push(crate::backend::BulkItemError {
                        id,
                        message: "task is running and cannot be deleted".to_string(),
                    });
                } else {
                    eligible.push(id);
                }
            }
            (eligible, screened)
        };

        let mut response = if eligible.is_empty() {
            BulkResponse::empty()
        } else {
            retry_with_backoff(&self.config.retry, "bulk_delete", || {
                self.backend.bulk_delete(&eligible)
            })
            .await?
        };

        if !response.processed.is_empty() {
            let mut state = self.state.write().await;
            let processed: HashSet<Uuid> = response.processed.iter().copied().collect();
            let removed_identifiers: Vec<String> = state
                .tasks
                .iter()
                .filter(|t| processed.contains(&t.id))
                .map(|t| t.identifier.clone())
                .collect();
            state.tasks.retain(|t| !processed.contains(&t.id));
            for identifier in &removed_identifiers {
                state.known_identifiers.remove(identifier);
            }
            self.publish(&state);
        }

        if !response.failed.is_empty() || !screened.is_empty() {
            tracing::warn!(
                processed = response.processed.len(),
                failed = response.failed.len() + screened.len(),
                "Bulk delete completed partially"
            );
        }
        response.failed.append(&mut screened);
        Ok(response)
    }

    /// Update the status of a set of tasks.
    ///
    /// `Running` is refused as a target: that transition is authored
    /// exclusively by the backend and only mirrored here. The processed
    /// subset is mirrored locally; failed ids stay untouched.
    pub async fn bulk_update_status(
        &self,
        ids: &[Uuid],
        status: TaskStatus,
    ) -> Result<BulkResponse, StoreError> {
        if status == TaskStatus::Running {
            return Err(StoreError::InvalidOperation {
                message: "tasks cannot be moved into 'running' by the client".to_string(),
            });
        }

        let response = retry_with_backoff(&self.config.retry, "bulk_status", || {
            self.backend.bulk_status(ids, status)
        })
        .await?;

        if !response.processed.is_empty() {
            let mut state = self.state.write().await;
            let processed: HashSet<Uuid> = response.processed.iter().copied().collect();
            for task in state.tasks.iter_mut() {
                if processed.contains(&task.id) {
                    task.mirror_status(status);
                }
            }
            self.publish(&state);
        }

        if !response.failed.is_empty() {
            tracing::warn!(
                processed = response.processed.len(),
                failed = response.failed.len(),
                %status,
                "Bulk status update completed partially"
            );
        }
        Ok(response)
    }

    // ── Analytics ────────────────────────────────────────────────────

    /// Refresh the analytics snapshot, with the same two-tier cache
    /// policy as `fetch` but the longer analytics TTL, and the same
    /// cache-then-bundled fallback ladder on transient failure.
    pub async fn refresh_analytics(&self, force: bool) -> Result<AnalyticsResult, StoreError> {
        if !force {
            let cached = {
                let state = self.state.read().await;
                let freshness = cache::freshness(
                    state.analytics_fetched_at,
                    self.config.ttl.analytics_short,
                    self.config.ttl.analytics_long,
                );
                match freshness {
                    Freshness::Fresh | Freshness::Aging => {
                        state.analytics.clone().map(|summary| {
                            (
                                freshness,
                                AnalyticsResult {
                                    summary,
                                    source: state.analytics_source,
                                    notice: state.analytics_notice,
                                },
                            )
                        })
                    }
                    Freshness::Stale => None,
                }
            };
            if let Some((freshness, result)) = cached {
                if freshness == Freshness::Aging {
                    let store = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = store.fetch_analytics_coalesced(false).await {
                            tracing::debug!(error = %err, "Background analytics refresh failed");
                        }
                    });
                }
                return Ok(result);
            }
        }

        match self.fetch_analytics_coalesced(force).await {
            Ok(summary) => Ok(AnalyticsResult {
                summary: (*summary).clone(),
                source: DataSource::Live,
                notice: None,
            }),
            Err(err) if err.is_transient() => {
                let mut state = self.state.write().await;
                // Only a summary that actually came from the network counts
                // as a cache; a previously installed fallback keeps its
                // offline labeling.
                let cached = state
                    .analytics_fetched_at
                    .and_then(|_| state.analytics.clone());
                if let Some(summary) = cached {
                    state.analytics_source = DataSource::Cache;
                    state.analytics_notice = Some(Notice::StaleData);
                    tracing::warn!(error = %err, "Analytics fetch failed, serving cached summary");
                    Ok(AnalyticsResult {
                        summary,
                        source: DataSource::Cache,
                        notice: Some(Notice::StaleData),
                    })
                } else {
                    let summary = fallback::bundled_analytics();
                    state.analytics = Some(summary.clone());
                    state.analytics_source = DataSource::Fallback;
                    state.analytics_notice = Some(Notice::OfflineFallback);
                    tracing::warn!(
                        error = %err,
                        "Analytics fetch failed with no cache, serving bundled summary"
                    );
                    Ok(AnalyticsResult {
                        summary,
                        source: DataSource::Fallback,
                        notice: Some(Notice::OfflineFallback),
                    })
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_analytics_coalesced(
        &self,
        force: bool,
    ) -> Result<Arc<AnalyticsSummary>, StoreError> {
        let (stamp, shared) = {
            let mut slot = self.inflight_analytics.lock().await;
            match slot.as_ref() {
                Some((stamp, shared)) if !force => (*stamp, shared.clone()),
                _ => {
                    let stamp = self.state.write().await.analytics_stamps.issue();
                    let store = self.clone();
                    let fut: SharedFetch<AnalyticsSummary> = async move {
                        let result = store.backend.analytics().await;
                        match result {
                            Ok(summary) => {
                                let summary = Arc::new(summary);
                                store.commit_analytics(stamp, &summary).await;
                                Ok(summary)
                            }
                            Err(err) => Err(err),
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some((stamp, fut.clone()));
                    (stamp, fut)
                }
            }
        };

        let result = shared.await;

        let mut slot = self.inflight_analytics.lock().await;
        if matches!(slot.as_ref(), Some((s, _)) if *s == stamp) {
            *slot = None;
        }
        result
    }

    async fn commit_analytics(&self, stamp: u64, summary: &Arc<AnalyticsSummary>) {
        let mut state = self.state.write().await;
        if !state.analytics_stamps.try_commit(stamp) {
            tracing::debug!(stamp, "Discarding superseded analytics response");
            return;
        }
        state.analytics = Some((**summary).clone());
        state.analytics_fetched_at = Some(Instant::now());
        state.analytics_source = DataSource::Live;
        state.analytics_notice = None;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn publish(&self, state: &StoreState) {
        let snapshot = TaskSnapshot {
            tasks: filter::apply(&state.tasks, &state.current_filter),
            source: state.source,
            notice: state.notice,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}
