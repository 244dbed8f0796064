//! Core task entity and status mirror.
//!
//! # Invariants
//! - `identifier` is unique within a store's view of the collection
//! - `depends_on` never references the task's own identifier
//! - `updated_at` is refreshed on every status transition

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::estimator::{ComplexityClass, ComplexityEstimate, DurationEstimate};

/// Cost/quality tier a task is assigned to.
///
/// This is a pricing tier, not a compute target: higher tiers are routed
/// to more capable (and more expensive) models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelTier {
    /// All tiers, in ascending capability order.
    pub const ALL: [ModelTier; 3] = [ModelTier::Haiku, ModelTier::Sonnet, ModelTier::Opus];

    /// Complexity multiplier: higher tiers are assigned to harder work,
    /// so the same prompt scores higher on a higher tier.
    pub fn complexity_multiplier(&self) -> f64 {
        match self {
            ModelTier::Haiku => 0.7,
            ModelTier::Sonnet => 1.0,
            ModelTier::Opus => 1.4,
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Haiku => write!(f, "haiku"),
            ModelTier::Sonnet => write!(f, "sonnet"),
            ModelTier::Opus => write!(f, "opus"),
        }
    }
}

/// Status of a task as reported by the backend.
///
/// # State Machine
/// ```text
/// Pending -> Running -> Completed
///                   \-> Failed
/// ```
///
/// Terminal states are `Completed` and `Failed`. The client never moves a
/// task *into* `Running` on its own; that transition is authored
/// exclusively by the backend and only mirrored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for the backend to pick the task up
    Pending,
    /// Currently executing on the backend
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    /// All statuses (the full filter domain).
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// Check if the task is in a terminal state.
    ///
    /// # Property
    /// `is_terminal() => no further transitions are defined`
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Operational sort priority: active work surfaces first.
    ///
    /// `Running > Pending > Completed > Failed` — deliberately not
    /// alphabetical, because a status sort should put live tasks on top.
    pub fn sort_priority(&self) -> u8 {
        match self {
            TaskStatus::Running => 0,
            TaskStatus::Pending => 1,
            TaskStatus::Completed => 2,
            TaskStatus::Failed => 3,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Derived, read-only task metadata computed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Heuristic complexity bucket
    pub complexity: ComplexityClass,
    /// Raw heuristic score the bucket was derived from
    pub complexity_score: f64,
    /// Advisory duration estimate for the bucket
    pub estimated_duration: DurationEstimate,
    /// When the estimate was computed
    pub estimated_at: DateTime<Utc>,
    /// Template this task was instantiated from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl TaskMetadata {
    /// Build metadata from an estimator result.
    pub fn from_estimate(estimate: &ComplexityEstimate, template: Option<String>) -> Self {
        Self {
            complexity: estimate.class,
            complexity_score: estimate.score,
            estimated_duration: estimate.duration,
            estimated_at: Utc::now(),
            template,
        }
    }
}

/// A task as tracked by the store and exchanged with the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Backend-assigned opaque handle
    pub id: Uuid,
    /// Human-chosen unique name (`^[A-Za-z][A-Za-z0-9_-]*$`, 3-50 chars)
    pub identifier: String,
    pub status: TaskStatus,
    /// Free-text instruction driving the execution (and the estimator)
    pub execution_prompt: String,
    pub model: ModelTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Tasks sharing a group are submitted and tracked together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestration_group: Option<String>,
    /// Identifiers this task waits on, within its submission batch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Delay applied after all dependencies complete, in seconds
    #[serde(default)]
    pub wait_after_dependencies_secs: u64,
    pub metadata: TaskMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Delay to apply after all dependencies reach `Completed`.
    pub fn wait_after_dependencies(&self) -> Duration {
        Duration::from_secs(self.wait_after_dependencies_secs)
    }

    /// Mirror a status reported by the backend.
    ///
    /// The backend is authoritative, so the new status is always applied
    /// and `updated_at` refreshed; a transition the local state machine
    /// does not define (e.g. out of a terminal state) is logged rather
    /// than rejected.
    pub fn mirror_status(&mut self, status: TaskStatus) {
        if self.status == status {
            return;
        }
        let defined = matches!(
            (self.status, status),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        );
        if !defined {
            tracing::warn!(
                identifier = %self.identifier,
                from = %self.status,
                to = %status,
                "Mirroring a status transition the local state machine does not define"
            );
        }
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Creation payload: everything the caller chooses, nothing derived.
///
/// Serialized as the body of the create request; `id`, `status`,
/// `metadata` and timestamps are assigned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub identifier: String,
    pub execution_prompt: String,
    pub model: ModelTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestration_group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub wait_after_dependencies_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl TaskDraft {
    /// Minimal draft with defaults for the optional execution context.
    pub fn new(
        identifier: impl Into<String>,
        execution_prompt: impl Into<String>,
        model: ModelTier,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            execution_prompt: execution_prompt.into(),
            model,
            working_directory: None,
            system_prompt: None,
            orchestration_group: None,
            depends_on: Vec::new(),
            wait_after_dependencies_secs: 0,
            template: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.orchestration_group = Some(group.into());
        self
    }

    pub fn with_dependencies(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }
}
