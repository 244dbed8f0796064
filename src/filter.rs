//! Filter specification and the pure filter/sort engine.
//!
//! [`apply`] is a total function over an in-memory task slice: stages
//! filter conjunctively in a fixed order, then one of four comparators
//! orders the survivors. Every comparator tie-breaks on `id` so the
//! output order is deterministic across re-renders.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{ModelTier, Task, TaskStatus};

/// Sort key for the ordered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Identifier,
    /// Fixed operational priority: running > pending > completed > failed
    Status,
    ComplexityScore,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Immutable filter specification.
///
/// Set-based filters use `Option`: `None` means "no constraint", while
/// `Some(set)` requires membership — so `Some` of an empty set matches
/// nothing. The UI-facing notion of an *active* filter is separate, see
/// [`FilterSpec::active_filter_count`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Free-text search; every whitespace-separated word must match
    #[serde(default)]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<HashSet<TaskStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<HashSet<ModelTier>>,
    /// Case-insensitive substring over the orchestration group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_contains: Option<String>,
    /// Inclusive bounds; `None` = unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    /// Inclusive complexity-score bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_max: Option<f64>,
    #[serde(default)]
    pub sort_key: SortKey,
    #[serde(default)]
    pub sort_dir: SortDirection,
}

impl FilterSpec {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn with_models(mut self, models: impl IntoIterator<Item = ModelTier>) -> Self {
        self.models = Some(models.into_iter().collect());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_contains = Some(group.into());
        self
    }

    pub fn with_score_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.score_min = min;
        self.score_max = max;
        self
    }

    pub fn with_sort(mut self, key: SortKey, dir: SortDirection) -> Self {
        self.sort_key = key;
        self.sort_dir = dir;
        self
    }

    /// Number of filters the UI should count as active.
    ///
    /// A set filter spanning its entire domain behaves exactly like no
    /// filter, so it is not counted — this is a display nuance only and
    /// never changes what [`apply`] matches.
    pub fn active_filter_count(&self) -> usize {
        let mut count = 0;
        if !self.search.trim().is_empty() {
            count += 1;
        }
        if let Some(statuses) = &self.statuses {
            if statuses.len() < TaskStatus::ALL.len() {
                count += 1;
            }
        }
        if let Some(models) = &self.models {
            if models.len() < ModelTier::ALL.len() {
                count += 1;
            }
        }
        if self
            .group_contains
            .as_deref()
            .is_some_and(|g| !g.trim().is_empty())
        {
            count += 1;
        }
        if self.created_after.is_some() || self.created_before.is_some() {
            count += 1;
        }
        if self.score_min.is_some() || self.score_max.is_some() {
            count += 1;
        }
        count
    }

    fn matches(&self, task: &Task) -> bool {
        if !self.search.trim().is_empty() {
            let haystack = format!(
                "{} {} {} {} {}",
                task.identifier,
                task.execution_prompt,
                task.orchestration_group.as_deref().unwrap_or(""),
                task.model,
                task.status
            )
            .to_lowercase();
            let all_words_match = self
                .search
                .split_whitespace()
                .all(|word| haystack.contains(&word.to_lowercase()));
            if !all_words_match {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&task.status) {
                return false;
            }
        }
        if let Some(models) = &self.models {
            if !models.contains(&task.model) {
                return false;
            }
        }
        if let Some(group) = self.group_contains.as_deref() {
            if !group.trim().is_empty() {
                let matched = task
                    .orchestration_group
                    .as_deref()
                    .is_some_and(|g| g.to_lowercase().contains(&group.to_lowercase()));
                if !matched {
                    return false;
                }
            }
        }
        if let Some(after) = self.created_after {
            if task.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if task.created_at > before {
                return false;
            }
        }
        if let Some(min) = self.score_min {
            if task.metadata.complexity_score < min {
                return false;
            }
        }
        if let Some(max) = self.score_max {
            if task.metadata.complexity_score > max {
                return false;
            }
        }
        true
    }
}

/// Filter and sort a task slice.
///
/// Stages apply conjunctively in a fixed order; the comparator for the
/// chosen key runs in the chosen direction and always falls back to `id`
/// ascending, giving a deterministic total order.
pub fn apply(tasks: &[Task], spec: &FilterSpec) -> Vec<Task> {
    let mut matched: Vec<Task> = tasks
        .iter()
        .filter(|task| spec.matches(task))
        .cloned()
        .collect();

    matched.sort_by(|a, b| {
        let primary = match spec.sort_key {
            SortKey::Identifier => a.identifier.cmp(&b.identifier),
            SortKey::Status => a.status.sort_priority().cmp(&b.status.sort_priority()),
            SortKey::ComplexityScore => a
                .metadata
                .complexity_score
                .total_cmp(&b.metadata.complexity_score),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let directed = match spec.sort_dir {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        directed.then_with(|| a.id.cmp(&b.id))
    });

    matched
}
