//! Bundled dataset served when the backend is unreachable and no cache
//! exists. The dashboard must never be left with zero data and a hard
//! error, so this is the bottom rung of the fallback ladder.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::backend::AnalyticsSummary;
use crate::task::{estimate, ModelTier, Task, TaskMetadata, TaskStatus};

/// Fixed id namespace so repeated fallbacks do not churn identity
/// across re-renders or selections.
const FALLBACK_ID_BASE: u128 = 0x7a50_decc_0000_0000_0000_0000_0000_0000;

fn offline_task(
    seq: u128,
    identifier: &str,
    status: TaskStatus,
    model: ModelTier,
    prompt: &str,
    group: Option<&str>,
    age_minutes: i64,
) -> Task {
    let estimate = estimate(prompt, model);
    let created_at = Utc::now() - Duration::minutes(age_minutes);
    Task {
        id: Uuid::from_u128(FALLBACK_ID_BASE + seq),
        identifier: identifier.to_string(),
        status,
        execution_prompt: prompt.to_string(),
        model,
        working_directory: None,
        system_prompt: None,
        orchestration_group: group.map(|g| g.to_string()),
        depends_on: Vec::new(),
        wait_after_dependencies_secs: 0,
        metadata: TaskMetadata::from_estimate(&estimate, None),
        created_at,
        updated_at: created_at,
    }
}

/// The bundled offline dataset.
pub fn bundled_tasks() -> Vec<Task> {
    vec![
        offline_task(
            1,
            "sample-refactor-auth",
            TaskStatus::Running,
            ModelTier::Sonnet,
            "Refactor the authentication module to use the new session \
             middleware, keep the login and logout endpoints backwards \
             compatible, and migrate the existing integration tests to the \
             new fixtures so the suite stays green.",
            Some("auth-revamp"),
            12,
        ),
        offline_task(
            2,
            "sample-changelog-review",
            TaskStatus::Pending,
            ModelTier::Haiku,
            "Read the changelog entries merged since the last release and \
             list anything that needs a documentation update.",
            None,
            45,
        ),
        offline_task(
            3,
            "sample-billing-migration",
            TaskStatus::Completed,
            ModelTier::Opus,
            "Implement and deploy the billing table migration: build the \
             backfill job, integrate it with the nightly scheduler, and \
             create a rollback script in case the backfill has to be \
             reverted mid-run.",
            Some("billing-q3"),
            240,
        ),
        offline_task(
            4,
            "sample-flaky-search",
            TaskStatus::Failed,
            ModelTier::Sonnet,
            "Find and analyze the flaky search tests, check whether the \
             failures correlate with the index rebuild job.",
            None,
            600,
        ),
    ]
}

/// Analytics computed locally from the bundled dataset, so the analytics
/// panel renders in offline mode too.
pub fn bundled_analytics() -> AnalyticsSummary {
    let tasks = bundled_tasks();
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count() as u64;
    let failed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .count() as u64;
    let running = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Running)
        .count() as u64;
    let pending = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count() as u64;

    let finished = completed + failed;
    let success_rate = if finished > 0 {
        completed as f64 / finished as f64
    } else {
        0.0
    };

    let mut by_model: HashMap<ModelTier, u64> = HashMap::new();
    let mut by_complexity = HashMap::new();
    for task in &tasks {
        *by_model.entry(task.model).or_default() += 1;
        *by_complexity.entry(task.metadata.complexity).or_default() += 1;
    }

    AnalyticsSummary {
        total_tasks: tasks.len() as u64,
        completed,
        failed,
        running,
        pending,
        success_rate,
        avg_execution_secs: 0.0,
        by_model,
        by_complexity,
    }
}
