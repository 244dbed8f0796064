//! Field-level validation predicates for task drafts.
//!
//! Validation never fails hard: every predicate returns a structured
//! [`FieldValidation`] so the consuming UI can render non-fatal,
//! per-field feedback. Only `Severity::Error` blocks submission.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::TaskDraft;

/// Identifier rule: starts with a letter, then letters, digits,
/// underscore or dash.
const IDENTIFIER_PATTERN: &str = "^[A-Za-z][A-Za-z0-9_-]*$";

const IDENTIFIER_MIN_LEN: usize = 3;
const IDENTIFIER_MAX_LEN: usize = 50;

/// Recommended prompt length band; outside it is a warning, not an error.
const PROMPT_RECOMMENDED_MIN: usize = 150;
const PROMPT_RECOMMENDED_MAX: usize = 2000;

/// Prompts shorter than this are rejected outright.
const PROMPT_HARD_MIN: usize = 10;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid"))
}

/// How strongly a validation result should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks submission
    Error,
    /// Submission allowed, caution surfaced
    Warning,
    /// Purely positive feedback
    Info,
}

/// Structured outcome of validating a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValidation {
    pub is_valid: bool,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl FieldValidation {
    pub fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn info(field: &str, message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Info,
        }
    }

    /// Whether this result blocks submission.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Validate the identifier format and length.
pub fn validate_identifier(identifier: &str) -> FieldValidation {
    if identifier.len() < IDENTIFIER_MIN_LEN {
        return FieldValidation::error(
            "identifier",
            format!("must be at least {} characters", IDENTIFIER_MIN_LEN),
        );
    }
    if identifier.len() > IDENTIFIER_MAX_LEN {
        return FieldValidation::error(
            "identifier",
            format!("must be at most {} characters", IDENTIFIER_MAX_LEN),
        );
    }
    if !identifier_regex().is_match(identifier) {
        return FieldValidation::error(
            "identifier",
            "must start with a letter and contain only letters, digits, '_' or '-'",
        );
    }
    FieldValidation::info("identifier", "looks good")
}

/// Validate the execution prompt length.
pub fn validate_prompt(prompt: &str) -> FieldValidation {
    let len = prompt.trim().len();
    if len == 0 {
        return FieldValidation::error("execution_prompt", "prompt is required");
    }
    if len < PROMPT_HARD_MIN {
        return FieldValidation::error(
            "execution_prompt",
            format!("prompt is too short (minimum {} characters)", PROMPT_HARD_MIN),
        );
    }
    if len < PROMPT_RECOMMENDED_MIN {
        return FieldValidation::warning(
            "execution_prompt",
            format!(
                "short prompts produce vague tasks; {}+ characters recommended",
                PROMPT_RECOMMENDED_MIN
            ),
        );
    }
    if len > PROMPT_RECOMMENDED_MAX {
        return FieldValidation::warning(
            "execution_prompt",
            format!(
                "very long prompts dilute instructions; {} characters or fewer recommended",
                PROMPT_RECOMMENDED_MAX
            ),
        );
    }
    FieldValidation::info("execution_prompt", "good length")
}

/// Sanity-check an optional working directory path.
///
/// Rejects NUL bytes and parent traversal; warns on relative paths since
/// the backend resolves them against an unspecified base.
pub fn validate_working_directory(path: Option<&str>) -> FieldValidation {
    let Some(path) = path else {
        return FieldValidation::info("working_directory", "backend default will be used");
    };
    if path.trim().is_empty() || path.contains('\0') {
        return FieldValidation::error("working_directory", "not a usable path");
    }
    if path.split('/').any(|segment| segment == "..") {
        return FieldValidation::error("working_directory", "parent traversal is not allowed");
    }
    if !path.starts_with('/') {
        return FieldValidation::warning(
            "working_directory",
            "relative paths are resolved by the backend; an absolute path is safer",
        );
    }
    FieldValidation::info("working_directory", "looks good")
}

/// Run every field validator over a draft.
///
/// The result always contains one entry per validated field; callers
/// decide what to surface. [`has_blocking`] answers the submission
/// question.
pub fn validate_draft(draft: &TaskDraft) -> Vec<FieldValidation> {
    vec![
        validate_identifier(&draft.identifier),
        validate_prompt(&draft.execution_prompt),
        validate_working_directory(draft.working_directory.as_deref()),
    ]
}

/// Whether any result in a set blocks submission.
pub fn has_blocking(results: &[FieldValidation]) -> bool {
    results.iter().any(FieldValidation::is_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::ModelTier;

    #[test]
    fn valid_identifiers_pass() {
        for id in ["abc", "Task-1", "a_b_c", "Z9", "migration-2024_v2"] {
            if id.len() >= IDENTIFIER_MIN_LEN {
                let result = validate_identifier(id);
                assert!(result.is_valid, "{:?} should be valid: {}", id, result.message);
            }
        }
    }

    #[test]
    fn invalid_identifiers_fail_with_error_severity() {
        for id in ["", "ab", "1abc", "-abc", "has space", "tem:colon", "é-acentuado"] {
            let result = validate_identifier(id);
            assert!(!result.is_valid, "{:?} should be invalid", id);
            assert_eq!(result.severity, Severity::Error);
        }
    }

    #[test]
    fn identifier_length_bounds() {
        assert!(validate_identifier(&"a".repeat(50)).is_valid);
        assert!(!validate_identifier(&"a".repeat(51)).is_valid);
        assert!(validate_identifier("abc").is_valid);
        assert!(!validate_identifier("ab").is_valid);
    }

    #[test]
    fn empty_prompt_is_an_error() {
        let result = validate_prompt("");
        assert!(result.is_blocking());
    }

    #[test]
    fn short_prompt_warns_but_does_not_block() {
        let result = validate_prompt("fix the login page styling now");
        assert!(result.is_valid);
        assert_eq!(result.severity, Severity::Warning);
    }

    #[test]
    fn recommended_length_prompt_is_info() {
        let result = validate_prompt(&"describe the work ".repeat(12));
        assert_eq!(result.severity, Severity::Info);
    }

    #[test]
    fn working_directory_rules() {
        assert!(validate_working_directory(None).is_valid);
        assert!(validate_working_directory(Some("/srv/app")).is_valid);
        assert!(validate_working_directory(Some("../etc")).is_blocking());
        assert!(validate_working_directory(Some("/a/../b")).is_blocking());
        assert_eq!(
            validate_working_directory(Some("relative/path")).severity,
            Severity::Warning
        );
    }

    #[test]
    fn validate_draft_aggregates_all_fields() {
        let draft = TaskDraft::new("x", "short", ModelTier::Haiku);
        let results = validate_draft(&draft);
        assert_eq!(results.len(), 3);
        assert!(has_blocking(&results));
    }
}
