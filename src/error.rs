//! Error taxonomy with retry classification.
//!
//! Distinguishes transient failures (network, timeout, overload — retry
//! and fall back to cached data) from permanent ones (backend rejection,
//! malformed responses, local misuse — surface immediately, never retry).
//!
//! Errors are `Clone` so coalesced callers awaiting the same in-flight
//! request can all receive the same failure.

use thiserror::Error;

use crate::task::{DependencyError, FieldValidation};

/// Failure of a store or backend operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connection-level failure or overloaded backend (429/5xx).
    /// Transient: triggers the cache/fallback ladder and is retryable.
    #[error("network error: {message}")]
    Network { message: String },

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Authoritative refusal from the backend (e.g. duplicate
    /// identifier). Surfaced verbatim, never retried.
    #[error("backend rejected the request (HTTP {status}): {message}")]
    BackendRejection { status: u16, message: String },

    /// The backend answered but the body was not what we expect.
    #[error("could not decode backend response: {message}")]
    Decode { message: String },

    /// Local misuse of an operation (e.g. bulk-updating tasks into
    /// `running`, which only the backend may author). Never sent over
    /// the network and never retried.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl StoreError {
    /// Whether the error is transient and worth retrying / absorbing via
    /// the fallback ladder.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Network { .. } | StoreError::Timeout { .. }
        )
    }

    /// Classify an HTTP error status plus body into a `StoreError`.
    ///
    /// 429 and 5xx are backend overload/failure and count as transient
    /// network errors; any other non-2xx status is an authoritative
    /// rejection.
    pub fn from_http_status(status: u16, body: String) -> Self {
        match status {
            429 | 500..=599 => StoreError::Network {
                message: format!("HTTP {}: {}", status, body),
            },
            _ => StoreError::BackendRejection {
                status,
                message: body,
            },
        }
    }
}

/// Failure of task creation, local checks first.
#[derive(Debug, Clone, Error)]
pub enum CreateError {
    /// One or more fields failed validation with `Severity::Error`.
    /// Carries every field result so the UI can render all of them.
    #[error("validation failed for {} field(s)", .0.iter().filter(|v| v.is_blocking()).count())]
    Invalid(Vec<FieldValidation>),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
