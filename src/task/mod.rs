//! Task model: entities, validation predicates, complexity estimation
//! and batch dependency checks. Everything here is synchronous and free
//! of I/O; the store invokes these before touching the network.

pub mod dependency;
pub mod estimator;
pub mod model;
pub mod validation;

pub use dependency::{validate_batch, DependencyError};
pub use estimator::{estimate, ComplexityClass, ComplexityEstimate, DurationEstimate};
pub use model::{ModelTier, Task, TaskDraft, TaskMetadata, TaskStatus};
pub use validation::{
    has_blocking, validate_draft, validate_identifier, validate_prompt,
    validate_working_directory, FieldValidation, Severity,
};
