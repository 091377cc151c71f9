//! Error taxonomy for the Switchyard engine.
//!
//! Uses `thiserror` for ergonomic error definitions. Every operation in the
//! workspace surfaces one of these variants:
//!
//! - `Validation` and `NotFound` are fatal to the operation that raised them.
//! - `AmbiguousRequest` and `Conflict` are recoverable by a policy outside
//!   the engine (clarification, default fallback, manual adjudication).
//! - `ContractUnsatisfied` is normally reported as a steady-state condition;
//!   the variant exists for callers that need a decided collaboration.
//! - `StaleTransition` is retryable after re-reading the task state.

use thiserror::Error;

/// The top-level error type for all Switchyard operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A profile (or profile document) failed schema validation.
    #[error("Validation error in '{subject}': {reason}")]
    Validation { subject: String, reason: String },

    /// An unknown profile or task identifier.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// No profile matched the request with enough confidence.
    #[error(
        "Ambiguous request: best confidence {best_confidence:.3} \
         is below the minimum {min_confidence:.3}"
    )]
    AmbiguousRequest {
        best_confidence: f64,
        min_confidence: f64,
        best_profile: Option<String>,
    },

    /// Preference resolution could not produce a strict winner.
    #[error("Conflict in category '{category}' between {}", candidates.join(", "))]
    Conflict {
        category: String,
        candidates: Vec<String>,
    },

    /// Collaboration requirements are not matched by any participant.
    #[error("Contract unsatisfied for task {task_id}: missing {}", missing.join(", "))]
    ContractUnsatisfied { task_id: String, missing: Vec<String> },

    /// A handoff transition raced another one, or was based on an old version.
    #[error("Stale transition on task {task_id}: expected version {expected}, current {actual}")]
    StaleTransition {
        task_id: String,
        expected: u64,
        actual: u64,
    },

    /// Serialization of a domain entity failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// What kind of entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Profile,
    Task,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Profile => f.write_str("Profile"),
            EntityKind::Task => f.write_str("Task"),
        }
    }
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub fn profile_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Profile,
            id: id.into(),
        }
    }

    pub fn task_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Task,
            id: id.into(),
        }
    }

    /// Short machine-readable name of the variant, used by the HTTP surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::NotFound { .. } => "not_found",
            Error::AmbiguousRequest { .. } => "ambiguous_request",
            Error::Conflict { .. } => "conflict",
            Error::ContractUnsatisfied { .. } => "contract_unsatisfied",
            Error::StaleTransition { .. } => "stale_transition",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the caller may retry the same operation after re-reading state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StaleTransition { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
