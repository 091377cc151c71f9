//! Task requests: what callers submit to be routed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A task submitted for classification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    description: String,

    /// Explicit domain-tag or profile-id overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hints: Vec<String>,

    /// The earlier task this one reworks, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supersedes: Option<TaskId>,
}

impl TaskRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            hints: Vec::new(),
            supersedes: None,
        }
    }

    /// Add an explicit domain-tag hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.extend(hints.into_iter().map(Into::into));
        self
    }

    /// Mark this request as rework of a prior task.
    pub fn superseding(mut self, prior: TaskId) -> Self {
        self.supersedes = Some(prior);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn supersedes(&self) -> Option<&TaskId> {
        self.supersedes.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn builder_collects_hints() {
        let req = TaskRequest::new("build the login page")
            .with_hint("ui")
            .with_hints(["browser", "component"]);
        assert_eq!(req.description(), "build the login page");
        assert_eq!(req.hints(), &["ui", "browser", "component"]);
        assert!(req.supersedes().is_none());
    }

    #[test]
    fn request_serializes_without_empty_fields() {
        let req = TaskRequest::new("design the schema");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"description":"design the schema"}"#);

        let rework = req.superseding(TaskId::from("t-1"));
        let json = serde_json::to_string(&rework).unwrap();
        assert!(json.contains(r#""supersedes":"t-1""#));
    }
}
