//! Domain identifiers.
//!
//! Two kinds of id live here:
//! - [`TaskId`]: caller-chosen string key. Registering the same id twice
//!   replaces the pending definition, so the value itself is the identity.
//! - [`AttemptId`]: ULID minted by the scheduler for every execution attempt.
//!   It is only used to correlate log lines and failure history entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::errors::ErrandError;

/// Caller-supplied task identifier (non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Build a task id, rejecting empty or all-whitespace values.
    pub fn new(value: impl Into<String>) -> Result<Self, ErrandError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ErrandError::EmptyTaskId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TaskId {
    type Error = ErrandError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Identifier of one execution attempt of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AttemptId(Ulid);

impl AttemptId {
    /// Mint a fresh id from the current time.
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_rejects_blank_values() {
        assert!(matches!(TaskId::new(""), Err(ErrandError::EmptyTaskId)));
        assert!(matches!(TaskId::new("   "), Err(ErrandError::EmptyTaskId)));
        assert_eq!(TaskId::new("sync-habits").unwrap().as_str(), "sync-habits");
    }

    #[test]
    fn task_id_deserialization_validates() {
        let ok: TaskId = serde_json::from_str("\"flush\"").unwrap();
        assert_eq!(ok.to_string(), "flush");

        let err = serde_json::from_str::<TaskId>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn attempt_ids_are_unique_and_prefixed() {
        let a = AttemptId::generate();
        let b = AttemptId::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("attempt-"));
    }

    #[test]
    fn attempt_id_serializes_as_bare_ulid() {
        let id = AttemptId::generate();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json.as_str().map(str::len), Some(26));
    }
}
