//! Error types.
//!
//! - `ErrandError`: returned by scheduler operations to the caller.
//! - `ActionError`: returned by a task action. Never crosses back to the
//!   caller of `add_task`; the scheduler only logs it and feeds retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErrandError {
    #[error("task id must not be empty")]
    EmptyTaskId,

    #[error("invalid config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    #[error("scheduler has been shut down")]
    Closed,
}

/// Failure reported by a task action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_names_the_field() {
        let err = ErrandError::InvalidConfig {
            field: "batch_size",
            reason: "must be at least 1",
        };
        assert_eq!(err.to_string(), "invalid config: batch_size must be at least 1");
    }

    #[test]
    fn action_error_from_str() {
        let err: ActionError = "network down".into();
        assert_eq!(err.message(), "network down");
        assert_eq!(err.to_string(), "network down");
    }
}
