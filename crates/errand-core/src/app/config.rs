//! Scheduler configuration and partial updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ErrandError;
use crate::queue::RetryPolicy;

/// Tunables read at the start of every scheduling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on in-flight attempts.
    pub max_concurrent_tasks: usize,

    /// Per-attempt timeout; expiry counts as a failure.
    pub task_timeout_ms: u64,

    /// Base delay for linear retry backoff, and the deferral applied to
    /// low/normal tasks when the app goes to the background.
    pub retry_delay_ms: u64,

    pub batching_enabled: bool,

    /// Tasks launched together when batching kicks in.
    pub batch_size: usize,

    /// Pause between consecutive batches.
    pub batch_timeout_ms: u64,

    /// Capacity of the failure history ring buffer.
    pub failure_history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            task_timeout_ms: 30_000,
            retry_delay_ms: 5_000,
            batching_enabled: true,
            batch_size: 5,
            batch_timeout_ms: 1_000,
            failure_history_limit: 50,
        }
    }
}

impl SchedulerConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.retry_delay())
    }

    /// Reject values that would stall or break scheduling.
    pub fn validate(&self) -> Result<(), ErrandError> {
        if self.max_concurrent_tasks == 0 {
            return Err(ErrandError::InvalidConfig {
                field: "max_concurrent_tasks",
                reason: "must be at least 1",
            });
        }
        if self.batch_size == 0 {
            return Err(ErrandError::InvalidConfig {
                field: "batch_size",
                reason: "must be at least 1",
            });
        }
        if self.task_timeout_ms == 0 {
            return Err(ErrandError::InvalidConfig {
                field: "task_timeout_ms",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Merge `patch` into a copy of this config and validate the result.
    /// `self` is left untouched on error.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self, ErrandError> {
        let mut next = self.clone();
        if let Some(v) = patch.max_concurrent_tasks {
            next.max_concurrent_tasks = v;
        }
        if let Some(v) = patch.task_timeout_ms {
            next.task_timeout_ms = v;
        }
        if let Some(v) = patch.retry_delay_ms {
            next.retry_delay_ms = v;
        }
        if let Some(v) = patch.batching_enabled {
            next.batching_enabled = v;
        }
        if let Some(v) = patch.batch_size {
            next.batch_size = v;
        }
        if let Some(v) = patch.batch_timeout_ms {
            next.batch_timeout_ms = v;
        }
        if let Some(v) = patch.failure_history_limit {
            next.failure_history_limit = v;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial config update; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub max_concurrent_tasks: Option<usize>,
    pub task_timeout_ms: Option<u64>,
    pub retry_delay_ms: Option<u64>,
    pub batching_enabled: Option<bool>,
    pub batch_size: Option<usize>,
    pub batch_timeout_ms: Option<u64>,
    pub failure_history_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_are_valid() {
        SchedulerConfig::default().validate().unwrap();
    }

    #[test]
    fn merge_only_touches_given_fields() {
        let base = SchedulerConfig::default();
        let patch = ConfigPatch {
            max_concurrent_tasks: Some(1),
            batching_enabled: Some(false),
            ..ConfigPatch::default()
        };
        let merged = base.merged(&patch).unwrap();
        assert_eq!(merged.max_concurrent_tasks, 1);
        assert!(!merged.batching_enabled);
        assert_eq!(merged.retry_delay_ms, base.retry_delay_ms);
        assert_eq!(merged.batch_size, base.batch_size);
    }

    #[rstest]
    #[case::no_slots(ConfigPatch { max_concurrent_tasks: Some(0), ..ConfigPatch::default() }, "max_concurrent_tasks")]
    #[case::empty_batch(ConfigPatch { batch_size: Some(0), ..ConfigPatch::default() }, "batch_size")]
    #[case::zero_timeout(ConfigPatch { task_timeout_ms: Some(0), ..ConfigPatch::default() }, "task_timeout_ms")]
    fn invalid_patches_are_rejected(#[case] patch: ConfigPatch, #[case] expected_field: &str) {
        let err = SchedulerConfig::default().merged(&patch).unwrap_err();
        match err {
            ErrandError::InvalidConfig { field, .. } => assert_eq!(field, expected_field),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_delays_are_allowed() {
        let patch = ConfigPatch {
            retry_delay_ms: Some(0),
            batch_timeout_ms: Some(0),
            failure_history_limit: Some(0),
            ..ConfigPatch::default()
        };
        assert!(SchedulerConfig::default().merged(&patch).is_ok());
    }

    #[test]
    fn patch_from_json() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{"max_concurrent_tasks": 2, "retry_delay_ms": 250}"#).unwrap();
        assert_eq!(patch.max_concurrent_tasks, Some(2));
        assert_eq!(patch.retry_delay_ms, Some(250));
        assert_eq!(patch.batch_size, None);

        assert!(serde_json::from_str::<ConfigPatch>(r#"{"max_tasks": 2}"#).is_err());
    }

    #[test]
    fn retry_policy_uses_retry_delay() {
        let config = SchedulerConfig {
            retry_delay_ms: 200,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.retry_policy().next_delay(3), Duration::from_millis(600));
    }
}
