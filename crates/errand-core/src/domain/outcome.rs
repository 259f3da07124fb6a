//! Outcome model: how a single attempt settled.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Result of one attempt as seen by the retry logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(FailureReason),
}

/// Why an attempt failed. All variants are handled identically by retry;
/// the distinction only matters for logs and failure history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The action returned an error.
    Error(String),

    /// The action did not settle within the task timeout.
    TimedOut(#[serde(with = "millis")] Duration),

    /// The action panicked.
    Panicked,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Error(msg) => write!(f, "error: {msg}"),
            FailureReason::TimedOut(after) => write!(f, "timed out after {}ms", after.as_millis()),
            FailureReason::Panicked => f.write_str("panicked"),
        }
    }
}

/// What the scheduler did with a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    RetryScheduled {
        #[serde(rename = "delay_ms", with = "millis")]
        delay: Duration,
    },
    Dropped,
}

pub(crate) mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_display() {
        assert_eq!(
            FailureReason::TimedOut(Duration::from_millis(50)).to_string(),
            "timed out after 50ms"
        );
        assert_eq!(FailureReason::Error("boom".into()).to_string(), "error: boom");
    }

    #[test]
    fn disposition_serializes_delay_in_millis() {
        let json = serde_json::to_value(Disposition::RetryScheduled {
            delay: Duration::from_secs(10),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "retry_scheduled", "delay_ms": 10000}));
    }
}
