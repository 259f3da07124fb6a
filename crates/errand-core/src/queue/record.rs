//! Task record: descriptor + scheduling bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{Priority, TaskDescriptor, TaskId, TaskKind};
use crate::ports::TaskAction;

/// Bookkeeping for one registered task.
///
/// - The only place `retry_count`, `last_executed` and `next_execution` change.
/// - `generation` identifies this registration. Re-adding the same id creates a
///   new record with a fresh generation, which is how a settling attempt tells
///   whether the record it started from is still the current one.
#[derive(Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: Priority,
    pub action: Arc<dyn TaskAction>,

    /// Failed attempts so far.
    pub retry_count: u32,

    /// Ceiling on `retry_count`; the task is dropped once a failure would exceed it.
    pub max_retries: u32,

    /// Start of the most recent attempt.
    pub last_executed: Option<Instant>,

    /// Not eligible before this instant.
    pub next_execution: Instant,

    pub generation: u64,
}

impl TaskRecord {
    pub fn new(descriptor: TaskDescriptor, generation: u64, now: Instant) -> Self {
        Self {
            id: descriptor.id,
            kind: descriptor.kind,
            priority: descriptor.priority,
            action: descriptor.action,
            retry_count: 0,
            max_retries: descriptor.max_retries,
            last_executed: None,
            next_execution: now,
            generation,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_execution <= now
    }

    /// Record the start of an attempt.
    pub fn start_attempt(&mut self, now: Instant) {
        self.last_executed = Some(now);
    }

    /// Is another attempt allowed after a failure?
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Count the failure and push the next eligible time out.
    pub fn schedule_retry(&mut self, next_execution: Instant) {
        self.retry_count += 1;
        self.next_execution = next_execution;
    }

    /// Push eligibility out without counting a failure.
    pub fn defer_until(&mut self, at: Instant) {
        self.next_execution = at;
    }
}

/// Stand-in for "never" when a delay does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, clamped instead of overflowing.
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl std::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("last_executed", &self.last_executed)
            .field("next_execution", &self.next_execution)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::action_fn;

    fn record(max_retries: u32) -> TaskRecord {
        let descriptor = TaskDescriptor::new(
            TaskId::new("sync").unwrap(),
            TaskKind::Sync,
            action_fn(|| async { Ok(()) }),
        )
        .max_retries(max_retries);
        TaskRecord::new(descriptor, 1, Instant::now())
    }

    #[test]
    fn new_record_is_due_immediately() {
        let r = record(2);
        assert!(r.is_due(Instant::now()));
        assert_eq!(r.retry_count, 0);
        assert!(r.last_executed.is_none());
    }

    #[test]
    fn retry_ceiling() {
        let mut r = record(1);
        assert!(r.can_retry());
        r.schedule_retry(Instant::now() + Duration::from_secs(1));
        assert_eq!(r.retry_count, 1);
        assert!(!r.can_retry());
        assert!(!r.is_due(Instant::now()));
    }

    #[test]
    fn zero_retries_never_retries() {
        assert!(!record(0).can_retry());
    }

    #[test]
    fn deadline_clamps_huge_delays() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::from_secs(2)), now + Duration::from_secs(2));
        assert_eq!(deadline_after(now, Duration::MAX), now + FAR_FUTURE);
    }
}
