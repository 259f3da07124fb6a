//! Failure history: bounded log of recent failed attempts.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AttemptId, Disposition, FailureReason, Priority, TaskId, TaskKind};

/// One failed attempt and what the scheduler did about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub task_id: TaskId,
    pub attempt_id: AttemptId,
    pub kind: TaskKind,
    pub priority: Priority,
    /// 1-based attempt number.
    pub attempt: u32,
    pub reason: FailureReason,
    pub disposition: Disposition,
    pub recorded_at: DateTime<Utc>,
}

/// Ring buffer of `FailureRecord`s; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct FailureHistory {
    limit: usize,
    entries: VecDeque<FailureRecord>,
}

impl FailureHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: VecDeque::with_capacity(limit.min(64)),
        }
    }

    pub fn push(&mut self, record: FailureRecord) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Change the capacity, dropping the oldest entries if it shrinks.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        while self.entries.len() > limit {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<FailureRecord> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(n: u32) -> FailureRecord {
        FailureRecord {
            task_id: TaskId::new(format!("t{n}")).unwrap(),
            attempt_id: AttemptId::generate(),
            kind: TaskKind::Analytics,
            priority: Priority::Low,
            attempt: n,
            reason: FailureReason::Error("offline".into()),
            disposition: Disposition::Dropped,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = FailureHistory::new(2);
        history.push(failure(1));
        history.push(failure(2));
        history.push(failure(3));

        let attempts: Vec<u32> = history.snapshot().iter().map(|f| f.attempt).collect();
        assert_eq!(attempts, vec![2, 3]);
    }

    #[test]
    fn shrinking_limit_trims() {
        let mut history = FailureHistory::new(5);
        for n in 1..=4 {
            history.push(failure(n));
        }
        history.set_limit(1);
        assert_eq!(history.snapshot().len(), 1);
        assert_eq!(history.snapshot()[0].attempt, 4);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut history = FailureHistory::new(0);
        history.push(failure(1));
        assert!(history.snapshot().is_empty());
    }
}
