//! In-memory task table.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;

use super::{FailureHistory, FailureRecord, RetryPolicy, TaskRecord, deadline_after};
use crate::domain::{
    AttemptId, AttemptOutcome, Disposition, Priority, TaskDescriptor, TaskId, TaskKind,
};
use crate::ports::TaskAction;

/// Eligible task in dispatch order.
///
/// Ordering: higher priority first, then earlier `next_execution`, then
/// earlier registration.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    priority: Priority,
    next_execution: Instant,
    generation: u64,
    task_id: TaskId,
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        (Reverse(self.priority), self.next_execution, self.generation).cmp(&(
            Reverse(other.priority),
            other.next_execution,
            other.generation,
        ))
    }
}

/// Everything a launched attempt needs once the table lock is released.
#[derive(Clone)]
pub struct AttemptTicket {
    pub task_id: TaskId,
    pub attempt_id: AttemptId,
    pub generation: u64,
    pub kind: TaskKind,
    pub priority: Priority,
    /// 1-based.
    pub attempt: u32,
    pub action: Arc<dyn TaskAction>,
}

/// How `finish_attempt` disposed of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The running slot no longer belonged to this attempt (removed, cleared,
    /// or the id was re-registered). Nothing was touched.
    Abandoned,
    Completed,
    RetryScheduled { retry_count: u32, next_execution: Instant },
    Dropped,
}

/// Registered tasks plus the set of in-flight attempts.
///
/// Invariants:
/// - every id in `running` has a record in `records`.
/// - an id is launched only if it is in neither `running` nor `abandoned`,
///   so a task id never executes concurrently with itself.
pub struct TaskTable {
    records: HashMap<TaskId, TaskRecord>,

    /// In-flight attempts: id -> generation of the record that was launched.
    running: HashMap<TaskId, u64>,

    /// Attempts still in flight whose task was removed or cleared. They hold
    /// no slot and are not counted, but block the id until they settle.
    abandoned: HashMap<TaskId, u64>,

    next_generation: u64,

    history: FailureHistory,
}

impl TaskTable {
    pub fn new(history_limit: usize) -> Self {
        Self {
            records: HashMap::new(),
            running: HashMap::new(),
            abandoned: HashMap::new(),
            next_generation: 1,
            history: FailureHistory::new(history_limit),
        }
    }

    /// Register or replace a task. Returns true if an existing definition was replaced.
    pub fn insert(&mut self, descriptor: TaskDescriptor, now: Instant) -> bool {
        let generation = self.next_generation;
        self.next_generation += 1;
        let record = TaskRecord::new(descriptor, generation, now);
        self.records.insert(record.id.clone(), record).is_some()
    }

    /// Drop a task and release its running slot. The in-flight attempt, if
    /// any, keeps running but its settlement becomes a no-op.
    pub fn remove(&mut self, task_id: &TaskId) -> bool {
        if let Some(generation) = self.running.remove(task_id) {
            self.abandoned.insert(task_id.clone(), generation);
        }
        self.records.remove(task_id).is_some()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.abandoned.extend(self.running.drain());
        self.history.clear();
    }

    pub fn task_count(&self) -> usize {
        self.records.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_running(&self, task_id: &TaskId) -> bool {
        self.running.contains_key(task_id)
    }

    /// An attempt for this id is in flight, counted or abandoned.
    fn is_busy(&self, task_id: &TaskId) -> bool {
        self.running.contains_key(task_id) || self.abandoned.contains_key(task_id)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&TaskRecord> {
        self.records.get(task_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.values()
    }

    pub fn history(&self) -> &FailureHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut FailureHistory {
        &mut self.history
    }

    /// Free slots under `max_concurrent`.
    pub fn free_slots(&self, max_concurrent: usize) -> usize {
        max_concurrent.saturating_sub(self.running.len())
    }

    /// Due, idle tasks in dispatch order.
    pub fn candidates(&self, now: Instant) -> Vec<TaskId> {
        let mut candidates: Vec<Candidate> = self
            .records
            .values()
            .filter(|r| r.is_due(now) && !self.is_busy(&r.id))
            .map(|r| Candidate {
                priority: r.priority,
                next_execution: r.next_execution,
                generation: r.generation,
                task_id: r.id.clone(),
            })
            .collect();
        candidates.sort();
        candidates.into_iter().map(|c| c.task_id).collect()
    }

    /// Earliest future `next_execution` among idle tasks, for the dispatcher's timer.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        self.records
            .values()
            .filter(|r| !r.is_due(now) && !self.is_busy(&r.id))
            .map(|r| r.next_execution)
            .min()
    }

    /// Mark a task running if it is still registered, idle and due.
    ///
    /// Callers may have awaited since computing candidates, so every
    /// precondition is checked again here.
    pub fn begin_attempt(&mut self, task_id: &TaskId, now: Instant) -> Option<AttemptTicket> {
        if self.is_busy(task_id) {
            return None;
        }
        let record = self.records.get_mut(task_id)?;
        if !record.is_due(now) {
            return None;
        }
        record.start_attempt(now);
        self.running.insert(task_id.clone(), record.generation);

        Some(AttemptTicket {
            task_id: task_id.clone(),
            attempt_id: AttemptId::generate(),
            generation: record.generation,
            kind: record.kind,
            priority: record.priority,
            attempt: record.retry_count + 1,
            action: Arc::clone(&record.action),
        })
    }

    /// Apply an attempt's outcome.
    ///
    /// - success: the record is removed.
    /// - failure with retries left: `retry_count` increments and the task waits
    ///   `policy.next_delay(retry_count)`.
    /// - failure without retries left: the record is removed.
    pub fn finish_attempt(
        &mut self,
        ticket: &AttemptTicket,
        outcome: AttemptOutcome,
        policy: RetryPolicy,
        now: Instant,
    ) -> Settlement {
        if self.abandoned.get(&ticket.task_id) == Some(&ticket.generation) {
            self.abandoned.remove(&ticket.task_id);
            return Settlement::Abandoned;
        }
        match self.running.get(&ticket.task_id) {
            Some(generation) if *generation == ticket.generation => {
                self.running.remove(&ticket.task_id);
            }
            _ => return Settlement::Abandoned,
        }

        // Re-registered while in flight: the new definition stays untouched.
        let Some(record) = self
            .records
            .get_mut(&ticket.task_id)
            .filter(|r| r.generation == ticket.generation)
        else {
            return Settlement::Abandoned;
        };

        let reason = match outcome {
            AttemptOutcome::Succeeded => {
                self.records.remove(&ticket.task_id);
                return Settlement::Completed;
            }
            AttemptOutcome::Failed(reason) => reason,
        };

        let (settlement, disposition) = if record.can_retry() {
            let delay = policy.next_delay(record.retry_count + 1);
            record.schedule_retry(deadline_after(now, delay));
            (
                Settlement::RetryScheduled {
                    retry_count: record.retry_count,
                    next_execution: record.next_execution,
                },
                Disposition::RetryScheduled { delay },
            )
        } else {
            self.records.remove(&ticket.task_id);
            (Settlement::Dropped, Disposition::Dropped)
        };

        self.history.push(FailureRecord {
            task_id: ticket.task_id.clone(),
            attempt_id: ticket.attempt_id,
            kind: ticket.kind,
            priority: ticket.priority,
            attempt: ticket.attempt,
            reason,
            disposition,
            recorded_at: Utc::now(),
        });

        settlement
    }

    /// Push every low/normal task out to `until`. Returns how many were deferred.
    pub fn defer_deferrable(&mut self, until: Instant) -> usize {
        let mut deferred = 0;
        for record in self.records.values_mut() {
            if record.priority.deferrable() {
                record.defer_until(until);
                deferred += 1;
            }
        }
        deferred
    }
}
