//! Status - read-only views of scheduler state.

use serde::Serialize;
use tokio::time::Instant;

use crate::domain::{Priority, TaskId, TaskKind};
use crate::ports::AppState;
use crate::queue::{TaskRecord, TaskTable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub normal: usize,
    pub high: usize,
    pub critical: usize,
}

impl PriorityCounts {
    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Low => self.low += 1,
            Priority::Normal => self.normal += 1,
            Priority::High => self.high += 1,
            Priority::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub sync: usize,
    pub cleanup: usize,
    pub analytics: usize,
    pub notification: usize,
}

impl KindCounts {
    fn bump(&mut self, kind: TaskKind) {
        match kind {
            TaskKind::Sync => self.sync += 1,
            TaskKind::Cleanup => self.cleanup += 1,
            TaskKind::Analytics => self.analytics += 1,
            TaskKind::Notification => self.notification += 1,
        }
    }
}

/// Snapshot returned by `Scheduler::task_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    /// Registered tasks, including the ones in flight.
    pub total: usize,
    pub running: usize,
    /// `total - running`.
    pub queued: usize,
    pub by_priority: PriorityCounts,
    pub by_kind: KindCounts,
    pub app_state: AppState,
}

impl TaskStats {
    pub(crate) fn collect(table: &TaskTable, app_state: AppState) -> Self {
        let mut by_priority = PriorityCounts::default();
        let mut by_kind = KindCounts::default();
        for record in table.records() {
            by_priority.bump(record.priority);
            by_kind.bump(record.kind);
        }
        let total = table.task_count();
        let running = table.running_count();
        Self {
            total,
            running,
            queued: total.saturating_sub(running),
            by_priority,
            by_kind,
            app_state,
        }
    }
}

/// Bookkeeping of a single registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: Priority,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_executed: Option<Instant>,
    pub next_execution: Instant,
    pub running: bool,
}

impl TaskView {
    pub(crate) fn from_record(record: &TaskRecord, running: bool) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            priority: record.priority,
            retry_count: record.retry_count,
            max_retries: record.max_retries,
            last_executed: record.last_executed,
            next_execution: record.next_execution,
            running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskDescriptor;
    use crate::impls::action_fn;

    #[test]
    fn stats_break_down_by_priority_and_kind() {
        let mut table = TaskTable::new(0);
        let now = Instant::now();
        for (name, kind, priority) in [
            ("a", TaskKind::Sync, Priority::Critical),
            ("b", TaskKind::Sync, Priority::Low),
            ("c", TaskKind::Notification, Priority::Low),
        ] {
            table.insert(
                TaskDescriptor::new(TaskId::new(name).unwrap(), kind, action_fn(|| async { Ok(()) }))
                    .priority(priority),
                now,
            );
        }
        table.begin_attempt(&TaskId::new("a").unwrap(), now);

        let stats = TaskStats::collect(&table, AppState::Active);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.by_priority.low, 2);
        assert_eq!(stats.by_priority.critical, 1);
        assert_eq!(stats.by_kind.sync, 2);
        assert_eq!(stats.by_kind.notification, 1);
    }
}
