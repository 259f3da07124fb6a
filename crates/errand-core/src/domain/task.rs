//! Task model: kinds, priorities and the descriptor callers hand to the scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::TaskId;
use crate::ports::TaskAction;

/// What a task is for. Metadata only; scheduling never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Sync,
    Cleanup,
    Analytics,
    Notification,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Sync,
        TaskKind::Cleanup,
        TaskKind::Analytics,
        TaskKind::Notification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Sync => "sync",
            TaskKind::Cleanup => "cleanup",
            TaskKind::Analytics => "analytics",
            TaskKind::Notification => "notification",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority. Declaration order is the total order: `Low < Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Low and normal work is deferred while the app is in the background.
    pub fn deferrable(self) -> bool {
        matches!(self, Priority::Low | Priority::Normal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default retry ceiling for descriptors that don't set one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What a caller hands to `Scheduler::add_task`.
///
/// ```ignore
/// let task = TaskDescriptor::new(id, TaskKind::Sync, action_fn(|| async { Ok(()) }))
///     .priority(Priority::High)
///     .max_retries(5);
/// ```
#[derive(Clone)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: Priority,
    pub action: Arc<dyn TaskAction>,
    pub max_retries: u32,
}

impl TaskDescriptor {
    pub fn new(id: TaskId, kind: TaskKind, action: Arc<dyn TaskAction>) -> Self {
        Self {
            id,
            kind,
            priority: Priority::default(),
            action,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::action_fn;

    #[test]
    fn priority_total_order() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn only_low_and_normal_are_deferrable() {
        assert!(Priority::Low.deferrable());
        assert!(Priority::Normal.deferrable());
        assert!(!Priority::High.deferrable());
        assert!(!Priority::Critical.deferrable());
    }

    #[test]
    fn descriptor_defaults() {
        let task = TaskDescriptor::new(
            TaskId::new("cleanup-cache").unwrap(),
            TaskKind::Cleanup,
            action_fn(|| async { Ok(()) }),
        );
        assert_eq!(task.priority, Priority::Normal);
        assert_eq!(task.max_retries, DEFAULT_MAX_RETRIES);

        let task = task.priority(Priority::Low).max_retries(0);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.max_retries, 0);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&TaskKind::Notification).unwrap();
        assert_eq!(json, "\"notification\"");
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
