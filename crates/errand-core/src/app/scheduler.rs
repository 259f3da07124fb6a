//! Scheduler - public handle over the task table.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::{ConfigPatch, SchedulerConfig};
use super::dispatch_loop::dispatch_loop;
use super::lifecycle_loop::lifecycle_loop;
use super::status::{TaskStats, TaskView};
use crate::domain::{ErrandError, TaskDescriptor, TaskId};
use crate::ports::AppState;
use crate::queue::{FailureRecord, TaskTable, deadline_after};

/// State behind the scheduler lock.
///
/// The lock is only held for synchronous bookkeeping; no action is ever
/// awaited while holding it.
pub(crate) struct SchedulerState {
    pub(crate) table: TaskTable,
    pub(crate) config: SchedulerConfig,
    pub(crate) app_state: AppState,
    pub(crate) closed: bool,
}

pub(crate) struct Inner {
    pub(crate) state: Mutex<SchedulerState>,

    /// Wakes the dispatcher. `notify_one` stores a permit, so a trigger that
    /// lands mid-pass causes exactly one follow-up pass.
    pub(crate) wake: Notify,

    shutdown_tx: watch::Sender<bool>,
}

impl Inner {
    /// React to a foreground/background signal.
    ///
    /// - active -> background: low/normal tasks wait `retry_delay` from now.
    /// - background -> active: run a pass right away.
    pub(crate) async fn apply_app_state(&self, next: AppState) {
        let mut state = self.state.lock().await;
        let prev = std::mem::replace(&mut state.app_state, next);
        match (prev, next) {
            (AppState::Active, AppState::Background) => {
                let until = deadline_after(Instant::now(), state.config.retry_delay());
                let deferred = state.table.defer_deferrable(until);
                info!(deferred, "app moved to background, low/normal tasks deferred");
            }
            (AppState::Background, AppState::Active) => {
                drop(state);
                info!("app returned to foreground");
                self.wake.notify_one();
            }
            _ => {}
        }
    }
}

/// Background task scheduler.
///
/// Cheap to clone; every clone drives the same scheduler. Build one per
/// application with [`SchedulerBuilder`](super::SchedulerBuilder) and call
/// [`cleanup`](Self::cleanup) at teardown.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
    loops: Arc<Mutex<Option<Vec<JoinHandle<()>>>>>,
}

impl Scheduler {
    /// Spawn the dispatcher (and the lifecycle observer when a subscription
    /// is given). Must be called from within a tokio runtime.
    pub(crate) fn start(
        config: SchedulerConfig,
        lifecycle: Option<watch::Receiver<AppState>>,
    ) -> Self {
        let app_state = lifecycle
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or_default();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(Inner {
            state: Mutex::new(SchedulerState {
                table: TaskTable::new(config.failure_history_limit),
                config,
                app_state,
                closed: false,
            }),
            wake: Notify::new(),
            shutdown_tx,
        });

        let mut loops = vec![tokio::spawn(dispatch_loop(
            Arc::clone(&inner),
            shutdown_rx.clone(),
        ))];
        if let Some(rx) = lifecycle {
            loops.push(tokio::spawn(lifecycle_loop(
                Arc::clone(&inner),
                rx,
                shutdown_rx,
            )));
        }
        info!(?app_state, "scheduler started");

        Self {
            inner,
            loops: Arc::new(Mutex::new(Some(loops))),
        }
    }

    /// Register a task, silently replacing any pending task with the same id.
    ///
    /// The task is due immediately; the dispatcher picks it up on its next
    /// pass. Fails only after `cleanup()`.
    pub async fn add_task(&self, descriptor: TaskDescriptor) -> Result<(), ErrandError> {
        let id = descriptor.id.clone();
        let kind = descriptor.kind;
        let priority = descriptor.priority;

        let replaced = {
            let mut state = self.inner.state.lock().await;
            if state.closed {
                return Err(ErrandError::Closed);
            }
            state.table.insert(descriptor, Instant::now())
        };
        debug!(task_id = %id, %kind, %priority, replaced, "task registered");

        self.inner.wake.notify_one();
        Ok(())
    }

    /// Forget a task. Unknown ids are ignored.
    ///
    /// An attempt already in flight keeps running; when it settles nothing is
    /// rescheduled. Returns whether a task was removed.
    pub async fn remove_task(&self, task_id: &TaskId) -> bool {
        let removed = self.inner.state.lock().await.table.remove(task_id);
        if removed {
            debug!(task_id = %task_id, "task removed");
        }
        removed
    }

    /// Merge `patch` into the current config. Invalid values are rejected and
    /// the config is left unchanged.
    pub async fn configure(&self, patch: ConfigPatch) -> Result<(), ErrandError> {
        {
            let mut state = self.inner.state.lock().await;
            let next = state.config.merged(&patch)?;
            state
                .table
                .history_mut()
                .set_limit(next.failure_history_limit);
            info!(config = ?next, "scheduler reconfigured");
            state.config = next;
        }
        self.inner.wake.notify_one();
        Ok(())
    }

    pub async fn config(&self) -> SchedulerConfig {
        self.inner.state.lock().await.config.clone()
    }

    pub async fn task_stats(&self) -> TaskStats {
        let state = self.inner.state.lock().await;
        TaskStats::collect(&state.table, state.app_state)
    }

    pub async fn task(&self, task_id: &TaskId) -> Option<TaskView> {
        let state = self.inner.state.lock().await;
        state
            .table
            .get(task_id)
            .map(|record| TaskView::from_record(record, state.table.is_running(task_id)))
    }

    /// Recent failed attempts, oldest first.
    pub async fn recent_failures(&self) -> Vec<FailureRecord> {
        self.inner.state.lock().await.table.history().snapshot()
    }

    pub async fn app_state(&self) -> AppState {
        self.inner.state.lock().await.app_state
    }

    /// Drop every task. In-flight attempts are abandoned, not cancelled.
    pub async fn clear_all_tasks(&self) {
        let mut state = self.inner.state.lock().await;
        let cleared = state.table.task_count();
        state.table.clear();
        info!(cleared, "all tasks cleared");
    }

    /// Stop the dispatcher and the lifecycle observer, then drop every task.
    ///
    /// Later calls are no-ops; `add_task` fails afterwards.
    pub async fn cleanup(&self) {
        let Some(loops) = self.loops.lock().await.take() else {
            return;
        };

        {
            let mut state = self.inner.state.lock().await;
            state.closed = true;
            state.table.clear();
        }

        // ignore send error: loops may already be gone
        let _ = self.inner.shutdown_tx.send(true);
        let panicked = join_loops(loops).await;
        info!(panicked, "scheduler shut down");
    }
}

/// Await every loop, logging the ones that panicked. Returns how many did.
async fn join_loops(loops: Vec<JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for handle in loops {
        match handle.await {
            Ok(()) => {}
            Err(err) if err.is_panic() => {
                warn!(error = %err, "scheduler loop panicked");
                panicked += 1;
            }
            Err(err) => debug!(error = %err, "scheduler loop cancelled"),
        }
    }
    panicked
}

/// Resolves once shutdown has been requested (or the sender is gone).
pub(crate) async fn stopped(shutdown_rx: &mut watch::Receiver<bool>) {
    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
