//! DispatchLoop - scheduling passes and attempt execution.
//!
//! # Flow
//! 1. wait for a trigger: `Inner::wake`, the earliest retry/deferral coming
//!    due, or shutdown
//! 2. run one pass: pick due idle tasks in priority order, launch them
//!    individually or in batches
//! 3. each attempt settles on its own, updates the table and wakes the loop
//!
//! A single loop runs all passes, so passes never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{Instrument, debug, info_span, warn};

use super::scheduler::{Inner, stopped};
use crate::domain::{AttemptOutcome, FailureReason, TaskId};
use crate::queue::{AttemptTicket, Settlement};

enum PassEnd {
    /// Pass finished; sleep until woken or until this instant.
    Idle(Option<Instant>),
    Shutdown,
}

pub(crate) async fn dispatch_loop(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    debug!("dispatcher started");
    loop {
        let next_wakeup = match run_pass(&inner, &mut shutdown_rx).await {
            PassEnd::Idle(next_wakeup) => next_wakeup,
            PassEnd::Shutdown => break,
        };

        let timer = async move {
            match next_wakeup {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = stopped(&mut shutdown_rx) => break,
            _ = inner.wake.notified() => {}
            _ = timer => {}
        }
    }
    debug!("dispatcher stopped");
}

async fn run_pass(inner: &Arc<Inner>, shutdown_rx: &mut watch::Receiver<bool>) -> PassEnd {
    let (candidates, config) = {
        let state = inner.state.lock().await;
        if state.closed {
            return PassEnd::Shutdown;
        }
        (state.table.candidates(Instant::now()), state.config.clone())
    };

    if config.batching_enabled && candidates.len() > config.batch_size {
        let batches: Vec<&[TaskId]> = candidates.chunks(config.batch_size).collect();
        let last = batches.len() - 1;

        for (index, batch) in batches.into_iter().enumerate() {
            let tickets = begin_attempts(inner, batch, config.max_concurrent_tasks).await;
            if tickets.is_empty() {
                break;
            }
            debug!(batch = index, size = tickets.len(), "launching batch");

            let mut attempts = JoinSet::new();
            for ticket in tickets {
                attempts.spawn(run_attempt(Arc::clone(inner), ticket, config.task_timeout()));
            }
            let settled = async { while attempts.join_next().await.is_some() {} };
            tokio::select! {
                _ = stopped(shutdown_rx) => return PassEnd::Shutdown,
                _ = settled => {}
            }

            if index < last {
                tokio::select! {
                    _ = stopped(shutdown_rx) => return PassEnd::Shutdown,
                    _ = sleep(config.batch_timeout()) => {}
                }
            }
        }
    } else if !candidates.is_empty() {
        let tickets = begin_attempts(inner, &candidates, config.max_concurrent_tasks).await;
        for ticket in tickets {
            tokio::spawn(run_attempt(Arc::clone(inner), ticket, config.task_timeout()));
        }
    }

    let state = inner.state.lock().await;
    PassEnd::Idle(state.table.next_wakeup(Instant::now()))
}

/// Mark as many of `ids` running as free slots allow.
async fn begin_attempts(
    inner: &Inner,
    ids: &[TaskId],
    max_concurrent: usize,
) -> Vec<AttemptTicket> {
    let mut state = inner.state.lock().await;
    if state.closed {
        return Vec::new();
    }
    let now = Instant::now();
    let mut tickets = Vec::new();
    for id in ids {
        if state.table.free_slots(max_concurrent) == 0 {
            break;
        }
        if let Some(ticket) = state.table.begin_attempt(id, now) {
            tickets.push(ticket);
        }
    }
    tickets
}

/// Run one attempt to settlement.
///
/// The action runs as its own task so that a timeout abandons it instead of
/// cancelling it, and a panic surfaces as a `JoinError`.
async fn run_attempt(inner: Arc<Inner>, ticket: AttemptTicket, timeout: Duration) {
    let span = info_span!(
        "attempt",
        task_id = %ticket.task_id,
        attempt_id = %ticket.attempt_id,
        attempt = ticket.attempt,
    );

    async move {
        debug!(kind = %ticket.kind, priority = %ticket.priority, "attempt started");

        let action = Arc::clone(&ticket.action);
        let handle = tokio::spawn(async move { action.run().await });
        let outcome = match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(()))) => AttemptOutcome::Succeeded,
            Ok(Ok(Err(err))) => AttemptOutcome::Failed(FailureReason::Error(err.to_string())),
            Ok(Err(join_err)) if join_err.is_panic() => {
                AttemptOutcome::Failed(FailureReason::Panicked)
            }
            Ok(Err(join_err)) => AttemptOutcome::Failed(FailureReason::Error(join_err.to_string())),
            Err(_elapsed) => AttemptOutcome::Failed(FailureReason::TimedOut(timeout)),
        };

        let settlement = {
            let mut state = inner.state.lock().await;
            let policy = state.config.retry_policy();
            state
                .table
                .finish_attempt(&ticket, outcome.clone(), policy, Instant::now())
        };

        match (settlement, &outcome) {
            (Settlement::Completed, _) => debug!("task completed"),
            (Settlement::Abandoned, _) => debug!(?outcome, "attempt settled after task was removed or replaced"),
            (Settlement::RetryScheduled { retry_count, next_execution }, AttemptOutcome::Failed(reason)) => {
                let delay = next_execution.saturating_duration_since(Instant::now());
                warn!(
                    %reason,
                    retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retry scheduled"
                );
            }
            (Settlement::Dropped, AttemptOutcome::Failed(reason)) => {
                warn!(%reason, "attempt failed, retries exhausted, task dropped");
            }
            (settlement, outcome) => debug!(?settlement, ?outcome, "attempt settled"),
        }

        inner.wake.notify_one();
    }
    .instrument(span)
    .await
}
