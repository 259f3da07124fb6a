//! ManualLifecycle - watch-channel backed `LifecycleSource`.
//!
//! Hosts (and tests) push state changes with `set_state`; every subscriber
//! sees the latest value.

use tokio::sync::watch;

use crate::ports::{AppState, LifecycleSource};

pub struct ManualLifecycle {
    tx: watch::Sender<AppState>,
}

impl ManualLifecycle {
    pub fn new(initial: AppState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a new state. Repeating the current state is not a transition
    /// and does not wake subscribers.
    pub fn set_state(&self, state: AppState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub fn state(&self) -> AppState {
        *self.tx.borrow()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ManualLifecycle {
    fn default() -> Self {
        Self::new(AppState::Active)
    }
}

impl LifecycleSource for ManualLifecycle {
    fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let lifecycle = ManualLifecycle::default();
        let mut rx = lifecycle.subscribe();
        assert_eq!(*rx.borrow(), AppState::Active);

        lifecycle.set_state(AppState::Background);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), AppState::Background);
        assert_eq!(lifecycle.state(), AppState::Background);
    }

    #[test]
    fn repeated_state_is_not_a_change() {
        let lifecycle = ManualLifecycle::default();
        let rx = lifecycle.subscribe();
        lifecycle.set_state(AppState::Active);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn dropping_receiver_unsubscribes() {
        let lifecycle = ManualLifecycle::default();
        let rx = lifecycle.subscribe();
        assert_eq!(lifecycle.subscriber_count(), 1);
        drop(rx);
        assert_eq!(lifecycle.subscriber_count(), 0);
    }
}
