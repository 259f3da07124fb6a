//! Lifecycle port - host foreground/background signal.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Foreground state of the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    #[default]
    Active,
    Background,
}

/// Source of app-state changes.
///
/// `subscribe` hands out a receiver holding the current state; dropping the
/// receiver is the unsubscribe. The scheduler subscribes once when it is
/// built and drops the receiver in `cleanup()`.
pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<AppState>;
}
