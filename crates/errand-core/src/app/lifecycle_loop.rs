//! LifecycleLoop - observes foreground/background transitions.
//!
//! Owns the subscription for the scheduler's whole life; the receiver is
//! dropped (unsubscribed) when the loop exits on `cleanup()`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::scheduler::{Inner, stopped};
use crate::ports::AppState;

pub(crate) async fn lifecycle_loop(
    inner: Arc<Inner>,
    mut app_rx: watch::Receiver<AppState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stopped(&mut shutdown_rx) => break,
            changed = app_rx.changed() => {
                if changed.is_err() {
                    debug!("lifecycle source dropped, observer stopped");
                    break;
                }
                let next = *app_rx.borrow_and_update();
                debug!(?next, "app state signal");
                inner.apply_app_state(next).await;
            }
        }
    }
}
