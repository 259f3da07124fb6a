//! FnAction - closure-backed `TaskAction`.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ActionError;
use crate::ports::TaskAction;

/// Adapts a closure returning a future into a `TaskAction`.
///
/// The closure is called once per attempt, so every retry gets a fresh future.
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    async fn run(&self) -> Result<(), ActionError> {
        (self.f)().await
    }
}

/// Shorthand for `Arc::new(FnAction::new(f))`.
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn TaskAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    Arc::new(FnAction::new(f))
}
