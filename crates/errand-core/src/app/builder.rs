//! SchedulerBuilder - configuration and wiring.
//!
//! Validates the initial config before anything is spawned (fail fast).

use tokio::sync::watch;

use super::config::{ConfigPatch, SchedulerConfig};
use super::scheduler::Scheduler;
use crate::domain::ErrandError;
use crate::ports::{AppState, LifecycleSource};

/// Builds a [`Scheduler`].
///
/// ```ignore
/// let lifecycle = ManualLifecycle::default();
/// let scheduler = SchedulerBuilder::new()
///     .config(SchedulerConfig { max_concurrent_tasks: 2, ..Default::default() })
///     .lifecycle(&lifecycle)
///     .build()?;
/// ```
#[derive(Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    patch: Option<ConfigPatch>,
    lifecycle: Option<watch::Receiver<AppState>>,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole config.
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides applied on top of `config` at build time (e.g. loaded from a file).
    pub fn overrides(mut self, patch: ConfigPatch) -> Self {
        self.patch = Some(patch);
        self
    }

    /// Subscribe to app-state changes. Without a source the scheduler stays `Active`.
    pub fn lifecycle(mut self, source: &dyn LifecycleSource) -> Self {
        self.lifecycle = Some(source.subscribe());
        self
    }

    /// Validate the config and start the scheduler. Must run inside a tokio runtime.
    pub fn build(self) -> Result<Scheduler, ErrandError> {
        let config = match &self.patch {
            Some(patch) => self.config.merged(patch)?,
            None => {
                self.config.validate()?;
                self.config
            }
        };
        Ok(Scheduler::start(config, self.lifecycle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::ManualLifecycle;

    #[tokio::test]
    async fn build_with_defaults() {
        let scheduler = SchedulerBuilder::new().build().unwrap();
        assert_eq!(scheduler.config().await, SchedulerConfig::default());
        assert_eq!(scheduler.app_state().await, AppState::Active);
        scheduler.cleanup().await;
    }

    #[tokio::test]
    async fn build_rejects_invalid_config() {
        let result = SchedulerBuilder::new()
            .config(SchedulerConfig {
                batch_size: 0,
                ..SchedulerConfig::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ErrandError::InvalidConfig { field: "batch_size", .. })
        ));
    }

    #[tokio::test]
    async fn overrides_apply_on_top_of_config() {
        let scheduler = SchedulerBuilder::new()
            .overrides(ConfigPatch {
                retry_delay_ms: Some(250),
                ..ConfigPatch::default()
            })
            .build()
            .unwrap();
        let config = scheduler.config().await;
        assert_eq!(config.retry_delay_ms, 250);
        assert_eq!(config.max_concurrent_tasks, 3);
        scheduler.cleanup().await;
    }

    #[tokio::test]
    async fn initial_app_state_comes_from_source() {
        let lifecycle = ManualLifecycle::new(AppState::Background);
        let scheduler = SchedulerBuilder::new().lifecycle(&lifecycle).build().unwrap();
        assert_eq!(scheduler.app_state().await, AppState::Background);
        scheduler.cleanup().await;
    }
}
