//! TaskAction port - the deferred work itself.

use async_trait::async_trait;

use crate::domain::ActionError;

/// A zero-argument unit of deferred work.
///
/// The scheduler may run an action more than once (retries, re-registration),
/// so implementations must tolerate re-execution. Errors are contained by the
/// scheduler; report them through your own channel before returning if the
/// caller needs to see them.
#[async_trait]
pub trait TaskAction: Send + Sync + 'static {
    async fn run(&self) -> Result<(), ActionError>;
}
