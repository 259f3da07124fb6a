//! Domain model (ids, task descriptors, outcomes, errors).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod task;

pub use errors::{ActionError, ErrandError};
pub use ids::{AttemptId, TaskId};
pub use outcome::{AttemptOutcome, Disposition, FailureReason};
pub use task::{DEFAULT_MAX_RETRIES, Priority, TaskDescriptor, TaskKind};
