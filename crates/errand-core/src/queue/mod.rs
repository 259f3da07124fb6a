//! Queue module: task records, retry policy, failure history and the
//! in-memory task table the scheduler owns.

mod history;
mod memory;
mod record;
mod retry;

pub use history::{FailureHistory, FailureRecord};
pub use memory::{AttemptTicket, Settlement, TaskTable};
pub use record::{TaskRecord, deadline_after};
pub use retry::RetryPolicy;
