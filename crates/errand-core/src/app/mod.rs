//! App - the scheduler itself.
//!
//! # Components
//! - **SchedulerBuilder**: config validation and wiring
//! - **Scheduler**: public API (add/remove/configure/stats/clear/cleanup)
//! - **DispatchLoop**: scheduling passes and attempt execution
//! - **LifecycleLoop**: foreground/background observer
//! - **Status**: stats and per-task views

pub mod builder;
pub mod config;
mod dispatch_loop;
mod lifecycle_loop;
pub mod scheduler;
pub mod status;

pub use self::builder::SchedulerBuilder;
pub use self::config::{ConfigPatch, SchedulerConfig};
pub use self::scheduler::Scheduler;
pub use self::status::{KindCounts, PriorityCounts, TaskStats, TaskView};
