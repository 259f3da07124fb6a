//! errand-core
//!
//! In-process background task scheduler: priority ordering, a concurrency
//! cap, linear retry backoff, optional batching, and deferral of low-priority
//! work while the host app is in the background.
//!
//! # Modules
//! - **domain**: ids, task descriptors, priorities, outcomes, errors
//! - **ports**: seams to the host (`TaskAction`, `LifecycleSource`)
//! - **queue**: task records, retry policy, failure history, task table
//! - **app**: `Scheduler`, its builder, config and status views
//! - **impls**: ready-made ports (`FnAction`, `ManualLifecycle`)

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{ConfigPatch, Scheduler, SchedulerBuilder, SchedulerConfig, TaskStats, TaskView};
pub use domain::{ActionError, ErrandError, Priority, TaskDescriptor, TaskId, TaskKind};
pub use ports::{AppState, LifecycleSource, TaskAction};
