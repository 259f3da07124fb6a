//! Ports - seams between the scheduler and its host.
//!
//! - `TaskAction`: the work a caller registers.
//! - `LifecycleSource`: foreground/background notifications.

pub mod action;
pub mod lifecycle;

pub use self::action::TaskAction;
pub use self::lifecycle::{AppState, LifecycleSource};
