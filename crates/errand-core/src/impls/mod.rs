//! Impls - ready-made port implementations.
//!
//! - **FnAction**: closure-backed `TaskAction`
//! - **ManualLifecycle**: `LifecycleSource` driven by explicit `set_state` calls

pub mod fn_action;
pub mod manual_lifecycle;

pub use self::fn_action::{FnAction, action_fn};
pub use self::manual_lifecycle::ManualLifecycle;
