//! Trigger lifecycle for blockhost.
//!
//! [`TriggerLifecycle`] runs a trigger's watch and cleanup bodies and keeps
//! the trigger store in step with them:
//!
//! - `watch` on a remembered trigger upserts one record per
//!   (plugin, trigger, endpoint) key
//! - `cleanup` deletes that record, then runs the cleanup body
//! - `replay` re-watches every stored record at startup without writing
//!
//! Triggers that are not remembered pass straight through to their
//! definition and leave no state behind.

mod error;
mod identity;
mod lifecycle;
mod locks;
mod report;

pub use error::LifecycleError;
pub use identity::{resolve_key, with_identity};
pub use lifecycle::TriggerLifecycle;
pub use report::ReplayReport;
