//! Plugin runtime for blockhost.
//!
//! A [`PluginRuntime`] wraps one plugin, resolves its actions and triggers by
//! name and forwards each operation to the block:
//!
//! - configuration and rendering hooks are called directly
//! - execution is driven by the block executor into a result stream
//! - watch, cleanup and replay go through the trigger lifecycle
//!
//! `plugin_config` reaches a block only if its manifest sets
//! `needs_plugin_config`.

mod error;
mod runtime;
mod types;

pub use error::RuntimeError;
pub use runtime::{BEST_CONFIG_ENDPOINT, PluginRuntime};
pub use types::{
  ActionDescription, BestConfig, BlockSchema, ConfigSchema, PluginDescription, TriggerDescription,
};
