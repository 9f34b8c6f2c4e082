//! Plugin runtime errors.

use blockhost_block::BlockError;
use blockhost_executor::ExecutionError;
use blockhost_lifecycle::LifecycleError;

/// Errors that can occur while dispatching an operation to a plugin.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// No action with this name exists in the plugin.
  #[error("plugin '{plugin}' has no action '{name}'")]
  UnknownAction { plugin: String, name: String },

  /// No trigger with this name exists in the plugin.
  #[error("plugin '{plugin}' has no trigger '{name}'")]
  UnknownTrigger { plugin: String, name: String },

  /// A configuration or rendering hook failed.
  #[error(transparent)]
  Block(#[from] BlockError),

  /// The block body could not be driven.
  #[error(transparent)]
  Execution(#[from] ExecutionError),

  /// Watch or cleanup failed.
  #[error(transparent)]
  Lifecycle(#[from] LifecycleError),
}

impl RuntimeError {
  /// HTTP status describing the failure.
  pub fn status_code(&self) -> u16 {
    match self {
      Self::UnknownAction { .. } | Self::UnknownTrigger { .. } => 404,
      Self::Block(e) => e.status_code(),
      Self::Execution(ExecutionError::Cancelled) => 503,
      Self::Execution(_) => 500,
      Self::Lifecycle(e) => e.status_code(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_codes() {
    let unknown = RuntimeError::UnknownAction {
      plugin: "echo".to_string(),
      name: "missing".to_string(),
    };
    assert_eq!(unknown.status_code(), 404);
    assert_eq!(unknown.to_string(), "plugin 'echo' has no action 'missing'");

    let invalid = RuntimeError::from(BlockError::invalid_input("text is required"));
    assert_eq!(invalid.status_code(), 400);

    let unsupported = RuntimeError::from(ExecutionError::UnsupportedCompletion {
      block: "echo".to_string(),
    });
    assert_eq!(unsupported.status_code(), 500);
  }
}
