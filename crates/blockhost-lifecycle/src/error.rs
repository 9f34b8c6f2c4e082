//! Trigger lifecycle errors.

use blockhost_block::BlockError;
use blockhost_trigger_store::{StoreError, TriggerKey};

/// Errors that can occur while watching, cleaning up or forgetting a trigger.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
  /// The caller did not supply a complete (plugin, trigger, endpoint) key.
  ///
  /// Raised before the store or the trigger body is touched.
  #[error("incomplete trigger identity for {plugin}/{trigger}: {message}")]
  IncompleteIdentity {
    plugin: String,
    trigger: String,
    message: String,
  },

  /// The trigger's watch body failed. Nothing was stored.
  #[error("watching trigger {key} failed: {source}")]
  Watch {
    key: TriggerKey,
    #[source]
    source: BlockError,
  },

  /// The trigger's cleanup body failed.
  ///
  /// For remembered triggers the stored record is already gone.
  #[error("cleaning up trigger {key} failed: {source}")]
  Cleanup {
    key: TriggerKey,
    #[source]
    source: BlockError,
  },

  /// The trigger store failed.
  #[error("trigger store error: {0}")]
  Store(#[from] StoreError),
}

impl LifecycleError {
  /// HTTP-style status code describing the failure.
  pub fn status_code(&self) -> u16 {
    match self {
      Self::IncompleteIdentity { .. } => 400,
      Self::Watch { source, .. } | Self::Cleanup { source, .. } => source.status_code(),
      Self::Store(_) => 500,
    }
  }
}
