//! Per-key serialization of lifecycle transitions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use blockhost_trigger_store::TriggerKey;
use tokio::sync::OwnedMutexGuard;

/// One async mutex per trigger key, created on demand.
///
/// Entries nobody holds are pruned on the next acquisition, so the table
/// only grows with the number of keys in flight.
#[derive(Default)]
pub(crate) struct KeyLocks {
  locks: Mutex<HashMap<TriggerKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
  /// Wait until no other transition holds `key`.
  pub(crate) async fn acquire(&self, key: &TriggerKey) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      locks.retain(|_, lock| Arc::strong_count(lock) > 1);
      locks.entry(key.clone()).or_default().clone()
    };
    lock.lock_owned().await
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}
