use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{StoredTrigger, TriggerKey, TriggerRecord};
use crate::TriggerStore;

/// In-memory trigger store.
///
/// Nothing survives the process. Useful for tests and for hosts whose
/// triggers are not meant to outlive a restart.
#[derive(Debug, Default)]
pub struct InMemoryTriggerStore {
  rows: RwLock<HashMap<TriggerKey, StoredTrigger>>,
}

impl InMemoryTriggerStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a row as-is, without encoding it first.
  pub async fn insert_raw(&self, row: StoredTrigger) {
    self.rows.write().await.insert(row.key(), row);
  }

  /// Number of stored rows.
  pub async fn len(&self) -> usize {
    self.rows.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.rows.read().await.is_empty()
  }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
  async fn initialize(&self) -> Result<(), StoreError> {
    Ok(())
  }

  async fn upsert(&self, record: &TriggerRecord) -> Result<(), StoreError> {
    let stored = record.encode(Utc::now())?;
    self.rows.write().await.insert(stored.key(), stored);
    Ok(())
  }

  async fn find(&self, plugin: &str, trigger: &str) -> Result<Vec<StoredTrigger>, StoreError> {
    let rows = self.rows.read().await;
    Ok(
      rows
        .values()
        .filter(|row| row.plugin == plugin && row.trigger == trigger)
        .cloned()
        .collect(),
    )
  }

  async fn delete(&self, key: &TriggerKey) -> Result<bool, StoreError> {
    Ok(self.rows.write().await.remove(key).is_some())
  }

  async fn list(&self) -> Result<Vec<StoredTrigger>, StoreError> {
    let rows = self.rows.read().await;
    let mut all: Vec<StoredTrigger> = rows.values().cloned().collect();
    all.sort_by(|a, b| a.key().cmp(&b.key()));
    Ok(all)
  }
}
