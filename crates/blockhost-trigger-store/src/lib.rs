//! Blockhost Trigger Store
//!
//! This crate provides durable storage for remembered trigger watches.
//! A record is identified by its (plugin, trigger, endpoint) triple and at
//! most one record exists per triple.
//!
//! The [`TriggerStore`] trait defines operations for:
//! - Preparing storage
//! - Inserting or replacing a record
//! - Finding the records of one trigger
//! - Deleting a record
//!
//! Values are stored as JSON text and returned undecoded as
//! [`StoredTrigger`] rows; call [`StoredTrigger::decode`] per row.

mod error;
mod memory;
mod sqlite;
mod types;

pub use error::StoreError;
pub use memory::InMemoryTriggerStore;
pub use sqlite::SqliteTriggerStore;
pub use types::{CURRENT_ENCODING, StoredTrigger, TriggerKey, TriggerRecord};

use async_trait::async_trait;

/// Storage trait for remembered triggers.
#[async_trait]
pub trait TriggerStore: Send + Sync {
  /// Prepare the storage medium. Safe to call on every start.
  async fn initialize(&self) -> Result<(), StoreError>;

  /// Insert a record, or replace the values of the record with the same key.
  async fn upsert(&self, record: &TriggerRecord) -> Result<(), StoreError>;

  /// All records of one plugin trigger, in no particular order.
  async fn find(&self, plugin: &str, trigger: &str) -> Result<Vec<StoredTrigger>, StoreError>;

  /// Delete the record with the given key. Returns whether a record existed.
  async fn delete(&self, key: &TriggerKey) -> Result<bool, StoreError>;

  /// Every stored record, for administration.
  async fn list(&self) -> Result<Vec<StoredTrigger>, StoreError>;
}
