use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StoreError;

/// Version tag of the value encoding written by this crate.
pub const CURRENT_ENCODING: i64 = 1;

/// Identity of a stored trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerKey {
  /// Plugin uid.
  pub plugin: String,
  /// Trigger name within the plugin.
  pub trigger: String,
  /// Callback address the event source was told to use.
  pub endpoint: String,
}

impl TriggerKey {
  pub fn new(
    plugin: impl Into<String>,
    trigger: impl Into<String>,
    endpoint: impl Into<String>,
  ) -> Self {
    Self {
      plugin: plugin.into(),
      trigger: trigger.into(),
      endpoint: endpoint.into(),
    }
  }
}

impl fmt::Display for TriggerKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}@{}", self.plugin, self.trigger, self.endpoint)
  }
}

/// A remembered trigger watch with decoded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
  pub plugin: String,
  pub trigger: String,
  pub endpoint: String,
  /// Resolved block configuration at watch time.
  pub block_config: serde_json::Value,
  /// Plugin configuration at watch time.
  pub plugin_config: Option<serde_json::Value>,
  /// Data returned by the watch, handed back on cleanup.
  pub cleanup_data: Option<serde_json::Value>,
}

impl TriggerRecord {
  pub fn key(&self) -> TriggerKey {
    TriggerKey::new(&self.plugin, &self.trigger, &self.endpoint)
  }

  /// Encode the record into its stored form.
  pub fn encode(&self, updated_at: DateTime<Utc>) -> Result<StoredTrigger, StoreError> {
    let encode = |column: &'static str, value: &serde_json::Value| {
      serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: self.key(),
        column,
        source,
      })
    };

    Ok(StoredTrigger {
      plugin: self.plugin.clone(),
      trigger: self.trigger.clone(),
      endpoint: self.endpoint.clone(),
      block_config: encode("block_config", &self.block_config)?,
      plugin_config: self
        .plugin_config
        .as_ref()
        .map(|v| encode("plugin_config", v))
        .transpose()?,
      cleanup_data: self
        .cleanup_data
        .as_ref()
        .map(|v| encode("cleanup_data", v))
        .transpose()?,
      encoding: CURRENT_ENCODING,
      updated_at: updated_at.to_rfc3339(),
    })
  }
}

/// A trigger row as stored, values still encoded.
///
/// Rows are decoded lazily so one corrupt row never fails a whole query.
/// That includes `updated_at`, which is kept as RFC 3339 text until asked for.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StoredTrigger {
  pub plugin: String,
  pub trigger: String,
  pub endpoint: String,
  pub block_config: String,
  pub plugin_config: Option<String>,
  pub cleanup_data: Option<String>,
  pub encoding: i64,
  pub updated_at: String,
}

impl StoredTrigger {
  pub fn key(&self) -> TriggerKey {
    TriggerKey::new(&self.plugin, &self.trigger, &self.endpoint)
  }

  /// Parse the last write time.
  pub fn updated_at(&self) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&self.updated_at)
      .map(|at| at.with_timezone(&Utc))
      .map_err(|source| StoreError::CorruptTimestamp {
        key: self.key(),
        source,
      })
  }

  /// Decode the stored values.
  pub fn decode(&self) -> Result<TriggerRecord, StoreError> {
    if self.encoding != CURRENT_ENCODING {
      return Err(StoreError::UnsupportedEncoding {
        key: self.key(),
        encoding: self.encoding,
      });
    }
    self.updated_at()?;

    let decode = |column: &'static str, raw: &str| {
      serde_json::from_str::<serde_json::Value>(raw).map_err(|source| StoreError::Corrupt {
        key: self.key(),
        column,
        source,
      })
    };

    Ok(TriggerRecord {
      plugin: self.plugin.clone(),
      trigger: self.trigger.clone(),
      endpoint: self.endpoint.clone(),
      block_config: decode("block_config", &self.block_config)?,
      plugin_config: self
        .plugin_config
        .as_deref()
        .map(|raw| decode("plugin_config", raw))
        .transpose()?,
      cleanup_data: self
        .cleanup_data
        .as_deref()
        .map(|raw| decode("cleanup_data", raw))
        .transpose()?,
    })
  }
}
