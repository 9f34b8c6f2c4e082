use crate::types::TriggerKey;

/// Errors that can occur in trigger storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The storage medium failed.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Preparing the schema failed.
  #[error("migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  /// A value could not be encoded for storage.
  #[error("failed to encode {column} of trigger {key}")]
  Encode {
    key: TriggerKey,
    column: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// A stored value does not parse. Scoped to a single row.
  #[error("corrupt {column} in stored trigger {key}")]
  Corrupt {
    key: TriggerKey,
    column: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// A stored `updated_at` is not an RFC 3339 timestamp. Scoped to a single row.
  #[error("corrupt updated_at in stored trigger {key}")]
  CorruptTimestamp {
    key: TriggerKey,
    #[source]
    source: chrono::ParseError,
  },

  /// A row was written with a value encoding this build does not know.
  #[error("stored trigger {key} uses unsupported value encoding {encoding}")]
  UnsupportedEncoding { key: TriggerKey, encoding: i64 },
}

impl StoreError {
  /// Whether the error concerns a single row rather than the medium.
  pub fn is_row_scoped(&self) -> bool {
    matches!(
      self,
      Self::Encode { .. }
        | Self::Corrupt { .. }
        | Self::CorruptTimestamp { .. }
        | Self::UnsupportedEncoding { .. }
    )
  }
}
