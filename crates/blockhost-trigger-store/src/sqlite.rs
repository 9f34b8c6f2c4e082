use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::types::{StoredTrigger, TriggerKey, TriggerRecord};
use crate::TriggerStore;

/// SQLite-based trigger store.
pub struct SqliteTriggerStore {
  pool: SqlitePool,
}

impl SqliteTriggerStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open the database at `url`, creating the file if it does not exist.
  ///
  /// URL format: `sqlite://plugin.sqlite` or `sqlite:///abs/path.sqlite`.
  pub async fn connect(url: &str) -> Result<Self, StoreError> {
    info!(url, "opening trigger store");

    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
      .max_connections(4)
      .connect_with(options)
      .await?;

    Ok(Self::new(pool))
  }

  /// Create a store backed by a private in-memory database.
  ///
  /// The pool is pinned to a single connection that never expires, since
  /// every SQLite in-memory connection is its own database.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await?;

    Ok(Self::new(pool))
  }

  /// The underlying connection pool.
  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  /// Close the pool, waiting for connections to be released.
  pub async fn close(&self) {
    self.pool.close().await;
  }
}

#[async_trait]
impl TriggerStore for SqliteTriggerStore {
  async fn initialize(&self) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await?;
    debug!("trigger store schema ready");
    Ok(())
  }

  #[instrument(skip(self, record), fields(key = %record.key()))]
  async fn upsert(&self, record: &TriggerRecord) -> Result<(), StoreError> {
    let stored = record.encode(Utc::now())?;

    sqlx::query(
      r#"
            INSERT INTO triggers (plugin, "trigger", endpoint, block_config, plugin_config, cleanup_data, encoding, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (plugin, "trigger", endpoint) DO UPDATE SET
                block_config = excluded.block_config,
                plugin_config = excluded.plugin_config,
                cleanup_data = excluded.cleanup_data,
                encoding = excluded.encoding,
                updated_at = excluded.updated_at
            "#,
    )
    .bind(&stored.plugin)
    .bind(&stored.trigger)
    .bind(&stored.endpoint)
    .bind(&stored.block_config)
    .bind(&stored.plugin_config)
    .bind(&stored.cleanup_data)
    .bind(stored.encoding)
    .bind(&stored.updated_at)
    .execute(&self.pool)
    .await?;

    debug!("trigger stored");
    Ok(())
  }

  async fn find(&self, plugin: &str, trigger: &str) -> Result<Vec<StoredTrigger>, StoreError> {
    let rows = sqlx::query_as(
      r#"
            SELECT plugin, "trigger", endpoint, block_config, plugin_config, cleanup_data, encoding, updated_at
            FROM triggers
            WHERE plugin = ? AND "trigger" = ?
            "#,
    )
    .bind(plugin)
    .bind(trigger)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }

  #[instrument(skip(self), fields(key = %key))]
  async fn delete(&self, key: &TriggerKey) -> Result<bool, StoreError> {
    let result = sqlx::query(
      r#"
            DELETE FROM triggers
            WHERE plugin = ? AND "trigger" = ? AND endpoint = ?
            "#,
    )
    .bind(&key.plugin)
    .bind(&key.trigger)
    .bind(&key.endpoint)
    .execute(&self.pool)
    .await?;

    let removed = result.rows_affected() > 0;
    debug!(removed, "trigger delete finished");
    Ok(removed)
  }

  async fn list(&self) -> Result<Vec<StoredTrigger>, StoreError> {
    let rows = sqlx::query_as(
      r#"
            SELECT plugin, "trigger", endpoint, block_config, plugin_config, cleanup_data, encoding, updated_at
            FROM triggers
            ORDER BY plugin, "trigger", endpoint
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }
}
