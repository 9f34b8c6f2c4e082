//! Trigger lifecycle manager.

use std::sync::Arc;

use blockhost_block::{CleanupArgs, Trigger, TriggerMap, WatchArgs};
use blockhost_trigger_store::{StoredTrigger, TriggerKey, TriggerRecord, TriggerStore};
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};

use crate::error::LifecycleError;
use crate::identity::{resolve_key, with_identity};
use crate::locks::KeyLocks;
use crate::report::{ReplayOutcome, ReplayReport};

/// Coordinates trigger watch and cleanup with the trigger store.
///
/// Transitions on the same (plugin, trigger, endpoint) key are serialized
/// within the process. Different keys proceed concurrently.
pub struct TriggerLifecycle {
  store: Arc<dyn TriggerStore>,
  locks: KeyLocks,
}

impl TriggerLifecycle {
  /// Create a lifecycle manager over an initialized store.
  pub fn new(store: Arc<dyn TriggerStore>) -> Self {
    Self {
      store,
      locks: KeyLocks::default(),
    }
  }

  /// The backing store.
  pub fn store(&self) -> &Arc<dyn TriggerStore> {
    &self.store
  }

  /// Watch a trigger endpoint.
  ///
  /// For remembered triggers the returned cleanup data carries the key's
  /// identity fields and is stored along with the configs. If the watch body
  /// fails nothing is stored.
  #[instrument(skip(self, definition, args), fields(endpoint = %args.endpoint))]
  pub async fn watch(
    &self,
    plugin: &str,
    trigger: &str,
    definition: &dyn Trigger,
    args: WatchArgs,
  ) -> Result<Option<serde_json::Value>, LifecycleError> {
    let key = TriggerKey::new(plugin, trigger, &args.endpoint);

    if !definition.manifest().remember_trigger {
      let cleanup_data = definition
        .watch_block(args)
        .await
        .map_err(|source| LifecycleError::Watch { key: key.clone(), source })?;
      info!(name: "trigger_watched", key = %key, remembered = false, "trigger watched");
      return Ok(cleanup_data);
    }

    if key.endpoint.is_empty() {
      return Err(LifecycleError::IncompleteIdentity {
        plugin: key.plugin,
        trigger: key.trigger,
        message: "endpoint is required".to_string(),
      });
    }

    let _guard = self.locks.acquire(&key).await;

    let block_config = args.block_config.clone();
    let plugin_config = args.plugin_config.clone();
    let cleanup_data = match definition.watch_block(args).await {
      Ok(data) => with_identity(&key, data),
      Err(source) => {
        error!(key = %key, error = %source, "trigger watch failed");
        return Err(LifecycleError::Watch { key, source });
      }
    };

    let record = TriggerRecord {
      plugin: key.plugin.clone(),
      trigger: key.trigger.clone(),
      endpoint: key.endpoint.clone(),
      block_config,
      plugin_config,
      cleanup_data: Some(cleanup_data.clone()),
    };
    self.store.upsert(&record).await.inspect_err(|e| {
      error!(key = %key, error = %e, "failed to remember trigger");
    })?;

    info!(name: "trigger_watched", key = %key, remembered = true, "trigger watched");
    Ok(Some(cleanup_data))
  }

  /// Clean up a watched trigger.
  ///
  /// For remembered triggers the key comes from `endpoint`, or from the
  /// identity fields in the cleanup data. The stored record is deleted
  /// first and the cleanup body runs regardless of how the deletion went.
  /// Returns whether a stored record was removed.
  #[instrument(skip(self, definition, args))]
  pub async fn cleanup(
    &self,
    plugin: &str,
    trigger: &str,
    definition: &dyn Trigger,
    endpoint: Option<&str>,
    args: CleanupArgs,
  ) -> Result<bool, LifecycleError> {
    if !definition.manifest().remember_trigger {
      let key = TriggerKey::new(plugin, trigger, endpoint.unwrap_or_default());
      definition
        .cleanup_block(args)
        .await
        .map_err(|source| LifecycleError::Cleanup { key: key.clone(), source })?;
      info!(name: "trigger_cleaned_up", key = %key, remembered = false, "trigger cleaned up");
      return Ok(false);
    }

    let key = match resolve_key(plugin, trigger, endpoint, &args.cleanup_data) {
      Ok(key) => key,
      Err(e) => {
        warn!(error = %e, "rejected trigger cleanup");
        return Err(e);
      }
    };

    let _guard = self.locks.acquire(&key).await;

    let deleted = self.store.delete(&key).await;
    if let Err(e) = &deleted {
      error!(key = %key, error = %e, "failed to forget trigger");
    }

    let body = definition.cleanup_block(args).await;
    if let Err(e) = &body {
      error!(key = %key, error = %e, "trigger cleanup body failed");
    }

    let removed = deleted?;
    body.map_err(|source| LifecycleError::Cleanup { key: key.clone(), source })?;

    info!(name: "trigger_cleaned_up", key = %key, remembered = true, removed, "trigger cleaned up");
    Ok(removed)
  }

  /// Re-watch every remembered trigger of a plugin.
  ///
  /// Each stored record gets one watch call carrying its stored configs and
  /// cleanup data. Failures are logged and counted, never propagated, and
  /// the store is never written. At most `concurrency` watches run at once.
  #[instrument(skip(self, triggers))]
  pub async fn replay(
    &self,
    plugin: &str,
    triggers: &TriggerMap,
    concurrency: usize,
  ) -> ReplayReport {
    let mut report = ReplayReport::default();
    let mut pending = Vec::new();

    for (name, definition) in triggers {
      if !definition.manifest().remember_trigger {
        continue;
      }

      match self.store.find(plugin, name).await {
        Ok(rows) => pending.extend(rows.into_iter().map(|row| (definition.clone(), row))),
        Err(e) => {
          error!(trigger = %name, error = %e, "failed to load remembered triggers");
          report.unreadable += 1;
        }
      }
    }

    let outcomes: Vec<ReplayOutcome> = stream::iter(pending)
      .map(|(definition, row)| self.replay_one(definition, row))
      .buffer_unordered(concurrency.max(1))
      .collect()
      .await;

    for outcome in outcomes {
      report.record(outcome);
    }

    info!(
      attempted = report.attempted,
      succeeded = report.succeeded,
      failed = report.failed,
      corrupt = report.corrupt,
      "trigger replay finished"
    );
    report
  }

  async fn replay_one(&self, definition: Arc<dyn Trigger>, row: StoredTrigger) -> ReplayOutcome {
    let record = match row.decode() {
      Ok(record) => record,
      Err(e) => {
        error!(key = %row.key(), error = %e, "skipping unreadable trigger");
        return ReplayOutcome::Corrupt;
      }
    };
    let key = record.key();

    let plugin_config = if definition.manifest().needs_plugin_config {
      record.plugin_config
    } else {
      None
    };
    let args = WatchArgs {
      endpoint: record.endpoint,
      block_config: record.block_config,
      cleanup_data: record.cleanup_data,
      plugin_config,
    };

    let _guard = self.locks.acquire(&key).await;
    match definition.watch_block(args).await {
      Ok(_) => {
        info!(name: "trigger_replayed", key = %key, "trigger replayed");
        ReplayOutcome::Watched
      }
      Err(e) => {
        error!(key = %key, error = %e, "trigger replay failed");
        ReplayOutcome::Failed
      }
    }
  }

  /// Remove a stored record without running the trigger's cleanup body.
  ///
  /// Returns whether a record existed.
  #[instrument(skip(self), fields(key = %key))]
  pub async fn forget(&self, key: &TriggerKey) -> Result<bool, LifecycleError> {
    let _guard = self.locks.acquire(key).await;
    let removed = self.store.delete(key).await?;
    info!(removed, "trigger forgotten");
    Ok(removed)
  }

  /// Every stored record.
  pub async fn list(&self) -> Result<Vec<StoredTrigger>, LifecycleError> {
    Ok(self.store.list().await?)
  }
}
