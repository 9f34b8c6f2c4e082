//! Trigger lifecycle against both store implementations.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blockhost_block::{
  BlockError, CleanupArgs, Completion, DerivedBlockConfig, RenderSchemaArgs, RenderSignatureArgs,
  Trigger, TriggerDeriveArgs, TriggerExecuteArgs, TriggerManifest, TriggerMap, TriggerSignature,
  WatchArgs,
};
use blockhost_lifecycle::{LifecycleError, TriggerLifecycle};
use blockhost_trigger_store::{
  InMemoryTriggerStore, SqliteTriggerStore, StoredTrigger, TriggerKey, TriggerRecord,
  TriggerStore,
};
use chrono::Utc;
use serde_json::{Value, json};

/// Trigger that records every call and fails on chosen endpoints.
struct RecordingTrigger {
  manifest: TriggerManifest,
  watched: Mutex<Vec<WatchArgs>>,
  cleaned: Mutex<Vec<CleanupArgs>>,
  failing_endpoints: HashSet<String>,
  failing_cleanup: bool,
}

impl RecordingTrigger {
  fn new(remember: bool) -> Self {
    Self {
      manifest: TriggerManifest {
        title: "On create".to_string(),
        color: "#336699".to_string(),
        icon_url: String::new(),
        description: "Fires when something is created".to_string(),
        remember_trigger: remember,
        needs_plugin_config: false,
      },
      watched: Mutex::new(Vec::new()),
      cleaned: Mutex::new(Vec::new()),
      failing_endpoints: HashSet::new(),
      failing_cleanup: false,
    }
  }

  fn needing_plugin_config(mut self) -> Self {
    self.manifest.needs_plugin_config = true;
    self
  }

  fn failing_on(mut self, endpoint: &str) -> Self {
    self.failing_endpoints.insert(endpoint.to_string());
    self
  }

  fn failing_cleanup(mut self) -> Self {
    self.failing_cleanup = true;
    self
  }

  fn watch_calls(&self) -> Vec<WatchArgs> {
    self.watched.lock().unwrap().clone()
  }

  fn cleanup_calls(&self) -> usize {
    self.cleaned.lock().unwrap().len()
  }
}

#[async_trait]
impl Trigger for RecordingTrigger {
  fn manifest(&self) -> &TriggerManifest {
    &self.manifest
  }

  async fn derive_block_config(
    &self,
    _args: TriggerDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError> {
    Ok(DerivedBlockConfig {
      valid: true,
      block_config: json!({}),
      render_props: json!({}),
    })
  }

  async fn render_block_config_schema(&self, _args: RenderSchemaArgs) -> Result<Value, BlockError> {
    Ok(json!({}))
  }

  async fn render_block_signature(
    &self,
    _args: RenderSignatureArgs,
  ) -> Result<TriggerSignature, BlockError> {
    Ok(TriggerSignature::default())
  }

  async fn watch_block(&self, args: WatchArgs) -> Result<Option<Value>, BlockError> {
    let endpoint = args.endpoint.clone();
    self.watched.lock().unwrap().push(args);
    if self.failing_endpoints.contains(&endpoint) {
      return Err(BlockError::upstream(502, "event source unavailable"));
    }
    Ok(Some(json!({"hookId": format!("hook:{}", endpoint)})))
  }

  async fn cleanup_block(&self, args: CleanupArgs) -> Result<(), BlockError> {
    self.cleaned.lock().unwrap().push(args);
    if self.failing_cleanup {
      return Err(BlockError::failed("event source refused"));
    }
    Ok(())
  }

  fn execute_block(&self, args: TriggerExecuteArgs) -> Completion {
    Completion::immediate(json!({"method": args.request.method}))
  }
}

async fn stores() -> Vec<Arc<dyn TriggerStore>> {
  let sqlite = SqliteTriggerStore::in_memory().await.unwrap();
  let memory = InMemoryTriggerStore::new();
  let stores: Vec<Arc<dyn TriggerStore>> = vec![Arc::new(sqlite), Arc::new(memory)];
  for store in &stores {
    store.initialize().await.unwrap();
  }
  stores
}

fn watch_args(endpoint: &str, block_config: Value) -> WatchArgs {
  WatchArgs {
    endpoint: endpoint.to_string(),
    block_config,
    cleanup_data: None,
    plugin_config: Some(json!({"token": "secret"})),
  }
}

fn record(plugin: &str, trigger: &str, endpoint: &str) -> TriggerRecord {
  TriggerRecord {
    plugin: plugin.to_string(),
    trigger: trigger.to_string(),
    endpoint: endpoint.to_string(),
    block_config: json!({"endpoint": endpoint}),
    plugin_config: Some(json!({"token": "stored"})),
    cleanup_data: Some(json!({"hookId": endpoint})),
  }
}

#[tokio::test]
async fn test_watch_then_cleanup_round_trip() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true);

    let cleanup_data = lifecycle
      .watch("p1", "onCreate", &trigger, watch_args("https://cb/1", json!({"x": 1})))
      .await
      .unwrap()
      .unwrap();

    assert_eq!(
      cleanup_data,
      json!({
        "hookId": "hook:https://cb/1",
        "plugin": "p1",
        "trigger": "onCreate",
        "endpoint": "https://cb/1",
      })
    );

    let rows = store.find("p1", "onCreate").await.unwrap();
    assert_eq!(rows.len(), 1);
    let stored = rows[0].decode().unwrap();
    assert_eq!(stored.key(), TriggerKey::new("p1", "onCreate", "https://cb/1"));
    assert_eq!(stored.block_config, json!({"x": 1}));
    assert_eq!(stored.cleanup_data, Some(cleanup_data.clone()));

    let removed = lifecycle
      .cleanup(
        "p1",
        "onCreate",
        &trigger,
        Some("https://cb/1"),
        CleanupArgs {
          block_config: json!({"x": 1}),
          cleanup_data,
          plugin_config: None,
        },
      )
      .await
      .unwrap();

    assert!(removed);
    assert!(store.find("p1", "onCreate").await.unwrap().is_empty());
    assert_eq!(trigger.cleanup_calls(), 1);
  }
}

#[tokio::test]
async fn test_rewatch_keeps_one_record_with_latest_values() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true);

    for x in [1, 2] {
      lifecycle
        .watch("p1", "onCreate", &trigger, watch_args("https://cb/1", json!({ "x": x })))
        .await
        .unwrap();
    }

    let rows = store.find("p1", "onCreate").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].decode().unwrap().block_config, json!({"x": 2}));
  }
}

#[tokio::test]
async fn test_cleanup_of_unknown_key_is_a_no_op() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true);
    store.upsert(&record("p1", "onCreate", "https://cb/keep")).await.unwrap();

    let removed = lifecycle
      .cleanup(
        "p1",
        "onCreate",
        &trigger,
        Some("https://cb/never"),
        CleanupArgs {
          block_config: json!({}),
          cleanup_data: json!({}),
          plugin_config: None,
        },
      )
      .await
      .unwrap();

    assert!(!removed);
    assert_eq!(store.list().await.unwrap().len(), 1);
  }
}

#[tokio::test]
async fn test_cleanup_without_identity_touches_nothing() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true);
    store.upsert(&record("p1", "onCreate", "https://cb/1")).await.unwrap();

    let result = lifecycle
      .cleanup(
        "p1",
        "onCreate",
        &trigger,
        None,
        CleanupArgs {
          block_config: json!({}),
          cleanup_data: json!({"hookId": 7}),
          plugin_config: None,
        },
      )
      .await;

    let error = result.unwrap_err();
    assert!(matches!(error, LifecycleError::IncompleteIdentity { .. }));
    assert_eq!(error.status_code(), 400);
    assert_eq!(trigger.cleanup_calls(), 0);
    assert_eq!(store.list().await.unwrap().len(), 1);
  }
}

#[tokio::test]
async fn test_cleanup_resolves_endpoint_from_cleanup_data() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true);

    let cleanup_data = lifecycle
      .watch("p1", "onCreate", &trigger, watch_args("https://cb/1", json!({})))
      .await
      .unwrap()
      .unwrap();

    let removed = lifecycle
      .cleanup(
        "p1",
        "onCreate",
        &trigger,
        None,
        CleanupArgs {
          block_config: json!({}),
          cleanup_data,
          plugin_config: None,
        },
      )
      .await
      .unwrap();

    assert!(removed);
    assert!(store.list().await.unwrap().is_empty());
  }
}

#[tokio::test]
async fn test_failed_cleanup_body_still_deletes_record() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true).failing_cleanup();

    lifecycle
      .watch("p1", "onCreate", &trigger, watch_args("https://cb/1", json!({})))
      .await
      .unwrap();

    let result = lifecycle
      .cleanup(
        "p1",
        "onCreate",
        &trigger,
        Some("https://cb/1"),
        CleanupArgs {
          block_config: json!({}),
          cleanup_data: json!({}),
          plugin_config: None,
        },
      )
      .await;

    assert!(matches!(result, Err(LifecycleError::Cleanup { .. })));
    assert_eq!(trigger.cleanup_calls(), 1);
    assert!(store.list().await.unwrap().is_empty());
  }
}

#[tokio::test]
async fn test_failed_watch_stores_nothing() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true).failing_on("https://cb/bad");

    let result = lifecycle
      .watch("p1", "onCreate", &trigger, watch_args("https://cb/bad", json!({})))
      .await;

    let error = result.unwrap_err();
    assert!(matches!(error, LifecycleError::Watch { .. }));
    assert_eq!(error.status_code(), 502);
    assert!(store.list().await.unwrap().is_empty());
  }
}

#[tokio::test]
async fn test_unremembered_trigger_leaves_no_state() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(false);

    let cleanup_data = lifecycle
      .watch("p1", "onCreate", &trigger, watch_args("https://cb/1", json!({})))
      .await
      .unwrap();

    assert_eq!(cleanup_data, Some(json!({"hookId": "hook:https://cb/1"})));
    assert!(store.list().await.unwrap().is_empty());

    let removed = lifecycle
      .cleanup(
        "p1",
        "onCreate",
        &trigger,
        None,
        CleanupArgs {
          block_config: json!({}),
          cleanup_data: json!({}),
          plugin_config: None,
        },
      )
      .await
      .unwrap();
    assert!(!removed);
    assert_eq!(trigger.cleanup_calls(), 1);
  }
}

#[tokio::test]
async fn test_replay_watches_each_record_once() {
  for store in stores().await {
    let on_create = Arc::new(RecordingTrigger::new(true));
    let on_delete = Arc::new(RecordingTrigger::new(true));
    let on_poll = Arc::new(RecordingTrigger::new(false));

    for i in 0..3 {
      store
        .upsert(&record("p1", "onCreate", &format!("https://cb/create/{}", i)))
        .await
        .unwrap();
    }
    for i in 0..2 {
      store
        .upsert(&record("p1", "onDelete", &format!("https://cb/delete/{}", i)))
        .await
        .unwrap();
    }
    store.upsert(&record("p2", "onCreate", "https://cb/other")).await.unwrap();
    store.upsert(&record("p1", "onPoll", "https://cb/poll")).await.unwrap();

    let mut triggers: TriggerMap = BTreeMap::new();
    triggers.insert("onCreate".to_string(), on_create.clone());
    triggers.insert("onDelete".to_string(), on_delete.clone());
    triggers.insert("onPoll".to_string(), on_poll.clone());

    let before = store.list().await.unwrap();
    let lifecycle = TriggerLifecycle::new(store.clone());
    let report = lifecycle.replay("p1", &triggers, 2).await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.succeeded, 5);
    assert!(report.is_clean());
    assert_eq!(on_create.watch_calls().len(), 3);
    assert_eq!(on_delete.watch_calls().len(), 2);
    assert!(on_poll.watch_calls().is_empty());

    let mut endpoints: Vec<String> = on_create
      .watch_calls()
      .into_iter()
      .map(|args| {
        assert_eq!(args.cleanup_data, Some(json!({"hookId": args.endpoint})));
        assert_eq!(args.block_config, json!({"endpoint": args.endpoint}));
        args.endpoint
      })
      .collect();
    endpoints.sort();
    assert_eq!(
      endpoints,
      vec!["https://cb/create/0", "https://cb/create/1", "https://cb/create/2"]
    );

    assert_eq!(store.list().await.unwrap(), before);
  }
}

#[tokio::test]
async fn test_replay_failure_does_not_stop_others() {
  for store in stores().await {
    let trigger = Arc::new(RecordingTrigger::new(true).failing_on("https://cb/1"));
    for i in 0..3 {
      store
        .upsert(&record("p1", "onCreate", &format!("https://cb/{}", i)))
        .await
        .unwrap();
    }

    let mut triggers: TriggerMap = BTreeMap::new();
    triggers.insert("onCreate".to_string(), trigger.clone());

    let lifecycle = TriggerLifecycle::new(store.clone());
    let report = lifecycle.replay("p1", &triggers, 1).await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(trigger.watch_calls().len(), 3);
    assert_eq!(store.list().await.unwrap().len(), 3);
  }
}

#[tokio::test]
async fn test_replay_skips_corrupt_rows() {
  let store = Arc::new(InMemoryTriggerStore::new());
  store.upsert(&record("p1", "onCreate", "https://cb/ok")).await.unwrap();
  store
    .insert_raw(StoredTrigger {
      plugin: "p1".to_string(),
      trigger: "onCreate".to_string(),
      endpoint: "https://cb/broken".to_string(),
      block_config: "{not json".to_string(),
      plugin_config: None,
      cleanup_data: None,
      encoding: 1,
      updated_at: Utc::now().to_rfc3339(),
    })
    .await;

  let trigger = Arc::new(RecordingTrigger::new(true));
  let mut triggers: TriggerMap = BTreeMap::new();
  triggers.insert("onCreate".to_string(), trigger.clone());

  let lifecycle = TriggerLifecycle::new(store.clone());
  let report = lifecycle.replay("p1", &triggers, 4).await;

  assert_eq!(report.succeeded, 1);
  assert_eq!(report.corrupt, 1);
  assert_eq!(trigger.watch_calls().len(), 1);
  assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_replay_forwards_plugin_config_only_when_needed() {
  for store in stores().await {
    store.upsert(&record("p1", "plain", "https://cb/1")).await.unwrap();
    store.upsert(&record("p1", "configured", "https://cb/1")).await.unwrap();

    let plain = Arc::new(RecordingTrigger::new(true));
    let configured = Arc::new(RecordingTrigger::new(true).needing_plugin_config());
    let mut triggers: TriggerMap = BTreeMap::new();
    triggers.insert("plain".to_string(), plain.clone());
    triggers.insert("configured".to_string(), configured.clone());

    TriggerLifecycle::new(store.clone())
      .replay("p1", &triggers, 4)
      .await;

    assert_eq!(plain.watch_calls()[0].plugin_config, None);
    assert_eq!(
      configured.watch_calls()[0].plugin_config,
      Some(json!({"token": "stored"}))
    );
  }
}

#[tokio::test]
async fn test_concurrent_watches_leave_one_record() {
  for store in stores().await {
    let lifecycle = Arc::new(TriggerLifecycle::new(store.clone()));
    let trigger = Arc::new(RecordingTrigger::new(true));

    let handles: Vec<_> = [1, 2]
      .into_iter()
      .map(|x| {
        let lifecycle = lifecycle.clone();
        let trigger = trigger.clone();
        tokio::spawn(async move {
          lifecycle
            .watch(
              "p1",
              "onCreate",
              trigger.as_ref(),
              watch_args("https://cb/1", json!({ "x": x })),
            )
            .await
        })
      })
      .collect();
    for handle in handles {
      handle.await.unwrap().unwrap();
    }

    let rows = store.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    let block_config = rows[0].decode().unwrap().block_config;
    assert!(block_config == json!({"x": 1}) || block_config == json!({"x": 2}));
  }
}

#[tokio::test]
async fn test_forget_skips_cleanup_body() {
  for store in stores().await {
    let lifecycle = TriggerLifecycle::new(store.clone());
    let trigger = RecordingTrigger::new(true);
    lifecycle
      .watch("p1", "onCreate", &trigger, watch_args("https://cb/1", json!({})))
      .await
      .unwrap();

    let key = TriggerKey::new("p1", "onCreate", "https://cb/1");
    assert!(lifecycle.forget(&key).await.unwrap());
    assert!(!lifecycle.forget(&key).await.unwrap());
    assert_eq!(trigger.cleanup_calls(), 0);
    assert!(lifecycle.list().await.unwrap().is_empty());
  }
}
