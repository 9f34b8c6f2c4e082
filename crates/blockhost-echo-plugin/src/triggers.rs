//! Triggers of the echo plugin.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use blockhost_block::{
  BlockError, CleanupArgs, Completion, DerivedBlockConfig, RenderSchemaArgs, RenderSignatureArgs,
  Step, Trigger, TriggerDeriveArgs, TriggerExecuteArgs, TriggerManifest, TriggerSignature,
  WatchArgs,
};
use futures::{StreamExt, stream};
use serde_json::{Value, json};
use tracing::debug;

use crate::schema::{group, pick_str, string};

/// Event name that matches every delivery.
const ANY_EVENT: &str = "any";

fn manifest(
  title: &str,
  description: &str,
  remember: bool,
  needs_plugin_config: bool,
) -> TriggerManifest {
  TriggerManifest {
    title: title.to_string(),
    color: "#e0823d".to_string(),
    icon_url: String::new(),
    description: description.to_string(),
    remember_trigger: remember,
    needs_plugin_config,
  }
}

/// A webhook subscription that survives restarts.
///
/// Watching subscribes the endpoint in an in-process registry standing in
/// for an external event source; cleanup unsubscribes it by id.
pub struct WebhookTrigger {
  manifest: TriggerManifest,
  next_id: AtomicU64,
  /// Endpoint to subscription id.
  subscriptions: Mutex<BTreeMap<String, String>>,
}

impl WebhookTrigger {
  pub fn new() -> Self {
    Self {
      manifest: manifest("Webhook", "Fires when the webhook is called", true, true),
      next_id: AtomicU64::new(1),
      subscriptions: Mutex::new(BTreeMap::new()),
    }
  }

  /// Endpoints currently subscribed.
  pub fn active_endpoints(&self) -> Vec<String> {
    self
      .subscriptions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect()
  }
}

impl Default for WebhookTrigger {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Trigger for WebhookTrigger {
  fn manifest(&self) -> &TriggerManifest {
    &self.manifest
  }

  async fn derive_block_config(
    &self,
    args: TriggerDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError> {
    let event =
      pick_str("event", &[args.form.as_ref(), args.block_config.as_ref()]).unwrap_or(ANY_EVENT);
    let valid = pick_str("prefix", &[args.plugin_config.as_ref()]).is_some();

    Ok(DerivedBlockConfig {
      valid,
      block_config: json!({ "event": event }),
      render_props: json!({ "endpoint": args.endpoint }),
    })
  }

  async fn render_block_config_schema(&self, args: RenderSchemaArgs) -> Result<Value, BlockError> {
    let endpoint = args.render_props["endpoint"].as_str().unwrap_or_default();
    Ok(json!({
      "type": "object",
      "description": format!("Deliveries to {}", endpoint),
      "properties": {
        "event": { "type": "string", "title": "Event", "default": ANY_EVENT },
      },
    }))
  }

  async fn render_block_signature(
    &self,
    _args: RenderSignatureArgs,
  ) -> Result<TriggerSignature, BlockError> {
    Ok(TriggerSignature {
      outputs: vec!["received".to_string()],
      returns: group(&[
        ("event", string("Event")),
        ("body", json!({ "type": "object", "title": "Body" })),
      ]),
    })
  }

  async fn watch_block(&self, args: WatchArgs) -> Result<Option<Value>, BlockError> {
    if !(args.endpoint.starts_with("http://") || args.endpoint.starts_with("https://")) {
      return Err(BlockError::invalid_input(format!(
        "endpoint '{}' is not an http(s) url",
        args.endpoint
      )));
    }

    let previous = args
      .cleanup_data
      .as_ref()
      .and_then(|data| data.get("subscriptionId"))
      .and_then(Value::as_str)
      .map(str::to_string);
    let id = previous
      .unwrap_or_else(|| format!("sub-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));

    self
      .subscriptions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(args.endpoint.clone(), id.clone());
    debug!(endpoint = %args.endpoint, subscription = %id, "webhook subscribed");

    Ok(Some(json!({ "subscriptionId": id })))
  }

  async fn cleanup_block(&self, args: CleanupArgs) -> Result<(), BlockError> {
    let Some(id) = args.cleanup_data.get("subscriptionId").and_then(Value::as_str) else {
      return Err(BlockError::invalid_input("cleanupData.subscriptionId is missing"));
    };

    self
      .subscriptions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .retain(|_, subscription| subscription.as_str() != id);
    debug!(subscription = %id, "webhook unsubscribed");
    Ok(())
  }

  fn execute_block(&self, args: TriggerExecuteArgs) -> Completion {
    let body = match args.request.json() {
      Ok(body) => body,
      Err(e) => {
        return Completion::failed(BlockError::invalid_input(format!("invalid json body: {}", e)));
      }
    };

    let wanted = args.block_config["event"].as_str().unwrap_or(ANY_EVENT);
    let event = body.get("event").and_then(Value::as_str).unwrap_or(ANY_EVENT);
    if wanted != ANY_EVENT && wanted != event {
      return Completion::failed(BlockError::invalid_input(format!(
        "expected event '{}', got '{}'",
        wanted, event
      )));
    }

    Completion::immediate(json!({
      "outputId": "received",
      "values": { "event": event, "body": body },
    }))
  }
}

/// A trigger fired by hand, with nothing to subscribe.
///
/// Every non-empty line of the delivered body is reported as it is read.
pub struct ManualTrigger {
  manifest: TriggerManifest,
}

impl ManualTrigger {
  pub fn new() -> Self {
    Self {
      manifest: manifest("Manual", "Fires when called directly", false, false),
    }
  }
}

impl Default for ManualTrigger {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Trigger for ManualTrigger {
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
    Ok(json!({ "type": "object", "properties": {} }))
  }

  async fn render_block_signature(
    &self,
    _args: RenderSignatureArgs,
  ) -> Result<TriggerSignature, BlockError> {
    Ok(TriggerSignature {
      outputs: vec!["line".to_string()],
      returns: group(&[("line", string("Line"))]),
    })
  }

  async fn watch_block(&self, _args: WatchArgs) -> Result<Option<Value>, BlockError> {
    Ok(None)
  }

  async fn cleanup_block(&self, _args: CleanupArgs) -> Result<(), BlockError> {
    Ok(())
  }

  fn execute_block(&self, args: TriggerExecuteArgs) -> Completion {
    let lines: Vec<String> = args
      .request
      .text()
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();
    let count = lines.len();

    let steps = stream::iter(lines)
      .map(|line| Ok(Step::Yield(json!({ "line": line }))))
      .chain(stream::once(async move {
        Ok(Step::Return(Some(json!({ "lines": count }))))
      }));
    Completion::incremental(steps)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use blockhost_block::InboundRequest;

  fn watch_args(endpoint: &str, cleanup_data: Option<Value>) -> WatchArgs {
    WatchArgs {
      endpoint: endpoint.to_string(),
      block_config: json!({ "event": "any" }),
      cleanup_data,
      plugin_config: None,
    }
  }

  #[tokio::test]
  async fn test_watch_then_cleanup() {
    let trigger = WebhookTrigger::new();
    let data = trigger
      .watch_block(watch_args("https://cb/1", None))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(trigger.active_endpoints(), vec!["https://cb/1"]);

    trigger
      .cleanup_block(CleanupArgs {
        block_config: json!({}),
        cleanup_data: data,
        plugin_config: None,
      })
      .await
      .unwrap();
    assert!(trigger.active_endpoints().is_empty());
  }

  #[tokio::test]
  async fn test_rewatch_reuses_subscription() {
    let trigger = WebhookTrigger::new();
    let first = trigger
      .watch_block(watch_args("https://cb/1", None))
      .await
      .unwrap();
    let second = trigger
      .watch_block(watch_args("https://cb/1", first.clone()))
      .await
      .unwrap();
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn test_watch_rejects_non_http_endpoint() {
    let trigger = WebhookTrigger::new();
    let result = trigger.watch_block(watch_args("ftp://cb/1", None)).await;
    assert_eq!(result.unwrap_err().status_code(), 400);
  }

  #[tokio::test]
  async fn test_execute_filters_events() {
    let trigger = WebhookTrigger::new();
    let args = |body: &str| TriggerExecuteArgs {
      request: InboundRequest {
        method: "POST".to_string(),
        body: body.as_bytes().to_vec(),
        ..Default::default()
      },
      block_config: json!({ "event": "created" }),
      plugin_config: None,
    };

    assert_eq!(trigger.execute_block(args(r#"{"event": "created"}"#)).mode(), "immediate");
    let Completion::Immediate(result) = trigger.execute_block(args(r#"{"event": "deleted"}"#))
    else {
      panic!("expected immediate completion");
    };
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_manual_reports_each_line() {
    let completion = ManualTrigger::new().execute_block(TriggerExecuteArgs {
      request: InboundRequest {
        body: b"one\n\ntwo\n".to_vec(),
        ..Default::default()
      },
      block_config: json!({}),
      plugin_config: None,
    });
    let Completion::Incremental(steps) = completion else {
      panic!("expected incremental completion");
    };

    let steps: Vec<_> = steps.collect().await;
    assert_eq!(
      steps,
      vec![
        Ok(Step::Yield(json!({"line": "one"}))),
        Ok(Step::Yield(json!({"line": "two"}))),
        Ok(Step::Return(Some(json!({"lines": 2})))),
      ]
    );
  }
}
