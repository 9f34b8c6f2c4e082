//! Actions of the echo plugin, one per completion mode.

use std::time::Duration;

use async_trait::async_trait;
use blockhost_block::{
  Action, ActionDeriveArgs, ActionExecuteArgs, ActionManifest, ActionSignature, BlockError,
  Completion, DerivedBlockConfig, RenderSchemaArgs, RenderSignatureArgs, Step,
};
use futures::stream;
use serde_json::{Value, json};

use crate::schema::{group, integer, pick_bool, pick_str, string};

/// Longest sleep the delay action accepts.
pub const MAX_DELAY_MS: u64 = 10_000;

/// Highest starting point the countdown action accepts.
pub const MAX_COUNTDOWN: u64 = 100;

fn manifest(title: &str, description: &str, needs_plugin_config: bool) -> ActionManifest {
  ActionManifest {
    title: title.to_string(),
    color: "#5b8def".to_string(),
    icon_url: String::new(),
    description: description.to_string(),
    has_lifecycle: false,
    needs_plugin_config,
  }
}

fn plain_block_config() -> DerivedBlockConfig {
  DerivedBlockConfig {
    valid: true,
    block_config: json!({}),
    render_props: json!({}),
  }
}

/// Echoes `params.text` back, prefixed with the plugin's prefix.
pub struct EchoAction {
  manifest: ActionManifest,
}

impl EchoAction {
  pub fn new() -> Self {
    Self {
      manifest: manifest("Echo", "Returns the text it was given", true),
    }
  }
}

impl Default for EchoAction {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Action for EchoAction {
  fn manifest(&self) -> &ActionManifest {
    &self.manifest
  }

  async fn derive_block_config(
    &self,
    args: ActionDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError> {
    let uppercase =
      pick_bool("uppercase", &[args.form.as_ref(), args.block_config.as_ref()]).unwrap_or(false);
    let valid = pick_str("prefix", &[args.plugin_config.as_ref()]).is_some();

    Ok(DerivedBlockConfig {
      valid,
      block_config: json!({ "uppercase": uppercase }),
      render_props: json!({}),
    })
  }

  async fn render_block_config_schema(&self, args: RenderSchemaArgs) -> Result<Value, BlockError> {
    Ok(json!({
      "type": "object",
      "properties": {
        "uppercase": {
          "type": "boolean",
          "title": "Uppercase",
          "default": args.block_config["uppercase"],
        },
      },
    }))
  }

  async fn render_block_signature(
    &self,
    _args: RenderSignatureArgs,
  ) -> Result<ActionSignature, BlockError> {
    Ok(ActionSignature {
      inputs: vec!["run".to_string()],
      outputs: vec!["done".to_string()],
      params: group(&[("text", string("Text"))]),
      returns: group(&[("text", string("Text"))]),
    })
  }

  fn execute_block(&self, args: ActionExecuteArgs) -> Completion {
    let Some(text) = args.params.get("text").and_then(Value::as_str) else {
      return Completion::failed(BlockError::invalid_input("params.text must be a string"));
    };

    let prefix = pick_str("prefix", &[args.plugin_config.as_ref()]).unwrap_or_default();
    let mut text = format!("{}{}", prefix, text);
    if args.block_config["uppercase"].as_bool().unwrap_or(false) {
      text = text.to_uppercase();
    }

    Completion::immediate(json!({ "text": text }))
  }
}

/// Sleeps for `params.ms` milliseconds, then reports how long it slept.
pub struct DelayAction {
  manifest: ActionManifest,
}

impl DelayAction {
  pub fn new() -> Self {
    Self {
      manifest: manifest("Delay", "Waits before finishing", false),
    }
  }
}

impl Default for DelayAction {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Action for DelayAction {
  fn manifest(&self) -> &ActionManifest {
    &self.manifest
  }

  async fn derive_block_config(
    &self,
    _args: ActionDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError> {
    Ok(plain_block_config())
  }

  async fn render_block_config_schema(&self, _args: RenderSchemaArgs) -> Result<Value, BlockError> {
    Ok(json!({ "type": "object", "properties": {} }))
  }

  async fn render_block_signature(
    &self,
    _args: RenderSignatureArgs,
  ) -> Result<ActionSignature, BlockError> {
    Ok(ActionSignature {
      inputs: vec!["run".to_string()],
      outputs: vec!["done".to_string()],
      params: group(&[("ms", integer("Milliseconds"))]),
      returns: group(&[("sleptMs", integer("Slept for"))]),
    })
  }

  fn execute_block(&self, args: ActionExecuteArgs) -> Completion {
    let ms = match args.params.get("ms") {
      None | Some(Value::Null) => 0,
      Some(value) => match value.as_u64() {
        Some(ms) if ms <= MAX_DELAY_MS => ms,
        _ => {
          return Completion::failed(BlockError::invalid_input(format!(
            "params.ms must be an integer between 0 and {}",
            MAX_DELAY_MS
          )));
        }
      },
    };

    Completion::deferred(async move {
      tokio::time::sleep(Duration::from_millis(ms)).await;
      Ok(json!({ "sleptMs": ms }))
    })
  }
}

/// Counts down from `params.from`, yielding each step, then lifts off.
///
/// `params.failAt` makes the body fail when it reaches that number and
/// `params.intervalMs` spaces the steps out.
pub struct CountdownAction {
  manifest: ActionManifest,
}

impl CountdownAction {
  pub fn new() -> Self {
    Self {
      manifest: manifest("Countdown", "Reports every step of a countdown", false),
    }
  }
}

impl Default for CountdownAction {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Action for CountdownAction {
  fn manifest(&self) -> &ActionManifest {
    &self.manifest
  }

  async fn derive_block_config(
    &self,
    _args: ActionDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError> {
    Ok(plain_block_config())
  }

  async fn render_block_config_schema(&self, _args: RenderSchemaArgs) -> Result<Value, BlockError> {
    Ok(json!({ "type": "object", "properties": {} }))
  }

  async fn render_block_signature(
    &self,
    _args: RenderSignatureArgs,
  ) -> Result<ActionSignature, BlockError> {
    Ok(ActionSignature {
      inputs: vec!["start".to_string()],
      outputs: vec!["tick".to_string(), "liftoff".to_string()],
      params: group(&[
        ("from", integer("Start from")),
        ("failAt", integer("Fail at")),
        ("intervalMs", integer("Interval")),
      ]),
      returns: group(&[("remaining", integer("Remaining"))]),
    })
  }

  fn execute_block(&self, args: ActionExecuteArgs) -> Completion {
    let from = args.params.get("from").and_then(Value::as_u64).unwrap_or(3);
    if from > MAX_COUNTDOWN {
      return Completion::failed(BlockError::invalid_input(format!(
        "params.from must not exceed {}",
        MAX_COUNTDOWN
      )));
    }
    let fail_at = args.params.get("failAt").and_then(Value::as_u64);
    let interval = args
      .params
      .get("intervalMs")
      .and_then(Value::as_u64)
      .unwrap_or(0)
      .min(MAX_DELAY_MS);

    let steps = stream::unfold(Some(from), move |state| async move {
      let remaining = state?;
      if interval > 0 {
        tokio::time::sleep(Duration::from_millis(interval)).await;
      }

      if remaining == 0 {
        return Some((Ok(Step::Return(Some(json!({ "liftoff": true })))), None));
      }
      if fail_at == Some(remaining) {
        let error = BlockError::failed(format!("countdown aborted at {}", remaining));
        return Some((Err(error), None));
      }
      Some((
        Ok(Step::Yield(json!({ "remaining": remaining }))),
        Some(remaining - 1),
      ))
    });

    Completion::incremental(steps)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;

  fn execute_args(params: Value, plugin_config: Option<Value>) -> ActionExecuteArgs {
    ActionExecuteArgs {
      params,
      block_config: json!({ "uppercase": false }),
      plugin_config,
    }
  }

  #[tokio::test]
  async fn test_echo_applies_prefix() {
    let completion = EchoAction::new().execute_block(execute_args(
      json!({"text": "hi"}),
      Some(json!({"prefix": "> "})),
    ));

    let Completion::Immediate(result) = completion else {
      panic!("expected immediate completion");
    };
    assert_eq!(result.unwrap(), json!({"text": "> hi"}));
  }

  #[tokio::test]
  async fn test_echo_requires_text() {
    let completion = EchoAction::new().execute_block(execute_args(json!({}), None));
    let Completion::Immediate(result) = completion else {
      panic!("expected immediate completion");
    };
    assert_eq!(result.unwrap_err().status_code(), 400);
  }

  #[tokio::test]
  async fn test_echo_validity_follows_plugin_config() {
    let action = EchoAction::new();
    let without = action
      .derive_block_config(ActionDeriveArgs::default())
      .await
      .unwrap();
    let with = action
      .derive_block_config(ActionDeriveArgs {
        form: Some(json!({"uppercase": true})),
        plugin_config: Some(json!({"prefix": ""})),
        ..Default::default()
      })
      .await
      .unwrap();

    assert!(!without.valid);
    assert!(with.valid);
    assert_eq!(with.block_config, json!({"uppercase": true}));
  }

  #[tokio::test]
  async fn test_delay_is_deferred() {
    let completion = DelayAction::new().execute_block(execute_args(json!({"ms": 1}), None));
    let Completion::Deferred(body) = completion else {
      panic!("expected deferred completion");
    };
    assert_eq!(body.await.unwrap(), json!({"sleptMs": 1}));
  }

  #[tokio::test]
  async fn test_delay_rejects_long_sleeps() {
    let completion =
      DelayAction::new().execute_block(execute_args(json!({"ms": MAX_DELAY_MS + 1}), None));
    assert_eq!(completion.mode(), "immediate");
  }

  #[tokio::test]
  async fn test_countdown_steps() {
    let completion = CountdownAction::new().execute_block(execute_args(json!({"from": 2}), None));
    let Completion::Incremental(steps) = completion else {
      panic!("expected incremental completion");
    };

    let steps: Vec<_> = steps.collect().await;
    assert_eq!(
      steps,
      vec![
        Ok(Step::Yield(json!({"remaining": 2}))),
        Ok(Step::Yield(json!({"remaining": 1}))),
        Ok(Step::Return(Some(json!({"liftoff": true})))),
      ]
    );
  }

  #[tokio::test]
  async fn test_countdown_fails_at_requested_step() {
    let completion = CountdownAction::new()
      .execute_block(execute_args(json!({"from": 3, "failAt": 2}), None));
    let Completion::Incremental(steps) = completion else {
      panic!("expected incremental completion");
    };

    let steps: Vec<_> = steps.collect().await;
    assert_eq!(steps.len(), 2);
    assert_eq!(
      steps[1],
      Err(BlockError::failed("countdown aborted at 2"))
    );
  }
}
