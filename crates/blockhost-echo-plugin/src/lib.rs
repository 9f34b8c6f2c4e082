//! Echo plugin.
//!
//! A small plugin covering every kind of block the host supports:
//!
//! | Block | Kind | Completion |
//! |---|---|---|
//! | `echo` | action | immediate, needs plugin config |
//! | `delay` | action | deferred |
//! | `countdown` | action | incremental |
//! | `webhook` | trigger | immediate, remembered |
//! | `manual` | trigger | incremental, not remembered |
//!
//! The plugin config is `{"prefix": "<text>"}`.

mod actions;
mod schema;
mod triggers;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use blockhost_block::{
  ActionMap, BlockError, DeriveConfigArgs, DerivedPluginConfig, Plugin, PluginManifest,
  RenderConfigSchemaArgs, TriggerMap,
};
use serde_json::{Value, json};

pub use actions::{CountdownAction, DelayAction, EchoAction, MAX_COUNTDOWN, MAX_DELAY_MS};
pub use triggers::{ManualTrigger, WebhookTrigger};

use crate::schema::pick_str;

/// Uid the echo plugin is mounted under.
pub const ECHO_PLUGIN_UID: &str = "echo";

pub struct EchoPlugin {
  manifest: PluginManifest,
  echo: Arc<EchoAction>,
  delay: Arc<DelayAction>,
  countdown: Arc<CountdownAction>,
  webhook: Arc<WebhookTrigger>,
  manual: Arc<ManualTrigger>,
}

impl EchoPlugin {
  pub fn new() -> Self {
    Self {
      manifest: PluginManifest {
        uid: ECHO_PLUGIN_UID.to_string(),
        title: "Echo".to_string(),
        color: "#5b8def".to_string(),
        icon_url: String::new(),
        description: "Blocks that hand back what they are given".to_string(),
      },
      echo: Arc::new(EchoAction::new()),
      delay: Arc::new(DelayAction::new()),
      countdown: Arc::new(CountdownAction::new()),
      webhook: Arc::new(WebhookTrigger::new()),
      manual: Arc::new(ManualTrigger::new()),
    }
  }

  /// The webhook trigger, for inspecting its subscriptions.
  pub fn webhook(&self) -> &Arc<WebhookTrigger> {
    &self.webhook
  }
}

impl Default for EchoPlugin {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Plugin for EchoPlugin {
  fn manifest(&self) -> &PluginManifest {
    &self.manifest
  }

  fn translations(&self) -> Value {
    json!({
      "en": { "title": "Echo" },
      "de": { "title": "Echo" },
    })
  }

  async fn derive_config(&self, args: DeriveConfigArgs) -> Result<DerivedPluginConfig, BlockError> {
    let prefix = pick_str("prefix", &[args.form.as_ref(), args.config.as_ref()]).unwrap_or_default();
    Ok(DerivedPluginConfig {
      config: json!({ "prefix": prefix }),
      render_props: json!({}),
    })
  }

  async fn render_config_schema(&self, args: RenderConfigSchemaArgs) -> Result<Value, BlockError> {
    Ok(json!({
      "type": "object",
      "properties": {
        "prefix": {
          "type": "string",
          "title": "Prefix",
          "default": args.config["prefix"],
        },
      },
    }))
  }

  fn actions(&self) -> ActionMap {
    let mut actions: ActionMap = BTreeMap::new();
    actions.insert("echo".to_string(), self.echo.clone());
    actions.insert("delay".to_string(), self.delay.clone());
    actions.insert("countdown".to_string(), self.countdown.clone());
    actions
  }

  fn triggers(&self) -> TriggerMap {
    let mut triggers: TriggerMap = BTreeMap::new();
    triggers.insert("webhook".to_string(), self.webhook.clone());
    triggers.insert("manual".to_string(), self.manual.clone());
    triggers
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_derive_config_prefers_form() {
    let plugin = EchoPlugin::new();
    let derived = plugin
      .derive_config(DeriveConfigArgs {
        form: Some(json!({"prefix": "form: "})),
        config: Some(json!({"prefix": "old: "})),
      })
      .await
      .unwrap();
    assert_eq!(derived.config, json!({"prefix": "form: "}));

    let default = plugin.derive_config(DeriveConfigArgs::default()).await.unwrap();
    assert_eq!(default.config, json!({"prefix": ""}));
  }

  #[test]
  fn test_block_tables() {
    let plugin = EchoPlugin::new();
    assert_eq!(
      plugin.actions().keys().collect::<Vec<_>>(),
      vec!["countdown", "delay", "echo"]
    );
    assert!(plugin.triggers()["webhook"].manifest().remember_trigger);
    assert!(!plugin.triggers()["manual"].manifest().remember_trigger);
  }
}
