use std::collections::BTreeMap;

use blockhost_block::{ActionManifest, ActionSignature, PluginManifest, TriggerManifest, TriggerSignature};
use serde::{Deserialize, Serialize};

/// Everything an orchestrator needs to list a plugin's blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescription {
  pub manifest: PluginManifest,
  pub translations: serde_json::Value,
  pub actions: BTreeMap<String, ActionDescription>,
  pub triggers: BTreeMap<String, TriggerDescription>,
}

/// An action's manifest and its signature under the default config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescription {
  pub manifest: ActionManifest,
  pub signature: ActionSignature,
}

/// A trigger's manifest and its signature under the default config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescription {
  pub manifest: TriggerManifest,
  pub signature: TriggerSignature,
}

/// A derived plugin configuration with the schema of its form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchema {
  pub config: serde_json::Value,
  pub config_schema: serde_json::Value,
}

/// A derived block configuration with the schema of its form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchema {
  pub valid: bool,
  pub block_config: serde_json::Value,
  pub block_config_schema: serde_json::Value,
  pub needs_plugin_config: bool,
}

/// The plugin config a block works best with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestConfig {
  /// `None` when no candidate configs were offered.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub best_config_uid: Option<String>,
}
