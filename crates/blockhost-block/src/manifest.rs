use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity and presentation of a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
  /// Stable identifier. Used as the route prefix and as the `plugin` column
  /// of stored triggers.
  pub uid: String,
  pub title: String,
  pub color: String,
  pub icon_url: String,
  pub description: String,
}

/// Presentation and capabilities of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionManifest {
  pub title: String,
  pub color: String,
  pub icon_url: String,
  pub description: String,
  pub has_lifecycle: bool,
  /// Whether the action's hooks receive the plugin configuration.
  pub needs_plugin_config: bool,
}

/// Presentation and capabilities of a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerManifest {
  pub title: String,
  pub color: String,
  pub icon_url: String,
  pub description: String,
  /// Whether watches of this trigger are persisted and replayed at startup.
  pub remember_trigger: bool,
  /// Whether the trigger's hooks receive the plugin configuration.
  pub needs_plugin_config: bool,
}

/// An ordered set of named JSON schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaGroup {
  pub order: Vec<String>,
  pub values: BTreeMap<String, serde_json::Value>,
}

/// Inputs, outputs, params and returns of an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSignature {
  pub inputs: Vec<String>,
  pub outputs: Vec<String>,
  pub params: SchemaGroup,
  pub returns: SchemaGroup,
}

/// Outputs and returns of a trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerSignature {
  pub outputs: Vec<String>,
  pub returns: SchemaGroup,
}

/// Result of deriving a block configuration from a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedBlockConfig {
  pub valid: bool,
  pub block_config: serde_json::Value,
  pub render_props: serde_json::Value,
}

/// Result of deriving a plugin configuration from a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedPluginConfig {
  pub config: serde_json::Value,
  pub render_props: serde_json::Value,
}
