//! The traits plugin authors implement.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::args::{
  ActionDeriveArgs, ActionExecuteArgs, CleanupArgs, DeriveConfigArgs, RenderConfigSchemaArgs,
  RenderSchemaArgs, RenderSignatureArgs, TriggerDeriveArgs, TriggerExecuteArgs, WatchArgs,
};
use crate::completion::Completion;
use crate::error::BlockError;
use crate::manifest::{
  ActionManifest, ActionSignature, DerivedBlockConfig, DerivedPluginConfig, PluginManifest,
  TriggerManifest, TriggerSignature,
};

/// Actions of a plugin, keyed by name.
pub type ActionMap = BTreeMap<String, Arc<dyn Action>>;

/// Triggers of a plugin, keyed by name.
pub type TriggerMap = BTreeMap<String, Arc<dyn Trigger>>;

/// A unit of plugin logic invoked on demand.
#[async_trait]
pub trait Action: Send + Sync {
  fn manifest(&self) -> &ActionManifest;

  async fn derive_block_config(
    &self,
    args: ActionDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError>;

  async fn render_block_config_schema(
    &self,
    args: RenderSchemaArgs,
  ) -> Result<serde_json::Value, BlockError>;

  async fn render_block_signature(
    &self,
    args: RenderSignatureArgs,
  ) -> Result<ActionSignature, BlockError>;

  /// Start the action body.
  ///
  /// Called exactly once per invocation. The returned [`Completion`] tells
  /// the executor how to collect the result.
  fn execute_block(&self, args: ActionExecuteArgs) -> Completion;
}

/// A unit of plugin logic fired by an external event source.
#[async_trait]
pub trait Trigger: Send + Sync {
  fn manifest(&self) -> &TriggerManifest;

  async fn derive_block_config(
    &self,
    args: TriggerDeriveArgs,
  ) -> Result<DerivedBlockConfig, BlockError>;

  async fn render_block_config_schema(
    &self,
    args: RenderSchemaArgs,
  ) -> Result<serde_json::Value, BlockError>;

  async fn render_block_signature(
    &self,
    args: RenderSignatureArgs,
  ) -> Result<TriggerSignature, BlockError>;

  /// Register the endpoint with the event source.
  ///
  /// Returns data that must be handed back to [`Trigger::cleanup_block`] to
  /// undo the registration, or `None` if there is nothing to remember.
  async fn watch_block(&self, args: WatchArgs) -> Result<Option<serde_json::Value>, BlockError>;

  /// Undo a registration made by [`Trigger::watch_block`].
  async fn cleanup_block(&self, args: CleanupArgs) -> Result<(), BlockError>;

  /// Handle an event delivered to the watched endpoint.
  fn execute_block(&self, args: TriggerExecuteArgs) -> Completion;
}

/// A named collection of actions and triggers sharing one configuration.
#[async_trait]
pub trait Plugin: Send + Sync {
  fn manifest(&self) -> &PluginManifest;

  /// Translations keyed by locale.
  fn translations(&self) -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
  }

  async fn derive_config(&self, args: DeriveConfigArgs)
  -> Result<DerivedPluginConfig, BlockError>;

  async fn render_config_schema(
    &self,
    args: RenderConfigSchemaArgs,
  ) -> Result<serde_json::Value, BlockError>;

  /// Release whatever the plugin holds for a configuration that is no longer
  /// used.
  async fn cleanup_config(&self, _config: serde_json::Value) -> Result<(), BlockError> {
    Ok(())
  }

  fn actions(&self) -> ActionMap;

  fn triggers(&self) -> TriggerMap;
}
