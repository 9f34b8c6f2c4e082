//! Plugin runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use blockhost_block::{
  Action, ActionDeriveArgs, ActionExecuteArgs, ActionMap, ActionSignature, CleanupArgs,
  DeriveConfigArgs, Plugin, PluginManifest, RenderConfigSchemaArgs, RenderSchemaArgs,
  RenderSignatureArgs, Trigger, TriggerDeriveArgs, TriggerExecuteArgs, TriggerMap,
  TriggerSignature, WatchArgs,
};
use blockhost_executor::{BlockExecutor, ResultStream};
use blockhost_lifecycle::{ReplayReport, TriggerLifecycle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::RuntimeError;
use crate::types::{
  ActionDescription, BestConfig, BlockSchema, ConfigSchema, PluginDescription, TriggerDescription,
};

/// Endpoint passed to trigger config derivation while ranking plugin configs.
pub const BEST_CONFIG_ENDPOINT: &str = "BEST_CONFIG";

/// Keep `plugin_config` only for blocks that declare they need it.
fn gate(needs_plugin_config: bool, plugin_config: Option<serde_json::Value>) -> Option<serde_json::Value> {
  if needs_plugin_config { plugin_config } else { None }
}

/// Hosts one plugin and dispatches every inbound operation to its blocks.
///
/// Execution goes through the [`BlockExecutor`]; watch, cleanup and replay
/// go through the shared [`TriggerLifecycle`].
pub struct PluginRuntime {
  plugin: Arc<dyn Plugin>,
  actions: ActionMap,
  triggers: TriggerMap,
  executor: BlockExecutor,
  lifecycle: Arc<TriggerLifecycle>,
}

impl PluginRuntime {
  /// Create a runtime for `plugin`.
  ///
  /// The plugin's action and trigger tables are read once here.
  pub fn new(plugin: Arc<dyn Plugin>, lifecycle: Arc<TriggerLifecycle>) -> Self {
    let actions = plugin.actions();
    let triggers = plugin.triggers();
    Self {
      plugin,
      actions,
      triggers,
      executor: BlockExecutor::new(),
      lifecycle,
    }
  }

  pub fn uid(&self) -> &str {
    &self.plugin.manifest().uid
  }

  pub fn manifest(&self) -> &PluginManifest {
    self.plugin.manifest()
  }

  pub fn actions(&self) -> &ActionMap {
    &self.actions
  }

  pub fn triggers(&self) -> &TriggerMap {
    &self.triggers
  }

  /// Look up an action by name.
  pub fn action(&self, name: &str) -> Result<&Arc<dyn Action>, RuntimeError> {
    self.actions.get(name).ok_or_else(|| RuntimeError::UnknownAction {
      plugin: self.uid().to_string(),
      name: name.to_string(),
    })
  }

  /// Look up a trigger by name.
  pub fn trigger(&self, name: &str) -> Result<&Arc<dyn Trigger>, RuntimeError> {
    self.triggers.get(name).ok_or_else(|| RuntimeError::UnknownTrigger {
      plugin: self.uid().to_string(),
      name: name.to_string(),
    })
  }

  /// Describe the plugin and the signature of every block.
  ///
  /// Signatures are rendered from the block config each block derives under
  /// the plugin's default config.
  #[instrument(skip(self), fields(plugin = %self.uid()))]
  pub async fn describe(&self) -> Result<PluginDescription, RuntimeError> {
    let plugin_config = self
      .plugin
      .derive_config(DeriveConfigArgs::default())
      .await?
      .config;

    let mut actions = BTreeMap::new();
    for (name, action) in &self.actions {
      let manifest = action.manifest().clone();
      let plugin_config = gate(manifest.needs_plugin_config, Some(plugin_config.clone()));
      let derived = action
        .derive_block_config(ActionDeriveArgs {
          plugin_config: plugin_config.clone(),
          ..Default::default()
        })
        .await?;
      let signature = action
        .render_block_signature(RenderSignatureArgs {
          params: None,
          block_config: derived.block_config,
          plugin_config,
        })
        .await?;
      actions.insert(name.clone(), ActionDescription { manifest, signature });
    }

    let mut triggers = BTreeMap::new();
    for (name, trigger) in &self.triggers {
      let manifest = trigger.manifest().clone();
      let plugin_config = gate(manifest.needs_plugin_config, Some(plugin_config.clone()));
      let derived = trigger
        .derive_block_config(TriggerDeriveArgs {
          plugin_config: plugin_config.clone(),
          ..Default::default()
        })
        .await?;
      let signature = trigger
        .render_block_signature(RenderSignatureArgs {
          params: None,
          block_config: derived.block_config,
          plugin_config,
        })
        .await?;
      triggers.insert(name.clone(), TriggerDescription { manifest, signature });
    }

    Ok(PluginDescription {
      manifest: self.manifest().clone(),
      translations: self.plugin.translations(),
      actions,
      triggers,
    })
  }

  /// Derive a plugin config from a form and render its schema.
  #[instrument(skip_all, fields(plugin = %self.uid()))]
  pub async fn config_schema(&self, args: DeriveConfigArgs) -> Result<ConfigSchema, RuntimeError> {
    let derived = self.plugin.derive_config(args).await?;
    let config_schema = self
      .plugin
      .render_config_schema(RenderConfigSchemaArgs {
        config: derived.config.clone(),
        render_props: derived.render_props,
      })
      .await?;

    Ok(ConfigSchema {
      config: derived.config,
      config_schema,
    })
  }

  /// Release whatever the plugin holds for a config that is no longer used.
  #[instrument(skip_all, fields(plugin = %self.uid()))]
  pub async fn cleanup_config(&self, config: serde_json::Value) -> Result<(), RuntimeError> {
    self.plugin.cleanup_config(config).await?;
    info!("plugin config cleaned up");
    Ok(())
  }

  /// Pick the first candidate plugin config the action derives a valid block
  /// config with, falling back to the first candidate.
  ///
  /// Candidates are tried in the order the caller listed them, and each one
  /// reaches the action even when its manifest opts out of plugin config.
  #[instrument(skip(self, plugin_configs), fields(plugin = %self.uid()))]
  pub async fn action_best_config(
    &self,
    name: &str,
    plugin_configs: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<BestConfig, RuntimeError> {
    let action = self.action(name)?;
    for (uid, plugin_config) in plugin_configs {
      let derived = action
        .derive_block_config(ActionDeriveArgs {
          plugin_config: Some(plugin_config.clone()),
          ..Default::default()
        })
        .await?;
      if derived.valid {
        debug!(uid = %uid, "valid plugin config found");
        return Ok(BestConfig {
          best_config_uid: Some(uid.clone()),
        });
      }
    }

    Ok(BestConfig {
      best_config_uid: plugin_configs.keys().next().cloned(),
    })
  }

  /// Derive an action's block config and render its schema.
  #[instrument(skip(self, args), fields(plugin = %self.uid()))]
  pub async fn action_block_schema(
    &self,
    name: &str,
    mut args: ActionDeriveArgs,
  ) -> Result<BlockSchema, RuntimeError> {
    let action = self.action(name)?;
    let needs_plugin_config = action.manifest().needs_plugin_config;
    args.plugin_config = gate(needs_plugin_config, args.plugin_config);
    let plugin_config = args.plugin_config.clone();

    let derived = action.derive_block_config(args).await?;
    let block_config_schema = action
      .render_block_config_schema(RenderSchemaArgs {
        render_props: derived.render_props,
        block_config: derived.block_config.clone(),
        plugin_config,
      })
      .await?;

    Ok(BlockSchema {
      valid: derived.valid,
      block_config: derived.block_config,
      block_config_schema,
      needs_plugin_config,
    })
  }

  /// Render an action's signature for a block config.
  #[instrument(skip(self, args), fields(plugin = %self.uid()))]
  pub async fn action_block_signature(
    &self,
    name: &str,
    mut args: RenderSignatureArgs,
  ) -> Result<ActionSignature, RuntimeError> {
    let action = self.action(name)?;
    args.plugin_config = gate(action.manifest().needs_plugin_config, args.plugin_config);
    Ok(action.render_block_signature(args).await?)
  }

  /// Run an action. The body's results arrive on the returned stream.
  pub fn execute_action(
    &self,
    name: &str,
    mut args: ActionExecuteArgs,
    cancel: CancellationToken,
  ) -> Result<ResultStream, RuntimeError> {
    let action = self.action(name)?;
    args.plugin_config = gate(action.manifest().needs_plugin_config, args.plugin_config);
    Ok(self.executor.execute_action(name, action.as_ref(), args, cancel)?)
  }

  /// Trigger counterpart of [`PluginRuntime::action_best_config`].
  ///
  /// Block configs are derived against [`BEST_CONFIG_ENDPOINT`].
  #[instrument(skip(self, plugin_configs), fields(plugin = %self.uid()))]
  pub async fn trigger_best_config(
    &self,
    name: &str,
    plugin_configs: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<BestConfig, RuntimeError> {
    let trigger = self.trigger(name)?;
    for (uid, plugin_config) in plugin_configs {
      let derived = trigger
        .derive_block_config(TriggerDeriveArgs {
          endpoint: BEST_CONFIG_ENDPOINT.to_string(),
          plugin_config: Some(plugin_config.clone()),
          ..Default::default()
        })
        .await?;
      if derived.valid {
        debug!(uid = %uid, "valid plugin config found");
        return Ok(BestConfig {
          best_config_uid: Some(uid.clone()),
        });
      }
    }

    Ok(BestConfig {
      best_config_uid: plugin_configs.keys().next().cloned(),
    })
  }

  /// Derive a trigger's block config and render its schema.
  #[instrument(skip(self, args), fields(plugin = %self.uid(), endpoint = %args.endpoint))]
  pub async fn trigger_block_schema(
    &self,
    name: &str,
    mut args: TriggerDeriveArgs,
  ) -> Result<BlockSchema, RuntimeError> {
    let trigger = self.trigger(name)?;
    let needs_plugin_config = trigger.manifest().needs_plugin_config;
    args.plugin_config = gate(needs_plugin_config, args.plugin_config);
    let plugin_config = args.plugin_config.clone();

    let derived = trigger.derive_block_config(args).await?;
    let block_config_schema = trigger
      .render_block_config_schema(RenderSchemaArgs {
        render_props: derived.render_props,
        block_config: derived.block_config.clone(),
        plugin_config,
      })
      .await?;

    Ok(BlockSchema {
      valid: derived.valid,
      block_config: derived.block_config,
      block_config_schema,
      needs_plugin_config,
    })
  }

  /// Render a trigger's signature for a block config.
  #[instrument(skip(self, args), fields(plugin = %self.uid()))]
  pub async fn trigger_block_signature(
    &self,
    name: &str,
    mut args: RenderSignatureArgs,
  ) -> Result<TriggerSignature, RuntimeError> {
    let trigger = self.trigger(name)?;
    args.plugin_config = gate(trigger.manifest().needs_plugin_config, args.plugin_config);
    Ok(trigger.render_block_signature(args).await?)
  }

  /// Run a trigger against an inbound event.
  pub fn execute_trigger(
    &self,
    name: &str,
    mut args: TriggerExecuteArgs,
    cancel: CancellationToken,
  ) -> Result<ResultStream, RuntimeError> {
    let trigger = self.trigger(name)?;
    args.plugin_config = gate(trigger.manifest().needs_plugin_config, args.plugin_config);
    Ok(self.executor.execute_trigger(name, trigger.as_ref(), args, cancel)?)
  }

  /// Watch a trigger endpoint, remembering it if the trigger asks for that.
  pub async fn watch(
    &self,
    name: &str,
    mut args: WatchArgs,
  ) -> Result<Option<serde_json::Value>, RuntimeError> {
    let trigger = self.trigger(name)?;
    args.plugin_config = gate(trigger.manifest().needs_plugin_config, args.plugin_config);
    Ok(
      self
        .lifecycle
        .watch(self.uid(), name, trigger.as_ref(), args)
        .await?,
    )
  }

  /// Clean up a watched trigger endpoint.
  ///
  /// Returns whether a stored record was removed.
  pub async fn cleanup(
    &self,
    name: &str,
    endpoint: Option<&str>,
    mut args: CleanupArgs,
  ) -> Result<bool, RuntimeError> {
    let trigger = self.trigger(name)?;
    args.plugin_config = gate(trigger.manifest().needs_plugin_config, args.plugin_config);
    Ok(
      self
        .lifecycle
        .cleanup(self.uid(), name, trigger.as_ref(), endpoint, args)
        .await?,
    )
  }

  /// Re-watch every remembered trigger of this plugin.
  pub async fn replay(&self, concurrency: usize) -> ReplayReport {
    self
      .lifecycle
      .replay(self.uid(), &self.triggers, concurrency)
      .await
  }
}
