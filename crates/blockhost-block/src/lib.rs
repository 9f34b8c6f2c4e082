//! Blockhost Block
//!
//! This crate defines the contract between plugin code and the blockhost
//! runtime. A plugin bundles named actions and triggers; each of them can
//! derive and render its configuration, render its signature and execute.
//! Triggers additionally watch and clean up registrations with an external
//! event source.
//!
//! Execution results are described by [`Completion`], an explicit tagged
//! variant:
//! - [`Completion::Immediate`] for bodies that already produced a value
//! - [`Completion::Deferred`] for bodies that resolve after suspending
//! - [`Completion::Incremental`] for bodies that yield [`Step`]s

mod args;
mod completion;
mod definition;
mod error;
mod manifest;

pub use args::{
  ActionDeriveArgs, ActionExecuteArgs, CleanupArgs, DeriveConfigArgs, InboundRequest,
  RenderConfigSchemaArgs, RenderSchemaArgs, RenderSignatureArgs, TriggerDeriveArgs,
  TriggerExecuteArgs, WatchArgs,
};
pub use completion::{Completion, Step, StepStream};
pub use definition::{Action, ActionMap, Plugin, Trigger, TriggerMap};
pub use error::BlockError;
pub use manifest::{
  ActionManifest, ActionSignature, DerivedBlockConfig, DerivedPluginConfig, PluginManifest,
  SchemaGroup, TriggerManifest, TriggerSignature,
};
