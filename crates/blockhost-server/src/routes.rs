//! Route table of a hosted plugin.
//!
//! ```text
//! GET    /                                 describe the plugin
//! POST   /configSchema                     derive plugin config, render schema
//! DELETE /cleanup                          release a plugin config
//! POST   /actions/:name/bestConfig         rank candidate plugin configs
//! POST   /actions/:name/blockSchema        derive block config, render schema
//! POST   /actions/:name/blockSignature     render the block signature
//! POST   /actions/:name/executeBlock       run the action (ndjson)
//! POST   /triggers/:name/bestConfig
//! POST   /triggers/:name/blockSchema
//! POST   /triggers/:name/blockSignature
//! POST   /triggers/:name/watchBlock        watch an endpoint
//! DELETE /triggers/:name/cleanupBlock      stop watching an endpoint
//! ANY    /triggers/:name/executeBlock      run the trigger on a delivery (ndjson)
//! ```

use std::sync::Arc;

use axum::body::{Bytes, to_bytes};
use axum::extract::{Path, Request, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{any, delete, get, post};
use axum::{Json, Router};
use blockhost_block::{ActionSignature, InboundRequest, TriggerExecuteArgs, TriggerSignature};
use blockhost_runtime::{BestConfig, BlockSchema, ConfigSchema, PluginDescription, PluginRuntime};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::requests::{
  BestConfigRequest, BlockSchemaRequest, BlockSignatureRequest, CleanupConfigRequest,
  CleanupRequest, ConfigSchemaRequest, ExecuteActionRequest, WatchRequest, decode,
};
use crate::stream::ndjson;

/// Header carrying the block config of a trigger delivery, as JSON.
pub const BLOCK_CONFIG_HEADER: &str = "x-blockhost-blockconfig";

/// Header carrying the plugin config of a trigger delivery, as JSON.
pub const PLUGIN_CONFIG_HEADER: &str = "x-blockhost-pluginconfig";

/// State shared by the routes of one plugin.
#[derive(Clone)]
pub(crate) struct PluginState {
  pub runtime: Arc<PluginRuntime>,
  /// Parent of every execution's cancellation token.
  pub cancel: CancellationToken,
  pub max_body_bytes: usize,
}

pub(crate) fn plugin_routes(state: PluginState) -> Router {
  Router::new()
    .route("/", get(describe))
    .route("/configSchema", post(config_schema))
    .route("/cleanup", delete(cleanup_config))
    .route("/actions/:name/bestConfig", post(action_best_config))
    .route("/actions/:name/blockSchema", post(action_block_schema))
    .route("/actions/:name/blockSignature", post(action_block_signature))
    .route("/actions/:name/executeBlock", post(execute_action))
    .route("/triggers/:name/bestConfig", post(trigger_best_config))
    .route("/triggers/:name/blockSchema", post(trigger_block_schema))
    .route("/triggers/:name/blockSignature", post(trigger_block_signature))
    .route("/triggers/:name/watchBlock", post(watch))
    .route("/triggers/:name/cleanupBlock", delete(cleanup))
    .route("/triggers/:name/executeBlock", any(execute_trigger))
    .with_state(state)
}

async fn describe(State(state): State<PluginState>) -> Result<Json<PluginDescription>, ApiError> {
  Ok(Json(state.runtime.describe().await?))
}

async fn config_schema(
  State(state): State<PluginState>,
  body: Bytes,
) -> Result<Json<ConfigSchema>, ApiError> {
  let req: ConfigSchemaRequest = decode(&body)?;
  Ok(Json(state.runtime.config_schema(req.into()).await?))
}

async fn cleanup_config(
  State(state): State<PluginState>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let req: CleanupConfigRequest = decode(&body)?;
  state.runtime.cleanup_config(req.config).await?;
  Ok(Json(json!({})))
}

async fn action_best_config(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<BestConfig>, ApiError> {
  let req: BestConfigRequest = decode(&body)?;
  Ok(Json(
    state
      .runtime
      .action_best_config(&name, &req.plugin_configs)
      .await?,
  ))
}

async fn action_block_schema(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<BlockSchema>, ApiError> {
  let req: BlockSchemaRequest = decode(&body)?;
  Ok(Json(state.runtime.action_block_schema(&name, req.into()).await?))
}

async fn action_block_signature(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<ActionSignature>, ApiError> {
  let req: BlockSignatureRequest = decode(&body)?;
  Ok(Json(
    state
      .runtime
      .action_block_signature(&name, req.into())
      .await?,
  ))
}

async fn execute_action(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Response, ApiError> {
  let req: ExecuteActionRequest = decode(&body)?;
  let results = state
    .runtime
    .execute_action(&name, req.into(), state.cancel.child_token())?;
  Ok(ndjson(results))
}

async fn trigger_best_config(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<BestConfig>, ApiError> {
  let req: BestConfigRequest = decode(&body)?;
  Ok(Json(
    state
      .runtime
      .trigger_best_config(&name, &req.plugin_configs)
      .await?,
  ))
}

async fn trigger_block_schema(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<BlockSchema>, ApiError> {
  let req: BlockSchemaRequest = decode(&body)?;
  Ok(Json(
    state
      .runtime
      .trigger_block_schema(&name, req.into())
      .await?,
  ))
}

async fn trigger_block_signature(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<TriggerSignature>, ApiError> {
  let req: BlockSignatureRequest = decode(&body)?;
  Ok(Json(
    state
      .runtime
      .trigger_block_signature(&name, req.into())
      .await?,
  ))
}

async fn watch(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<Option<Value>>, ApiError> {
  let req: WatchRequest = decode(&body)?;
  Ok(Json(state.runtime.watch(&name, req.into()).await?))
}

async fn cleanup(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let req: CleanupRequest = decode(&body)?;
  let (endpoint, args) = req.into_parts();
  let removed = state
    .runtime
    .cleanup(&name, endpoint.as_deref(), args)
    .await?;
  Ok(Json(json!({ "removed": removed })))
}

async fn execute_trigger(
  State(state): State<PluginState>,
  Path(name): Path<String>,
  request: Request,
) -> Result<Response, ApiError> {
  // Resolve the trigger before reading a body nobody will use.
  state.runtime.trigger(&name)?;

  let (parts, body) = request.into_parts();
  let block_config = header_json(&parts.headers, BLOCK_CONFIG_HEADER)?.unwrap_or(Value::Null);
  let plugin_config = header_json(&parts.headers, PLUGIN_CONFIG_HEADER)?;

  let body = to_bytes(body, state.max_body_bytes)
    .await
    .map_err(|_| ApiError::PayloadTooLarge {
      limit: state.max_body_bytes,
    })?;

  let request = InboundRequest {
    method: parts.method.to_string(),
    path: parts.uri.path().to_string(),
    query: parts.uri.query().map(str::to_string),
    headers: parts
      .headers
      .iter()
      .filter_map(|(key, value)| {
        value
          .to_str()
          .ok()
          .map(|value| (key.as_str().to_string(), value.to_string()))
      })
      .collect(),
    body: body.to_vec(),
  };

  let args = TriggerExecuteArgs {
    request,
    block_config,
    plugin_config,
  };
  let results = state
    .runtime
    .execute_trigger(&name, args, state.cancel.child_token())?;
  Ok(ndjson(results))
}

/// Parse a JSON header. Absent headers and `null` are `None`.
fn header_json(headers: &HeaderMap, name: &str) -> Result<Option<Value>, ApiError> {
  let Some(raw) = headers.get(name) else {
    return Ok(None);
  };
  let raw = raw
    .to_str()
    .map_err(|_| ApiError::bad_request(format!("header {} is not valid text", name)))?;
  let value: Value = serde_json::from_str(raw)
    .map_err(|e| ApiError::bad_request(format!("header {} is not valid json: {}", name, e)))?;
  Ok(Some(value).filter(|v| !v.is_null()))
}
