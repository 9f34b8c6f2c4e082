//! JSON request bodies.
//!
//! Every field is optional on the wire. An empty body decodes as the
//! default request.

use axum::body::Bytes;
use blockhost_block::{
  ActionDeriveArgs, ActionExecuteArgs, CleanupArgs, DeriveConfigArgs, RenderSignatureArgs,
  TriggerDeriveArgs, WatchArgs,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Decode a JSON body, treating an empty body as `T::default()`.
pub(crate) fn decode<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(T::default());
  }
  serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid json body: {}", e)))
}

/// Absent and `null` both mean "not given".
fn present(value: Option<Value>) -> Option<Value> {
  value.filter(|v| !v.is_null())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ConfigSchemaRequest {
  pub form: Option<Value>,
  pub config: Option<Value>,
}

impl From<ConfigSchemaRequest> for DeriveConfigArgs {
  fn from(req: ConfigSchemaRequest) -> Self {
    Self {
      form: present(req.form),
      config: present(req.config),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CleanupConfigRequest {
  pub config: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct BestConfigRequest {
  pub plugin_configs: serde_json::Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct BlockSchemaRequest {
  pub form: Option<Value>,
  pub endpoint: String,
  pub block_config: Option<Value>,
  pub plugin_config: Option<Value>,
}

impl From<BlockSchemaRequest> for ActionDeriveArgs {
  fn from(req: BlockSchemaRequest) -> Self {
    Self {
      form: present(req.form),
      block_config: present(req.block_config),
      plugin_config: present(req.plugin_config),
    }
  }
}

impl From<BlockSchemaRequest> for TriggerDeriveArgs {
  fn from(req: BlockSchemaRequest) -> Self {
    Self {
      form: present(req.form),
      endpoint: req.endpoint,
      block_config: present(req.block_config),
      plugin_config: present(req.plugin_config),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct BlockSignatureRequest {
  pub params: Option<Value>,
  pub block_config: Value,
  pub plugin_config: Option<Value>,
}

impl From<BlockSignatureRequest> for RenderSignatureArgs {
  fn from(req: BlockSignatureRequest) -> Self {
    Self {
      params: present(req.params),
      block_config: req.block_config,
      plugin_config: present(req.plugin_config),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ExecuteActionRequest {
  pub params: Value,
  pub block_config: Value,
  pub plugin_config: Option<Value>,
}

impl From<ExecuteActionRequest> for ActionExecuteArgs {
  fn from(req: ExecuteActionRequest) -> Self {
    Self {
      params: req.params,
      block_config: req.block_config,
      plugin_config: present(req.plugin_config),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct WatchRequest {
  pub endpoint: String,
  pub block_config: Value,
  pub cleanup_data: Option<Value>,
  pub plugin_config: Option<Value>,
}

impl From<WatchRequest> for WatchArgs {
  fn from(req: WatchRequest) -> Self {
    Self {
      endpoint: req.endpoint,
      block_config: req.block_config,
      cleanup_data: present(req.cleanup_data),
      plugin_config: present(req.plugin_config),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CleanupRequest {
  pub endpoint: Option<String>,
  pub block_config: Value,
  pub cleanup_data: Value,
  pub plugin_config: Option<Value>,
}

impl CleanupRequest {
  /// Split into the endpoint and the arguments for the cleanup body.
  pub fn into_parts(self) -> (Option<String>, CleanupArgs) {
    let args = CleanupArgs {
      block_config: self.block_config,
      cleanup_data: self.cleanup_data,
      plugin_config: present(self.plugin_config),
    };
    (self.endpoint, args)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_empty_body_is_default() {
    let req: WatchRequest = decode(&Bytes::from_static(b"  ")).unwrap();
    assert!(req.endpoint.is_empty());
    assert_eq!(req.block_config, Value::Null);
  }

  #[test]
  fn test_camel_case_fields() {
    let body = Bytes::from(
      json!({
        "endpoint": "https://cb/1",
        "blockConfig": {"event": "created"},
        "cleanupData": null,
        "pluginConfig": {"prefix": ">"},
      })
      .to_string(),
    );
    let args: WatchArgs = decode::<WatchRequest>(&body).unwrap().into();

    assert_eq!(args.endpoint, "https://cb/1");
    assert_eq!(args.block_config, json!({"event": "created"}));
    assert_eq!(args.cleanup_data, None);
    assert_eq!(args.plugin_config, Some(json!({"prefix": ">"})));
  }

  #[test]
  fn test_invalid_json_is_bad_request() {
    let result = decode::<WatchRequest>(&Bytes::from_static(b"{nope"));
    assert!(matches!(result, Err(ApiError::BadRequest { .. })));
  }
}
