//! Arguments handed to plugin, action and trigger hooks.
//!
//! `plugin_config` is only populated when the block's manifest sets
//! `needs_plugin_config`.

/// Arguments for deriving a plugin configuration.
#[derive(Debug, Clone, Default)]
pub struct DeriveConfigArgs {
  pub form: Option<serde_json::Value>,
  pub config: Option<serde_json::Value>,
}

/// Arguments for rendering a plugin configuration schema.
#[derive(Debug, Clone)]
pub struct RenderConfigSchemaArgs {
  pub config: serde_json::Value,
  pub render_props: serde_json::Value,
}

/// Arguments for deriving an action's block configuration.
#[derive(Debug, Clone, Default)]
pub struct ActionDeriveArgs {
  pub form: Option<serde_json::Value>,
  pub block_config: Option<serde_json::Value>,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for deriving a trigger's block configuration.
#[derive(Debug, Clone, Default)]
pub struct TriggerDeriveArgs {
  pub form: Option<serde_json::Value>,
  /// Callback address the trigger will be watched with.
  pub endpoint: String,
  pub block_config: Option<serde_json::Value>,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for rendering a block configuration schema.
#[derive(Debug, Clone)]
pub struct RenderSchemaArgs {
  pub render_props: serde_json::Value,
  pub block_config: serde_json::Value,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for rendering a block signature.
#[derive(Debug, Clone)]
pub struct RenderSignatureArgs {
  pub params: Option<serde_json::Value>,
  pub block_config: serde_json::Value,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for executing an action.
#[derive(Debug, Clone)]
pub struct ActionExecuteArgs {
  /// Parameter values and the id of the input that fired.
  pub params: serde_json::Value,
  pub block_config: serde_json::Value,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for executing a trigger against an inbound event.
#[derive(Debug, Clone)]
pub struct TriggerExecuteArgs {
  pub request: InboundRequest,
  pub block_config: serde_json::Value,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for watching a trigger.
#[derive(Debug, Clone)]
pub struct WatchArgs {
  pub endpoint: String,
  pub block_config: serde_json::Value,
  /// Cleanup data from a previous watch of the same endpoint, if any.
  pub cleanup_data: Option<serde_json::Value>,
  pub plugin_config: Option<serde_json::Value>,
}

/// Arguments for cleaning up a watched trigger.
#[derive(Debug, Clone)]
pub struct CleanupArgs {
  pub block_config: serde_json::Value,
  pub cleanup_data: serde_json::Value,
  pub plugin_config: Option<serde_json::Value>,
}

/// A transport-neutral view of the request that reached a trigger.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
  pub method: String,
  pub path: String,
  pub query: Option<String>,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl InboundRequest {
  /// First header with the given name, compared case-insensitively.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  /// Body decoded as UTF-8, lossily.
  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }

  /// Body parsed as JSON. An empty body parses as `null`.
  pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
    if self.body.is_empty() {
      return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&self.body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_lookup_ignores_case() {
    let request = InboundRequest {
      method: "POST".to_string(),
      path: "/hook".to_string(),
      headers: vec![("Content-Type".to_string(), "application/json".to_string())],
      ..Default::default()
    };

    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-missing"), None);
  }

  #[test]
  fn test_empty_body_is_null_json() {
    let request = InboundRequest::default();
    assert_eq!(request.json().unwrap(), serde_json::Value::Null);
  }

  #[test]
  fn test_json_body() {
    let request = InboundRequest {
      body: br#"{"event": "created"}"#.to_vec(),
      ..Default::default()
    };
    assert_eq!(request.json().unwrap()["event"], "created");
    assert_eq!(request.text(), r#"{"event": "created"}"#);
  }
}
