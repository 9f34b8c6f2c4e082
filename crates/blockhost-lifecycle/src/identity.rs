//! Identity fields carried inside cleanup data.
//!
//! Remembered triggers hand out cleanup data that names the record it belongs
//! to, so a caller that lost track of the endpoint can still clean up.

use blockhost_trigger_store::TriggerKey;
use serde_json::{Map, Value};

use crate::error::LifecycleError;

const PLUGIN: &str = "plugin";
const TRIGGER: &str = "trigger";
const ENDPOINT: &str = "endpoint";

/// Merge the key's identity fields into cleanup data returned by a watch.
///
/// Absent data becomes an object holding only the identity. Data that is not
/// an object is returned untouched.
pub fn with_identity(key: &TriggerKey, data: Option<Value>) -> Value {
  let mut object = match data {
    None | Some(Value::Null) => Map::new(),
    Some(Value::Object(object)) => object,
    Some(other) => return other,
  };

  object.insert(PLUGIN.to_string(), Value::String(key.plugin.clone()));
  object.insert(TRIGGER.to_string(), Value::String(key.trigger.clone()));
  object.insert(ENDPOINT.to_string(), Value::String(key.endpoint.clone()));
  Value::Object(object)
}

/// Resolve the key a cleanup call refers to.
///
/// The endpoint comes from the caller when given, otherwise from the
/// identity fields in `cleanup_data`. Identity fields that name a different
/// plugin or trigger are rejected.
pub fn resolve_key(
  plugin: &str,
  trigger: &str,
  endpoint: Option<&str>,
  cleanup_data: &Value,
) -> Result<TriggerKey, LifecycleError> {
  let incomplete = |message: String| LifecycleError::IncompleteIdentity {
    plugin: plugin.to_string(),
    trigger: trigger.to_string(),
    message,
  };

  if plugin.is_empty() || trigger.is_empty() {
    return Err(incomplete("plugin and trigger are required".to_string()));
  }

  let carried = |field: &str| -> Result<Option<&str>, LifecycleError> {
    match cleanup_data.get(field) {
      None | Some(Value::Null) => Ok(None),
      Some(Value::String(value)) => Ok(Some(value.as_str())),
      Some(_) => Err(incomplete(format!("cleanup data field '{}' is not a string", field))),
    }
  };

  for (field, expected) in [(PLUGIN, plugin), (TRIGGER, trigger)] {
    match carried(field)? {
      Some(found) if found != expected => {
        return Err(incomplete(format!(
          "cleanup data belongs to {} '{}', not '{}'",
          field, found, expected
        )));
      }
      _ => {}
    }
  }

  let endpoint = match endpoint.filter(|e| !e.is_empty()) {
    Some(endpoint) => endpoint,
    None => carried(ENDPOINT)?
      .filter(|e| !e.is_empty())
      .ok_or_else(|| incomplete("no endpoint given and none in cleanup data".to_string()))?,
  };

  Ok(TriggerKey::new(plugin, trigger, endpoint))
}
