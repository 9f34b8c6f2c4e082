use blockhost_block::SchemaGroup;
use serde_json::{Value, json};

/// Build a schema group whose order follows `fields`.
pub(crate) fn group(fields: &[(&str, Value)]) -> SchemaGroup {
  SchemaGroup {
    order: fields.iter().map(|(name, _)| name.to_string()).collect(),
    values: fields
      .iter()
      .map(|(name, schema)| (name.to_string(), schema.clone()))
      .collect(),
  }
}

pub(crate) fn string(title: &str) -> Value {
  json!({ "type": "string", "title": title })
}

pub(crate) fn integer(title: &str) -> Value {
  json!({ "type": "integer", "title": title })
}

/// First string found at `field` in the given values, in order.
pub(crate) fn pick_str<'a>(field: &str, sources: &[Option<&'a Value>]) -> Option<&'a str> {
  sources
    .iter()
    .flatten()
    .find_map(|value| value.get(field).and_then(Value::as_str))
}

/// First bool found at `field` in the given values, in order.
pub(crate) fn pick_bool(field: &str, sources: &[Option<&Value>]) -> Option<bool> {
  sources
    .iter()
    .flatten()
    .find_map(|value| value.get(field).and_then(Value::as_bool))
}
