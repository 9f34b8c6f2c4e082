//! Block execution results.

use blockhost_block::BlockError;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// A stream of results for one invocation, in the order the body produced
/// them. The stream ends after the first terminal item.
pub type ResultStream = BoxStream<'static, BlockResult>;

/// One step of a block execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockResult {
  /// False only for intermediate items of an incremental body.
  pub done: bool,
  /// The value produced for this step.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
  /// Present only when the step failed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ErrorRecord>,
}

/// Failure description carried by an error result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
  pub status_code: u16,
  pub message: String,
}

impl From<&BlockError> for ErrorRecord {
  fn from(error: &BlockError) -> Self {
    Self {
      status_code: error.status_code(),
      message: error.to_string(),
    }
  }
}

impl BlockResult {
  /// An intermediate value.
  pub fn partial(value: serde_json::Value) -> Self {
    Self {
      done: false,
      value: Some(value),
      error: None,
    }
  }

  /// The final value.
  pub fn complete(value: Option<serde_json::Value>) -> Self {
    Self {
      done: true,
      value,
      error: None,
    }
  }

  /// A failed step.
  pub fn failure(done: bool, error: &BlockError) -> Self {
    Self {
      done,
      value: None,
      error: Some(error.into()),
    }
  }

  /// Whether no further items follow this one.
  pub fn is_terminal(&self) -> bool {
    self.done || self.error.is_some()
  }
}

/// Drain a result stream down to its final outcome.
///
/// Intermediate items are discarded. A stream that ends without a terminal
/// item yields `Ok(None)`.
pub async fn final_outcome(
  mut results: ResultStream,
) -> Result<Option<serde_json::Value>, ErrorRecord> {
  while let Some(result) = results.next().await {
    if let Some(error) = result.error {
      return Err(error);
    }
    if result.done {
      return Ok(result.value);
    }
  }
  Ok(None)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_partial_serializes_without_error() {
    let value = serde_json::to_value(BlockResult::partial(json!({"n": 1}))).unwrap();
    assert_eq!(value, json!({"done": false, "value": {"n": 1}}));
  }

  #[test]
  fn test_failure_serializes_status_code() {
    let result = BlockResult::failure(false, &BlockError::failed("boom"));
    let value = serde_json::to_value(result).unwrap();
    assert_eq!(
      value,
      json!({"done": false, "error": {"statusCode": 500, "message": "boom"}})
    );
  }

  #[test]
  fn test_terminal_items() {
    assert!(!BlockResult::partial(json!(1)).is_terminal());
    assert!(BlockResult::complete(None).is_terminal());
    assert!(BlockResult::failure(false, &BlockError::failed("x")).is_terminal());
  }
}
