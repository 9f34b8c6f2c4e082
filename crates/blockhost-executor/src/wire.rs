//! Newline-delimited JSON encoding of result streams.

use crate::result::BlockResult;

/// Media type of an encoded result stream.
pub const CONTENT_TYPE: &str = "application/x-ndjson";

/// Line sent in place of a result that failed to serialize.
const ENCODE_FAILURE_LINE: &str =
  "{\"done\":true,\"error\":{\"statusCode\":500,\"message\":\"failed to encode block result\"}}\n";

/// Encode one result as a newline-terminated JSON line.
pub fn encode_line(result: &BlockResult) -> String {
  match serde_json::to_string(result) {
    Ok(mut line) => {
      line.push('\n');
      line
    }
    Err(e) => {
      tracing::error!(error = %e, "failed to encode block result");
      ENCODE_FAILURE_LINE.to_string()
    }
  }
}

/// Decode one line of an encoded result stream.
pub fn decode_line(line: &str) -> Result<BlockResult, serde_json::Error> {
  serde_json::from_str(line.trim_end())
}

/// Decode a whole encoded result stream, skipping blank lines.
pub fn decode_all(body: &str) -> Result<Vec<BlockResult>, serde_json::Error> {
  body
    .lines()
    .filter(|line| !line.trim().is_empty())
    .map(decode_line)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use blockhost_block::BlockError;
  use serde_json::json;

  #[test]
  fn test_encode_line_is_newline_terminated() {
    let line = encode_line(&BlockResult::partial(json!({"n": 1})));
    assert_eq!(line, "{\"done\":false,\"value\":{\"n\":1}}\n");
  }

  #[test]
  fn test_final_without_value_omits_value() {
    assert_eq!(encode_line(&BlockResult::complete(None)), "{\"done\":true}\n");
  }

  #[test]
  fn test_decode_all() {
    let body = [
      encode_line(&BlockResult::partial(json!(1))),
      "\n".to_string(),
      encode_line(&BlockResult::failure(false, &BlockError::failed("boom"))),
    ]
    .concat();

    let results = decode_all(&body).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], BlockResult::partial(json!(1)));
    assert_eq!(results[1].error.as_ref().unwrap().message, "boom");
  }

  #[test]
  fn test_failure_line_is_valid() {
    let result = decode_line(ENCODE_FAILURE_LINE).unwrap();
    assert!(result.done);
    assert_eq!(result.error.unwrap().status_code, 500);
  }
}
