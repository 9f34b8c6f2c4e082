use thiserror::Error;

/// Errors raised by a block body or one of its configuration hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
  /// The caller supplied arguments the block cannot work with.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  /// The block failed while doing its work.
  #[error("{message}")]
  Failed { message: String },

  /// A service the block talks to answered with an error status.
  #[error("upstream returned {status_code}: {message}")]
  Upstream { status_code: u16, message: String },
}

impl BlockError {
  /// Create an invalid input error.
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput {
      message: message.into(),
    }
  }

  /// Create a generic failure.
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  /// Create an error carrying the status an upstream service returned.
  pub fn upstream(status_code: u16, message: impl Into<String>) -> Self {
    Self::Upstream {
      status_code,
      message: message.into(),
    }
  }

  /// Status code reported alongside this error on the wire.
  pub fn status_code(&self) -> u16 {
    match self {
      Self::InvalidInput { .. } => 400,
      Self::Failed { .. } => 500,
      Self::Upstream { status_code, .. } => *status_code,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_codes() {
    assert_eq!(BlockError::invalid_input("missing url").status_code(), 400);
    assert_eq!(BlockError::failed("boom").status_code(), 500);
    assert_eq!(BlockError::upstream(429, "slow down").status_code(), 429);
  }

  #[test]
  fn test_failed_displays_bare_message() {
    assert_eq!(BlockError::failed("boom").to_string(), "boom");
  }
}
