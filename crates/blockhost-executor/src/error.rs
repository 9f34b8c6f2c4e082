//! Block execution errors.

/// Errors that prevent a block from being driven at all.
///
/// Failures raised by the block body are not errors at this level; they are
/// reported inside the result stream.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
  /// Execution was cancelled before the body started.
  #[error("execution cancelled")]
  Cancelled,

  /// The body returned a completion mode this executor cannot drive.
  #[error("unsupported completion mode for block '{block}'")]
  UnsupportedCompletion { block: String },
}
