//! Completion modes of a block body.
//!
//! A block's `execute_block` hands back a [`Completion`] describing how its
//! result becomes available. The variant is chosen by the block author, so
//! the executor never has to guess the shape of the body.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::{FutureExt, StreamExt};

use crate::error::BlockError;

/// One item pulled from an incremental body.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  /// An intermediate result. More items follow.
  Yield(serde_json::Value),
  /// The final result. Nothing is pulled after this.
  Return(Option<serde_json::Value>),
}

/// Stream type of an incremental body.
pub type StepStream = BoxStream<'static, Result<Step, BlockError>>;

/// How a block body delivers its result.
#[non_exhaustive]
pub enum Completion {
  /// The body already ran; its result is available right away.
  Immediate(Result<serde_json::Value, BlockError>),

  /// The body resolves to a single result after suspending.
  Deferred(BoxFuture<'static, Result<serde_json::Value, BlockError>>),

  /// The body produces intermediate results before a final one.
  ///
  /// Items are pulled one at a time. Dropping the stream releases whatever
  /// the body holds open.
  Incremental(StepStream),
}

impl Completion {
  /// Wrap a value that is already known.
  pub fn immediate(value: serde_json::Value) -> Self {
    Self::Immediate(Ok(value))
  }

  /// Wrap a synchronous failure.
  pub fn failed(error: BlockError) -> Self {
    Self::Immediate(Err(error))
  }

  /// Wrap a future resolving to the block's result.
  pub fn deferred<F>(future: F) -> Self
  where
    F: Future<Output = Result<serde_json::Value, BlockError>> + Send + 'static,
  {
    Self::Deferred(future.boxed())
  }

  /// Wrap a stream of steps.
  pub fn incremental<S>(steps: S) -> Self
  where
    S: Stream<Item = Result<Step, BlockError>> + Send + 'static,
  {
    Self::Incremental(steps.boxed())
  }

  /// Short name of the completion mode, used in logs.
  pub fn mode(&self) -> &'static str {
    match self {
      Self::Immediate(_) => "immediate",
      Self::Deferred(_) => "deferred",
      Self::Incremental(_) => "incremental",
    }
  }
}

impl fmt::Debug for Completion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
      Self::Deferred(_) => f.write_str("Deferred(..)"),
      Self::Incremental(_) => f.write_str("Incremental(..)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_mode_names() {
    assert_eq!(Completion::immediate(json!(1)).mode(), "immediate");
    assert_eq!(
      Completion::deferred(async { Ok(json!(1)) }).mode(),
      "deferred"
    );
    let steps = futures::stream::iter(vec![Ok(Step::Return(None))]);
    assert_eq!(Completion::incremental(steps).mode(), "incremental");
  }

  #[tokio::test]
  async fn test_incremental_is_pulled_in_order() {
    let steps = futures::stream::iter(vec![
      Ok(Step::Yield(json!(1))),
      Ok(Step::Yield(json!(2))),
      Ok(Step::Return(Some(json!(3)))),
    ]);

    let Completion::Incremental(mut stream) = Completion::incremental(steps) else {
      panic!("expected incremental completion");
    };

    assert_eq!(stream.next().await, Some(Ok(Step::Yield(json!(1)))));
    assert_eq!(stream.next().await, Some(Ok(Step::Yield(json!(2)))));
    assert_eq!(stream.next().await, Some(Ok(Step::Return(Some(json!(3))))));
    assert_eq!(stream.next().await, None);
  }
}
