//! Block executor implementation.

use std::sync::Arc;

use blockhost_block::{
  Action, ActionExecuteArgs, BlockError, Completion, Step, StepStream, Trigger, TriggerExecuteArgs,
};
use futures::future::{self, BoxFuture};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::ExecutionError;
use crate::result::{BlockResult, ResultStream};

/// Drives block bodies and renders their completion into a [`ResultStream`].
///
/// The executor holds no state between invocations and never retries a
/// failed body.
#[derive(Debug, Clone, Default)]
pub struct BlockExecutor;

impl BlockExecutor {
  /// Create a new block executor.
  pub fn new() -> Self {
    Self
  }

  /// Execute an action.
  #[instrument(name = "action_execute", skip(self, action, args, cancel))]
  pub fn execute_action(
    &self,
    name: &str,
    action: &dyn Action,
    args: ActionExecuteArgs,
    cancel: CancellationToken,
  ) -> Result<ResultStream, ExecutionError> {
    if cancel.is_cancelled() {
      return Err(ExecutionError::Cancelled);
    }

    let completion = action.execute_block(args);
    info!(mode = completion.mode(), "action started");
    self.drive(name, completion, cancel)
  }

  /// Execute a trigger against an inbound event.
  #[instrument(name = "trigger_execute", skip(self, trigger, args, cancel))]
  pub fn execute_trigger(
    &self,
    name: &str,
    trigger: &dyn Trigger,
    args: TriggerExecuteArgs,
    cancel: CancellationToken,
  ) -> Result<ResultStream, ExecutionError> {
    if cancel.is_cancelled() {
      return Err(ExecutionError::Cancelled);
    }

    let completion = trigger.execute_block(args);
    info!(mode = completion.mode(), "trigger started");
    self.drive(name, completion, cancel)
  }

  /// Render a completion into a result stream.
  ///
  /// Nothing is polled until the stream is. Dropping the stream, or
  /// cancelling `cancel`, stops the body at its next suspension point.
  pub fn drive(
    &self,
    block: &str,
    completion: Completion,
    cancel: CancellationToken,
  ) -> Result<ResultStream, ExecutionError> {
    let block: Arc<str> = Arc::from(block);

    match completion {
      Completion::Immediate(result) => {
        let item = terminal(&block, result);
        Ok(stream::once(future::ready(item)).boxed())
      }
      Completion::Deferred(body) => Ok(drive_deferred(block, body, cancel)),
      Completion::Incremental(steps) => Ok(drive_incremental(block, steps, cancel)),
      _ => {
        error!(block = %block, "unsupported completion mode");
        Err(ExecutionError::UnsupportedCompletion {
          block: block.to_string(),
        })
      }
    }
  }
}

/// Map a single-result body onto its terminal item.
fn terminal(block: &str, result: Result<serde_json::Value, BlockError>) -> BlockResult {
  match result {
    Ok(value) => {
      info!(block, "block completed");
      BlockResult::complete(Some(value))
    }
    Err(e) => {
      error!(block, error = %e, "block failed");
      BlockResult::failure(true, &e)
    }
  }
}

fn drive_deferred(
  block: Arc<str>,
  body: BoxFuture<'static, Result<serde_json::Value, BlockError>>,
  cancel: CancellationToken,
) -> ResultStream {
  stream::once(async move {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        debug!(block = %block, "deferred block cancelled");
        None
      }
      result = body => Some(terminal(&block, result)),
    }
  })
  .filter_map(future::ready)
  .boxed()
}

/// State carried between pulls of an incremental body.
struct Incremental {
  block: Arc<str>,
  steps: StepStream,
  cancel: CancellationToken,
  pulled: usize,
}

fn drive_incremental(block: Arc<str>, steps: StepStream, cancel: CancellationToken) -> ResultStream {
  let state = Incremental {
    block,
    steps,
    cancel,
    pulled: 0,
  };

  // The state is dropped as soon as a terminal item is produced, releasing
  // the body before the consumer asks for more.
  stream::unfold(Some(state), |state| async move {
    let mut state = state?;

    let next = tokio::select! {
      biased;
      _ = state.cancel.cancelled() => {
        debug!(block = %state.block, pulled = state.pulled, "incremental block cancelled");
        return None;
      }
      next = state.steps.next() => next,
    };
    state.pulled += 1;

    match next {
      Some(Ok(Step::Yield(value))) => Some((BlockResult::partial(value), Some(state))),
      Some(Ok(Step::Return(value))) => {
        info!(block = %state.block, pulled = state.pulled, "block completed");
        Some((BlockResult::complete(value), None))
      }
      None => {
        info!(block = %state.block, pulled = state.pulled, "block completed without final value");
        Some((BlockResult::complete(None), None))
      }
      Some(Err(e)) => {
        error!(block = %state.block, pulled = state.pulled, error = %e, "block failed");
        Some((BlockResult::failure(false, &e), None))
      }
    }
  })
  .boxed()
}
