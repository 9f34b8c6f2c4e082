//! Block execution for blockhost.
//!
//! This crate provides the [`BlockExecutor`], which runs an action or
//! trigger body exactly once and turns its [`Completion`] into a
//! [`ResultStream`]:
//!
//! ```text
//! Immediate(value)        -> {done: true, value}
//! Deferred(future)        -> {done: true, value} | {done: true, error}
//! Incremental(steps)      -> {done: false, value}* then
//!                            {done: true, value} | {done: false, error}
//! ```
//!
//! The [`wire`] module encodes result streams as newline-delimited JSON.
//!
//! [`Completion`]: blockhost_block::Completion

mod error;
mod executor;
mod result;
pub mod wire;

pub use error::ExecutionError;
pub use executor::BlockExecutor;
pub use result::{BlockResult, ErrorRecord, ResultStream, final_outcome};
