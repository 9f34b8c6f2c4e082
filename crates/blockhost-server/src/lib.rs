//! HTTP transport for blockhost.
//!
//! Each plugin is mounted under `/{uid}`; see [`routes`] for the table.
//! Execution endpoints answer with `application/x-ndjson` result streams,
//! everything else with JSON. Failures outside a result stream are
//! rendered as `{"error": "<message>"}` with a matching status.

mod error;
mod host;
mod requests;
pub mod routes;
mod stream;

pub use error::{ApiError, ServerError};
pub use host::{App, build, serve, serve_on};
pub use routes::{BLOCK_CONFIG_HEADER, PLUGIN_CONFIG_HEADER};
