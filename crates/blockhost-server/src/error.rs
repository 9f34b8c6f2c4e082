//! Server errors.

use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blockhost_runtime::RuntimeError;
use blockhost_trigger_store::StoreError;
use tracing::error;

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
  /// The trigger store could not be opened or prepared.
  #[error("trigger store unavailable: {0}")]
  Store(#[from] StoreError),

  /// Two plugins claim the same uid.
  #[error("plugin uid '{uid}' is registered twice")]
  DuplicatePlugin { uid: String },

  /// The listen address could not be bound.
  #[error("failed to bind {addr}: {source}")]
  Bind {
    addr: SocketAddr,
    #[source]
    source: std::io::Error,
  },

  /// The server stopped with an I/O error.
  #[error("server error: {0}")]
  Serve(#[source] std::io::Error),
}

/// Failure of a single request, rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  /// The request body or a header could not be decoded.
  #[error("bad request: {message}")]
  BadRequest { message: String },

  /// The request body exceeds the configured limit.
  #[error("request body exceeds {limit} bytes")]
  PayloadTooLarge { limit: usize },
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::BadRequest {
      message: message.into(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Runtime(e) => {
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
      }
      Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
      Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, status = status.as_u16(), "request failed");
    }
    (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
  }
}
