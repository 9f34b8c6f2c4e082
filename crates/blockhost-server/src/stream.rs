use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use blockhost_executor::{ResultStream, wire};
use futures::StreamExt;

/// Stream results to the client as newline-delimited JSON.
///
/// The result stream is pulled only as fast as the body is written, and it
/// is dropped together with the body when the client goes away.
pub(crate) fn ndjson(results: ResultStream) -> Response {
  let lines = results.map(|result| Ok::<_, Infallible>(wire::encode_line(&result)));
  (
    [(header::CONTENT_TYPE, wire::CONTENT_TYPE)],
    Body::from_stream(lines),
  )
    .into_response()
}
