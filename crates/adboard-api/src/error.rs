//! Error types and axum `IntoResponse` implementation.

use std::time::Duration;

use adboard_core::mapping::ValidationErrors;
use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("authentication credentials were not provided or are invalid")]
  Unauthenticated,
  #[error("you do not have permission to perform this action")]
  Forbidden,
  #[error("not found")]
  NotFound,
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("request was throttled; retry in {retry_after:?}")]
  Throttled { retry_after: Duration },
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<adboard_core::Error> for Error {
  fn from(e: adboard_core::Error) -> Self {
    match e {
      adboard_core::Error::Malformed(e) => Error::BadRequest(format!("JSON parse error: {e}")),
      adboard_core::Error::Validation(errors) => Error::Validation(errors),
    }
  }
}

/// Whole seconds to advertise in `Retry-After`, rounded up, at least one.
fn retry_after_secs(wait: Duration) -> u64 {
  let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
  secs.max(1)
}

fn detail(status: StatusCode, message: String) -> Response {
  (status, Json(json!({ "detail": message }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthenticated => {
        let mut res = detail(StatusCode::UNAUTHORIZED, self.to_string());
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"adboard\""),
        );
        res
      }
      Error::Forbidden => detail(StatusCode::FORBIDDEN, self.to_string()),
      Error::NotFound => detail(StatusCode::NOT_FOUND, self.to_string()),
      Error::Validation(errors) => {
        (StatusCode::BAD_REQUEST, Json(errors)).into_response()
      }
      Error::BadRequest(msg) => detail(StatusCode::BAD_REQUEST, msg),
      Error::Throttled { retry_after } => {
        let secs = retry_after_secs(retry_after);
        let mut res = detail(
          StatusCode::TOO_MANY_REQUESTS,
          format!("Request was throttled. Expected available in {secs} seconds."),
        );
        res.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
        res
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store failure");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
      }
    }
  }
}
