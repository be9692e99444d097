//! Error types: store failures (remote record store and local state) and the
//! HTTP-facing `ApiError`.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;

use crate::selection::SpinError;

/// PostgreSQL unique-violation code as reported by PostgREST.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("remote store request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("remote store returned {status}: {message}")]
  Status {
    status: u16,
    code: Option<String>,
    message: String,
  },

  #[error("duplicate row: {0}")]
  UniqueViolation(String),

  #[error("could not decode store payload: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("local state I/O failed: {0}")]
  Io(#[from] std::io::Error),
}

impl StoreError {
  pub fn is_unique_violation(&self) -> bool {
    matches!(self, StoreError::UniqueViolation(_))
  }
}

/// Errors returned by HTTP handlers. Student-facing flows only produce
/// `NotFound`, `BadRequest`, `Unauthorized` and `Conflict`; store failures
/// reach the client only on admin routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("access password required")]
  Unauthorized,

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unavailable(String),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Store(StoreError::UniqueViolation(_)) => StatusCode::CONFLICT,
      ApiError::Store(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl From<SpinError> for ApiError {
  fn from(e: SpinError) -> Self {
    ApiError::Conflict(e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(target: "prompt_wheel", error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
