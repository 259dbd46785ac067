//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

/// Decode an optional JSON request body. A blank body yields
/// `T::default()`; anything else must be valid JSON for `T`, whatever the
/// request's content type.
pub fn json_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(T::default());
  }
  serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

impl From<rollcall_core::Error> for ApiError {
  fn from(e: rollcall_core::Error) -> Self {
    match e {
      rollcall_core::Error::MissingField(_) => ApiError::BadRequest(e.to_string()),
      rollcall_core::Error::Storage(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Store(_) | ApiError::Internal(_) => {
        error!(error = %self, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let message = match &self {
      ApiError::Store(e) => e.to_string(),
      other => other.to_string(),
    };
    (status, Json(json!({ "success": false, "error": message }))).into_response()
  }
}
