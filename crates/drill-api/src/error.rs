//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"kind": …, "error": …}`; the status code is
//! derived from the kind.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use drill_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The identity has not configured a personal backend yet.
  #[error("no personal backend configured; complete setup first")]
  NeedsSetup,

  /// Status resolution ended in the error state.
  #[error("{message}")]
  Status { kind: ErrorKind, message: String },

  #[error(transparent)]
  Core(#[from] drill_core::Error),
}

fn kind_name(kind: ErrorKind) -> &'static str {
  match kind {
    ErrorKind::Configuration => "configuration",
    ErrorKind::Schema => "schema",
    ErrorKind::NotFound => "not_found",
    ErrorKind::Backend => "backend",
    ErrorKind::Unknown => "unknown",
  }
}

fn kind_status(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Configuration => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Schema => StatusCode::FAILED_DEPENDENCY,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Backend => StatusCode::BAD_GATEWAY,
    ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::NeedsSetup => StatusCode::CONFLICT,
      Self::Status { kind, .. } => kind_status(*kind),
      Self::Core(drill_core::Error::Conflict(_)) => StatusCode::CONFLICT,
      Self::Core(e) => kind_status(e.kind()),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unauthorized(_) => "unauthorized",
      Self::BadRequest(_) => "bad_request",
      Self::NeedsSetup => "needs_setup",
      Self::Status { kind, .. } => kind_name(*kind),
      Self::Core(e) => kind_name(e.kind()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::warn!(error = %self, "request failed");
    }
    let body = json!({ "kind": self.kind(), "error": self.to_string() });
    (status, Json(body)).into_response()
  }
}
