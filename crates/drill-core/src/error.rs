//! Error types for `drill-core`.
//!
//! Every backend adapter classifies its native failures into [`Error`], so
//! callers can branch on [`ErrorKind`] instead of matching message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed transport error carried by [`Error::Backend`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The closed set of error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Missing, malformed, or rejected personal-backend credentials.
  Configuration,
  /// The backend is reachable but a required table does not exist.
  Schema,
  /// A note, attempt, or session lookup missed.
  NotFound,
  /// Any other failure reported by the transport or the backend.
  Backend,
  /// A response that could not be interpreted.
  Unknown,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("schema missing: {0}")]
  Schema(String),

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// A uniqueness constraint was violated, e.g. two writers picked the same
  /// attempt number for one note.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("backend error: {0}")]
  Backend(#[source] BoxError),

  #[error("unexpected response: {0}")]
  Unknown(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Configuration(_) => ErrorKind::Configuration,
      Self::Schema(_) => ErrorKind::Schema,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::Conflict(_) | Self::Backend(_) => ErrorKind::Backend,
      Self::Unknown(_) => ErrorKind::Unknown,
    }
  }

  /// Wrap a plain backend message (e.g. an HTTP error body).
  pub fn backend(message: impl Into<String>) -> Self {
    Self::Backend(message.into().into())
  }

  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    Self::NotFound { entity, id: id.to_string() }
  }

  /// `true` for the "table does not exist" signal the setup flow expects
  /// before the bootstrap script has been run.
  pub fn is_missing_table(&self) -> bool { matches!(self, Self::Schema(_)) }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self { Self::Unknown(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn conflict_is_a_backend_kind() {
    let err = Error::Conflict("duplicate key".into());
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(!err.is_missing_table());
  }

  #[test]
  fn kinds_serialize_snake_case() {
    let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
    assert_eq!(json, "\"not_found\"");
  }

  #[test]
  fn not_found_message_names_entity() {
    let err = Error::not_found("note", "abc");
    assert_eq!(err.to_string(), "note not found: abc");
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }
}
