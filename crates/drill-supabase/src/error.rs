//! Error type for `drill-supabase`, and the classification of REST and auth
//! failures into the core taxonomy.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Postgres: `undefined_table`.
const PG_UNDEFINED_TABLE: &str = "42P01";
/// PostgREST: relation not found in the schema cache.
const PGRST_TABLE_NOT_FOUND: &str = "PGRST205";
/// Postgres: `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum Error {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{status}: {message}")]
  Api {
    status:  StatusCode,
    code:    Option<String>,
    message: String,
  },

  #[error("invalid project URL {url:?}: {reason}")]
  InvalidUrl { url: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The union of the error bodies PostgREST and the auth server return.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  code:              Option<serde_json::Value>,
  message:           Option<String>,
  details:           Option<String>,
  hint:              Option<String>,
  error:             Option<String>,
  error_description: Option<String>,
  msg:               Option<String>,
  error_code:        Option<String>,
}

impl Error {
  /// Build an [`Error::Api`] from a non-success response body.
  ///
  /// Only structured error bodies are surfaced. Anything else is logged and
  /// replaced by the status reason, since the response may come from an
  /// arbitrary host the caller named.
  pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
    let parsed: ErrorBody = match serde_json::from_str(body) {
      Ok(parsed) => parsed,
      Err(_) => {
        if !body.trim().is_empty() {
          debug!(%status, len = body.len(), "discarding unstructured error body");
        }
        ErrorBody::default()
      }
    };
    let code = parsed.error_code.clone().or(match &parsed.code {
      Some(serde_json::Value::String(s)) => Some(s.clone()),
      _ => None,
    });
    let message = [
      parsed.message,
      parsed.error_description,
      parsed.msg,
      parsed.error,
      parsed.details,
      parsed.hint,
    ]
    .into_iter()
    .flatten()
    .next()
    .unwrap_or_else(|| {
      status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_owned()
    });
    Self::Api { status, code, message }
  }

  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Api { status, .. } => Some(*status),
      Self::Http(e) => e.status(),
      Self::InvalidUrl { .. } => None,
    }
  }
}

impl From<Error> for drill_core::Error {
  fn from(e: Error) -> Self {
    match e {
      invalid @ Error::InvalidUrl { .. } => drill_core::Error::Configuration(invalid.to_string()),
      Error::Http(http) if http.is_decode() => drill_core::Error::Unknown(http.to_string()),
      Error::Http(http) => drill_core::Error::Backend(Box::new(http)),
      Error::Api { status, code, message } => {
        let code = code.as_deref().unwrap_or_default();
        if code == PG_UNDEFINED_TABLE
          || code == PGRST_TABLE_NOT_FOUND
          || (message.starts_with("relation") && message.contains("does not exist"))
        {
          drill_core::Error::Schema(message)
        } else if code == PG_UNIQUE_VIOLATION {
          drill_core::Error::Conflict(message)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
          drill_core::Error::Configuration(format!("{status}: {message}"))
        } else {
          drill_core::Error::backend(format!("{status}: {message}"))
        }
      }
    }
  }
}
