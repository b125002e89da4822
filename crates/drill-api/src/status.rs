//! `GET /status`: the caller's connection status, resolved fresh.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use drill_core::{
  ErrorKind,
  status::{DatabaseStatus, resolve},
  store::{Connector, IdentityProvider, SettingsStore},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, extract::CurrentSession};

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusError {
  pub kind:    ErrorKind,
  pub message: String,
}

/// The wire form of [`DatabaseStatus`]. The anon key is never echoed back.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
  pub status:       String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub supabase_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_at:   Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:        Option<StatusError>,
}

impl<T> From<&DatabaseStatus<T>> for StatusBody {
  fn from(status: &DatabaseStatus<T>) -> Self {
    Self {
      status:       status.name().to_owned(),
      supabase_url: status.settings().map(|s| s.supabase_url.clone()),
      updated_at:   status.settings().map(|s| s.updated_at),
      error:        status.error().map(|(kind, message)| StatusError {
        kind,
        message: message.to_owned(),
      }),
    }
  }
}

/// `GET /status`
///
/// Errors are reported in the body with `200 OK`; they describe the
/// backend, not this request.
pub async fn handler<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  CurrentSession(session): CurrentSession,
) -> Json<StatusBody>
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  let status = resolve(&*state.settings, &state.cache, Some(&session)).await;
  Json(StatusBody::from(&status))
}
