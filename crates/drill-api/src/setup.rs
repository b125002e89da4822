//! Handlers for the first-time setup flow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/setup` | Body: `{"supabase_url":…,"supabase_anon_key":…}` |
//! | `POST` | `/setup/confirm` | Same body, after running the script |
//! | `GET`  | `/setup/script` | The bootstrap script as `text/plain` |
//!
//! Both `POST`s answer with a step: `create_tables` (carrying the normalized
//! credentials and the script) or `done` (carrying the saved settings).

use axum::{Json, extract::State, http::header, response::IntoResponse};
use drill_core::{
  identity::UserSettings,
  setup::{SetupOutcome, confirm_tables, submit_credentials},
  store::{Connector, IdentityProvider, SettingsStore},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, extract::CurrentSession};

#[derive(Debug, Deserialize)]
pub struct SetupBody {
  pub supabase_url:      String,
  pub supabase_anon_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepBody {
  CreateTables {
    supabase_url:      String,
    supabase_anon_key: String,
    script:            String,
  },
  Done {
    settings: UserSettings,
  },
}

impl From<SetupOutcome> for StepBody {
  fn from(outcome: SetupOutcome) -> Self {
    match outcome {
      SetupOutcome::CreateTables { url, key, script } => Self::CreateTables {
        supabase_url:      url,
        supabase_anon_key: key,
        script:            script.to_owned(),
      },
      SetupOutcome::Done(settings) => Self::Done { settings },
    }
  }
}

/// `POST /setup`
pub async fn submit<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  CurrentSession(session): CurrentSession,
  Json(body): Json<SetupBody>,
) -> Result<Json<StepBody>, ApiError>
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  let outcome = submit_credentials(
    &*state.settings,
    &state.cache,
    &session,
    &body.supabase_url,
    &body.supabase_anon_key,
  )
  .await?;
  Ok(Json(outcome.into()))
}

/// `POST /setup/confirm`
///
/// Expects the credentials from the `create_tables` step; they are
/// normalized the same way `POST /setup` normalizes them.
pub async fn confirm<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  CurrentSession(session): CurrentSession,
  Json(body): Json<SetupBody>,
) -> Result<Json<StepBody>, ApiError>
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  let settings = confirm_tables(
    &*state.settings,
    &state.cache,
    &session,
    &body.supabase_url,
    &body.supabase_anon_key,
  )
  .await?;
  Ok(Json(StepBody::Done { settings }))
}

/// `GET /setup/script`
pub async fn script<I, S, C>(State(state): State<AppState<I, S, C>>) -> impl IntoResponse
where
  C: Connector,
{
  (
    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
    state.cache.connector().bootstrap_script(),
  )
}
