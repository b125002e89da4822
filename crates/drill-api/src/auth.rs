//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/sign-in` | Body: `{"email":…,"password":…}` |
//! | `POST` | `/auth/sign-up` | 201 with a session, or 202 pending email confirmation |
//! | `POST` | `/auth/sign-out` | Drops the cached backend client |
//! | `GET`  | `/auth/session` | The caller's identity |
//! | `GET`  | `/auth/oauth/:provider` | Redirects to the provider; `?redirect_to=` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Redirect},
};
use chrono::{DateTime, Utc};
use drill_core::{
  ErrorKind,
  identity::{Identity, OAuthProvider, Session},
  store::{Connector, IdentityProvider, SettingsStore},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppState, error::ApiError, extract::CurrentSession};

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  fn validate(&self) -> Result<(), ApiError> {
    if self.email.trim().is_empty() || self.password.is_empty() {
      return Err(ApiError::BadRequest("email and password are required".into()));
    }
    Ok(())
  }
}

/// What a client keeps after signing in.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBody {
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<DateTime<Utc>>,
  pub user:          Identity,
}

impl From<Session> for SessionBody {
  fn from(session: Session) -> Self {
    Self {
      access_token:  session.access_token,
      refresh_token: session.refresh_token,
      expires_at:    session.expires_at,
      user:          session.identity,
    }
  }
}

/// Rejected credentials are the caller's fault, not the backend's.
fn rejected(e: drill_core::Error) -> ApiError {
  if e.kind() == ErrorKind::Configuration {
    ApiError::Unauthorized(e.to_string())
  } else {
    e.into()
  }
}

// ─── Sign in / up / out ──────────────────────────────────────────────────────

/// `POST /auth/sign-in`
pub async fn sign_in<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  Json(body): Json<Credentials>,
) -> Result<Json<SessionBody>, ApiError>
where
  I: IdentityProvider,
  C: Connector,
{
  body.validate()?;
  let session = state
    .identity
    .sign_in_with_password(body.email.trim(), &body.password)
    .await
    .map_err(rejected)?;
  Ok(Json(session.into()))
}

/// `POST /auth/sign-up`
pub async fn sign_up<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError>
where
  I: IdentityProvider,
  C: Connector,
{
  body.validate()?;
  let session = state
    .identity
    .sign_up(body.email.trim(), &body.password)
    .await
    .map_err(rejected)?;
  Ok(match session {
    Some(session) => (
      StatusCode::CREATED,
      Json(serde_json::to_value(SessionBody::from(session)).map_err(drill_core::Error::from)?),
    ),
    None => (
      StatusCode::ACCEPTED,
      Json(serde_json::json!({ "confirmation_required": true })),
    ),
  })
}

/// `POST /auth/sign-out`
///
/// Evicts the caller's cached backend client before revoking the token, so
/// the credentials do not outlive the sign-in. The token is revoked even if
/// the settings row cannot be read.
pub async fn sign_out<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  CurrentSession(session): CurrentSession,
) -> Result<StatusCode, ApiError>
where
  I: IdentityProvider,
  S: SettingsStore,
  C: Connector,
{
  match state.settings.get_settings(&session).await {
    Ok(Some(settings)) => {
      state
        .cache
        .evict(&settings.supabase_url, &settings.supabase_anon_key)
        .await;
    }
    Ok(None) => {}
    Err(e) => {
      warn!(user_id = %session.user_id(), error = %e, "could not read settings; cached client kept");
    }
  }
  state.identity.sign_out(&session).await?;
  info!(user_id = %session.user_id(), "session ended");
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/session`
pub async fn current(CurrentSession(session): CurrentSession) -> Json<Identity> {
  Json(session.identity)
}

// ─── OAuth ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OAuthParams {
  pub redirect_to: Option<String>,
}

/// `GET /auth/oauth/:provider[?redirect_to=<url>]`
pub async fn oauth<I, S, C>(
  State(state): State<AppState<I, S, C>>,
  Path(provider): Path<OAuthProvider>,
  Query(params): Query<OAuthParams>,
) -> Result<Redirect, ApiError>
where
  I: IdentityProvider,
  C: Connector,
{
  let url = state
    .identity
    .authorize_url(provider, params.redirect_to.as_deref())?;
  Ok(Redirect::to(&url))
}
