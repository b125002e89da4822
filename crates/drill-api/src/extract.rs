//! Request extractors: the caller's session and their connected backend.

use std::sync::Arc;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use drill_core::{
  identity::{Session, UserSettings},
  status::{DatabaseStatus, resolve},
  store::{Connector, IdentityProvider, SettingsStore},
};

use crate::{AppState, error::ApiError};

/// The bearer token from `Authorization`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// The session behind the request's bearer token.
pub struct CurrentSession(pub Session);

impl<I, S, C> FromRequestParts<AppState<I, S, C>> for CurrentSession
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<I, S, C>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)
      .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;
    state
      .identity
      .session_for_token(token)
      .await?
      .map(CurrentSession)
      .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".into()))
  }
}

/// A session whose status resolved to connected, with its cached client.
///
/// Rejects with [`ApiError::NeedsSetup`] or the status error otherwise.
pub struct Connected<C: Connector> {
  pub session:  Session,
  pub client:   Arc<C::Client>,
  pub settings: UserSettings,
}

impl<I, S, C> FromRequestParts<AppState<I, S, C>> for Connected<C>
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<I, S, C>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
    match resolve(&*state.settings, &state.cache, Some(&session)).await {
      DatabaseStatus::Connected { client, settings } => Ok(Connected {
        session,
        client,
        settings,
      }),
      DatabaseStatus::NeedsSetup | DatabaseStatus::Loading => Err(ApiError::NeedsSetup),
      DatabaseStatus::Error { kind, message } => Err(ApiError::Status { kind, message }),
    }
  }
}
