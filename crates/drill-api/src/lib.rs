//! JSON REST API for the drill study log.
//!
//! Exposes an axum [`Router`] backed by any identity provider, settings
//! store and personal-backend connector from [`drill_core::store`].
//! Requests authenticate with `Authorization: Bearer <access token>`; TLS and
//! static assets are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", drill_api::api_router(state.clone()))
//! ```

pub mod attempts;
pub mod auth;
pub mod error;
pub mod extract;
pub mod notes;
pub mod setup;
pub mod status;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use drill_core::{
  cache::ClientCache,
  store::{Connector, IdentityProvider, SettingsStore},
};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<I, S, C: Connector> {
  pub identity: Arc<I>,
  pub settings: Arc<S>,
  pub cache:    Arc<ClientCache<C>>,
}

impl<I, S, C: Connector> AppState<I, S, C> {
  pub fn new(identity: I, settings: S, cache: ClientCache<C>) -> Self {
    Self {
      identity: Arc::new(identity),
      settings: Arc::new(settings),
      cache:    Arc::new(cache),
    }
  }
}

impl<I, S, C: Connector> Clone for AppState<I, S, C> {
  fn clone(&self) -> Self {
    Self {
      identity: Arc::clone(&self.identity),
      settings: Arc::clone(&self.settings),
      cache:    Arc::clone(&self.cache),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<I, S, C>(state: AppState<I, S, C>) -> Router<()>
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  Router::new()
    // Auth
    .route("/auth/sign-in", post(auth::sign_in::<I, S, C>))
    .route("/auth/sign-up", post(auth::sign_up::<I, S, C>))
    .route("/auth/sign-out", post(auth::sign_out::<I, S, C>))
    .route("/auth/session", get(auth::current))
    .route("/auth/oauth/{provider}", get(auth::oauth::<I, S, C>))
    // Connection status and setup
    .route("/status", get(status::handler::<I, S, C>))
    .route("/setup", post(setup::submit::<I, S, C>))
    .route("/setup/confirm", post(setup::confirm::<I, S, C>))
    .route("/setup/script", get(setup::script::<I, S, C>))
    // Notes
    .route("/notes", get(notes::list::<C>).post(notes::create::<C>))
    .route("/notes/summary", get(notes::summary::<C>))
    .route(
      "/notes/{id}",
      get(notes::get_one::<C>)
        .patch(notes::update::<C>)
        .delete(notes::delete::<C>),
    )
    // Attempts
    .route(
      "/notes/{id}/attempts",
      get(attempts::list::<C>).post(attempts::create::<C>),
    )
    .route(
      "/attempts/{id}",
      patch(attempts::update::<C>).delete(attempts::delete::<C>),
    )
    .with_state(state)
}
