//! The connection status of the signed-in identity's personal backend.
//!
//! [`DatabaseStatus`] has exactly four states. [`UserDatabase`] owns one
//! session's state and re-resolves it on identity change or explicit
//! [`UserDatabase::refresh`]; [`resolve`] is the stateless single step it is
//! built on.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
  ErrorKind,
  cache::ClientCache,
  identity::{Session, UserSettings},
  store::{Connector, SettingsStore},
};

// ─── Status ──────────────────────────────────────────────────────────────────

pub enum DatabaseStatus<T> {
  /// Resolution has not finished, or nobody is signed in.
  Loading,
  /// The identity has no settings row yet.
  NeedsSetup,
  Connected {
    client:   Arc<T>,
    settings: UserSettings,
  },
  /// Resolution failed; only an explicit refresh leaves this state.
  Error {
    kind:    ErrorKind,
    message: String,
  },
}

impl<T> DatabaseStatus<T> {
  /// The wire name of the state.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Loading => "loading",
      Self::NeedsSetup => "needs_setup",
      Self::Connected { .. } => "connected",
      Self::Error { .. } => "error",
    }
  }

  pub fn is_connected(&self) -> bool { matches!(self, Self::Connected { .. }) }

  pub fn client(&self) -> Option<&Arc<T>> {
    match self {
      Self::Connected { client, .. } => Some(client),
      _ => None,
    }
  }

  pub fn settings(&self) -> Option<&UserSettings> {
    match self {
      Self::Connected { settings, .. } => Some(settings),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<(ErrorKind, &str)> {
    match self {
      Self::Error { kind, message } => Some((*kind, message)),
      _ => None,
    }
  }
}

impl<T> Clone for DatabaseStatus<T> {
  fn clone(&self) -> Self {
    match self {
      Self::Loading => Self::Loading,
      Self::NeedsSetup => Self::NeedsSetup,
      Self::Connected { client, settings } => Self::Connected {
        client:   Arc::clone(client),
        settings: settings.clone(),
      },
      Self::Error { kind, message } => Self::Error {
        kind:    *kind,
        message: message.clone(),
      },
    }
  }
}

impl<T> std::fmt::Debug for DatabaseStatus<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Connected { settings, .. } => f
        .debug_struct("Connected")
        .field("url", &settings.supabase_url)
        .finish_non_exhaustive(),
      Self::Error { kind, message } => f
        .debug_struct("Error")
        .field("kind", kind)
        .field("message", message)
        .finish(),
      other => f.write_str(other.name()),
    }
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve the status for `session` in one pass.
///
/// No session stays [`DatabaseStatus::Loading`]. Otherwise the settings row
/// is read from the shared backend and, if present, its client is fetched
/// from `cache`.
pub async fn resolve<S, C>(
  settings_store: &S,
  cache: &ClientCache<C>,
  session: Option<&Session>,
) -> DatabaseStatus<C::Client>
where
  S: SettingsStore,
  C: Connector,
{
  let Some(session) = session else {
    return DatabaseStatus::Loading;
  };

  let settings = match settings_store.get_settings(session).await {
    Ok(Some(settings)) => settings,
    Ok(None) => return DatabaseStatus::NeedsSetup,
    Err(e) => {
      warn!(user_id = %session.user_id(), error = %e, "failed to load user settings");
      return DatabaseStatus::Error {
        kind:    e.kind(),
        message: e.to_string(),
      };
    }
  };

  match cache
    .get(&settings.supabase_url, &settings.supabase_anon_key)
    .await
  {
    Ok(client) => DatabaseStatus::Connected { client, settings },
    Err(e) => {
      warn!(user_id = %session.user_id(), error = %e, "failed to open personal backend");
      DatabaseStatus::Error {
        kind:    e.kind(),
        message: e.to_string(),
      }
    }
  }
}

// ─── UserDatabase ────────────────────────────────────────────────────────────

/// The status state machine for one signed-in flow.
pub struct UserDatabase<S: SettingsStore, C: Connector> {
  settings_store: Arc<S>,
  cache:          Arc<ClientCache<C>>,
  session:        Option<Session>,
  status:         DatabaseStatus<C::Client>,
}

impl<S: SettingsStore, C: Connector> UserDatabase<S, C> {
  /// Start in [`DatabaseStatus::Loading`] with nobody signed in.
  pub fn new(settings_store: Arc<S>, cache: Arc<ClientCache<C>>) -> Self {
    Self {
      settings_store,
      cache,
      session: None,
      status: DatabaseStatus::Loading,
    }
  }

  pub fn status(&self) -> &DatabaseStatus<C::Client> { &self.status }

  pub fn session(&self) -> Option<&Session> { self.session.as_ref() }

  pub fn user_id(&self) -> Option<&str> { self.session.as_ref().map(Session::user_id) }

  pub fn client(&self) -> Option<&Arc<C::Client>> { self.status.client() }

  pub fn settings(&self) -> Option<&UserSettings> { self.status.settings() }

  pub fn error(&self) -> Option<(ErrorKind, &str)> { self.status.error() }

  pub fn settings_store(&self) -> &S { &self.settings_store }

  pub fn cache(&self) -> &ClientCache<C> { &self.cache }

  /// Switch to a new identity (or none) and resolve its status.
  ///
  /// Moving to a different identity drops the previous identity's cached
  /// client, as [`UserDatabase::sign_out`] does.
  pub async fn set_session(&mut self, session: Option<Session>) -> &DatabaseStatus<C::Client> {
    let same_identity = match (&self.session, &session) {
      (Some(old), Some(new)) => old.user_id() == new.user_id(),
      _ => false,
    };
    if !same_identity {
      self.evict_current().await;
    }
    self.session = session;
    self.refresh().await
  }

  /// Re-run resolution from [`DatabaseStatus::Loading`].
  pub async fn refresh(&mut self) -> &DatabaseStatus<C::Client> {
    self.status = DatabaseStatus::Loading;
    self.status = resolve(&*self.settings_store, &self.cache, self.session.as_ref()).await;
    debug!(status = self.status.name(), "database status resolved");
    &self.status
  }

  /// Forget the session and drop its cached client so the credentials do not
  /// outlive the sign-in.
  pub async fn sign_out(&mut self) {
    self.evict_current().await;
    self.session = None;
    self.status = DatabaseStatus::Loading;
  }

  async fn evict_current(&self) {
    if let Some(settings) = self.status.settings() {
      self
        .cache
        .evict(&settings.supabase_url, &settings.supabase_anon_key)
        .await;
    }
  }
}
