//! Identities, sessions, and the per-identity settings row.
//!
//! Identities belong to the shared identity provider and are read-only here.
//! [`UserSettings`] is the single source of truth for which personal backend
//! holds an identity's notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Identity ────────────────────────────────────────────────────────────────

/// The signed-in user as known to the shared authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  /// Opaque provider id; stored as `user_id` text in every table.
  pub id:           String,
  pub email:        String,
  pub display_name: Option<String>,
  pub avatar_url:   Option<String>,
}

impl Identity {
  pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      id:           id.into(),
      email:        email.into(),
      display_name: None,
      avatar_url:   None,
    }
  }
}

/// An identity together with the credentials issued for it at sign-in.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
  pub identity:      Identity,
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<DateTime<Utc>>,
}

impl Session {
  pub fn new(identity: Identity, access_token: impl Into<String>) -> Self {
    Self {
      identity,
      access_token: access_token.into(),
      refresh_token: None,
      expires_at: None,
    }
  }

  pub fn user_id(&self) -> &str { &self.identity.id }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("identity", &self.identity)
      .field("expires_at", &self.expires_at)
      .finish_non_exhaustive()
  }
}

/// Federated sign-in providers offered on the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
  Google,
  Github,
}

impl OAuthProvider {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Google => "google",
      Self::Github => "github",
    }
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// One row per identity in the shared `user_settings` table.
///
/// Field names match the table's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
  pub id:                Uuid,
  /// Unique; writes upsert on this column.
  pub user_id:           String,
  pub supabase_url:      String,
  pub supabase_anon_key: String,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}
