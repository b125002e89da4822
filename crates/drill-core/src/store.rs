//! Backend traits and the helpers built on them.
//!
//! Adapters (`drill-store-sqlite`, `drill-supabase`) implement these traits.
//! Higher layers (`drill-api`, `drill-server`) depend on the abstraction, not
//! on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used from
//! multi-threaded runtimes (tokio with `axum`).

use std::future::Future;

use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  attempt::{Attempt, AttemptDraft, AttemptUpdate, NewAttempt, next_attempt_number},
  identity::{OAuthProvider, Session, UserSettings},
  note::{NewNote, Note, NoteUpdate, NoteWithAttempts},
  schema::{BOOTSTRAP_SQL, Table},
};

// ─── Personal backend ────────────────────────────────────────────────────────

/// Typed data access against one user's personal backend.
///
/// Every call is a single round trip without retries; backend failures are
/// classified into [`Error`] and otherwise passed through verbatim.
pub trait NoteStore: Send + Sync {
  /// Minimal read of `table`. Fails with [`Error::Schema`] if the table does
  /// not exist.
  fn probe(&self, table: Table) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Notes ─────────────────────────────────────────────────────────────

  /// All notes, most recently updated first.
  fn list_notes(&self) -> impl Future<Output = Result<Vec<Note>>> + Send + '_;

  /// All notes with their attempts in one read, most recently updated
  /// first. Attempts are not sorted.
  fn list_notes_with_attempts(
    &self,
  ) -> impl Future<Output = Result<Vec<NoteWithAttempts>>> + Send + '_;

  /// Fails with [`Error::NotFound`] if `id` does not exist.
  fn get_note(&self, id: Uuid) -> impl Future<Output = Result<Note>> + Send + '_;

  /// Insert a note and return it with backend-assigned id and timestamps.
  fn create_note(&self, input: NewNote) -> impl Future<Output = Result<Note>> + Send + '_;

  /// Apply `update` and re-stamp `updated_at` to now.
  fn update_note(
    &self,
    id: Uuid,
    update: NoteUpdate,
  ) -> impl Future<Output = Result<Note>> + Send + '_;

  /// Delete a note; the backend cascades to its attempts.
  fn delete_note(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Attempts ──────────────────────────────────────────────────────────

  /// Attempts for `note_id`, attempt number ascending.
  fn list_attempts(
    &self,
    note_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Attempt>>> + Send + '_;

  /// Insert an attempt with a caller-chosen number. Fails with
  /// [`Error::Conflict`] if the number is already taken for the note.
  fn create_attempt(
    &self,
    input: NewAttempt,
  ) -> impl Future<Output = Result<Attempt>> + Send + '_;

  fn update_attempt(
    &self,
    id: Uuid,
    update: AttemptUpdate,
  ) -> impl Future<Output = Result<Attempt>> + Send + '_;

  fn delete_attempt(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send + '_;
}

/// Builds personal-backend clients from a `(url, key)` pair.
pub trait Connector: Send + Sync {
  type Client: NoteStore + 'static;

  fn connect<'a>(
    &'a self,
    url: &'a str,
    key: &'a str,
  ) -> impl Future<Output = Result<Self::Client>> + Send + 'a;

  /// The schema script to show users whose backend lacks the tables.
  fn bootstrap_script(&self) -> &'static str { BOOTSTRAP_SQL }
}

// ─── Shared backend ──────────────────────────────────────────────────────────

/// Storage for the per-identity [`UserSettings`] row.
pub trait SettingsStore: Send + Sync {
  /// `Ok(None)` when the identity has not completed setup.
  fn get_settings<'a>(
    &'a self,
    session: &'a Session,
  ) -> impl Future<Output = Result<Option<UserSettings>>> + Send + 'a;

  /// Insert or overwrite the identity's row (upsert keyed by `user_id`).
  fn save_settings<'a>(
    &'a self,
    session: &'a Session,
    url: &'a str,
    key: &'a str,
  ) -> impl Future<Output = Result<UserSettings>> + Send + 'a;
}

/// Sign-in and token verification against the shared identity provider.
pub trait IdentityProvider: Send + Sync {
  fn sign_in_with_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session>> + Send + 'a;

  /// Register a new account. Returns a session when the provider signs the
  /// user in immediately, `None` when it requires email confirmation first.
  fn sign_up<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Option<Session>>> + Send + 'a;

  fn sign_out<'a>(&'a self, session: &'a Session) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Resolve an access token to its session; `None` if the token is invalid
  /// or expired.
  fn session_for_token<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<Option<Session>>> + Send + 'a;

  /// The URL a browser should visit to start a federated sign-in.
  fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<String>;
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const RECORD_ATTEMPT_TRIES: usize = 3;

/// Record a new attempt on `note_id`, numbering it one past the highest
/// existing number.
///
/// Two writers can read the same history and pick the same number; the
/// backend's `UNIQUE (note_id, attempt_number)` rejects the second insert and
/// this function re-reads and retries a bounded number of times.
pub async fn record_attempt<S>(store: &S, note_id: Uuid, draft: AttemptDraft) -> Result<Attempt>
where
  S: NoteStore,
{
  let mut last_conflict = None;
  for _ in 0..RECORD_ATTEMPT_TRIES {
    let history = store.list_attempts(note_id).await?;
    let number = next_attempt_number(&history);
    let input = NewAttempt::from_draft(note_id, number, draft.clone());
    match store.create_attempt(input).await {
      Ok(attempt) => return Ok(attempt),
      Err(Error::Conflict(msg)) => {
        debug!(%note_id, number, "attempt number taken, retrying");
        last_conflict = Some(msg);
      }
      Err(e) => return Err(e),
    }
  }
  Err(Error::Conflict(last_conflict.unwrap_or_default()))
}
