//! [`ProjectClient`], a [`NoteStore`] over a user's own Supabase project.

use chrono::Utc;
use drill_core::{
  attempt::{Attempt, AttemptUpdate, NewAttempt},
  note::{NewNote, Note, NoteUpdate, NoteWithAttempts},
  schema::Table,
  store::NoteStore,
};
use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  rest::{RETURN_REPRESENTATION, Rest, send, send_json},
};

/// PostgREST client for the `notes` and `attempts` tables of one project.
///
/// Requests carry the project's anon key; the bootstrap script's policies
/// allow everything, so no user token is involved.
#[derive(Clone)]
pub struct ProjectClient {
  rest: Rest,
}

impl ProjectClient {
  /// Validate `url` and build a client. No request is made.
  pub fn new(http: Client, url: &str, anon_key: &str) -> Result<Self> {
    Ok(Self { rest: Rest::new(http, url, anon_key)? })
  }

  pub fn url(&self) -> &str { self.rest.base() }

  async fn select<T: DeserializeOwned>(
    &self,
    table: Table,
    query: &[(&str, String)],
  ) -> Result<Vec<T>> {
    send_json(self.rest.table(Method::GET, table.name(), None).query(query)).await
  }

  async fn insert<T, B>(&self, table: Table, body: &B) -> Result<Vec<T>>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    send_json(
      self
        .rest
        .table(Method::POST, table.name(), None)
        .header("Prefer", RETURN_REPRESENTATION)
        .json(body),
    )
    .await
  }

  async fn patch<T, B>(&self, table: Table, id: Uuid, body: &B) -> Result<Vec<T>>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    send_json(
      self
        .rest
        .table(Method::PATCH, table.name(), None)
        .query(&[("id", eq(id))])
        .header("Prefer", RETURN_REPRESENTATION)
        .json(body),
    )
    .await
  }

  async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
    send(
      self
        .rest
        .table(Method::DELETE, table.name(), None)
        .query(&[("id", eq(id))]),
    )
    .await?;
    Ok(())
  }
}

fn eq(id: impl std::fmt::Display) -> String { format!("eq.{id}") }

fn select_all() -> (&'static str, String) { ("select", "*".to_owned()) }

fn newest_first() -> (&'static str, String) { ("order", "updated_at.desc".to_owned()) }

/// The single row a write echoed back.
fn written<T>(rows: Vec<T>, entity: &'static str) -> drill_core::Result<T> {
  rows
    .into_iter()
    .next()
    .ok_or_else(|| drill_core::Error::Unknown(format!("{entity} write returned no row")))
}

impl NoteStore for ProjectClient {
  async fn probe(&self, table: Table) -> drill_core::Result<()> {
    let _: Vec<serde_json::Value> = self
      .select(table, &[("select", "id".to_owned()), ("limit", "1".to_owned())])
      .await?;
    Ok(())
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  async fn list_notes(&self) -> drill_core::Result<Vec<Note>> {
    Ok(self.select(Table::Notes, &[select_all(), newest_first()]).await?)
  }

  async fn list_notes_with_attempts(&self) -> drill_core::Result<Vec<NoteWithAttempts>> {
    Ok(
      self
        .select(Table::Notes, &[
          ("select", "*,attempts(*)".to_owned()),
          newest_first(),
        ])
        .await?,
    )
  }

  async fn get_note(&self, id: Uuid) -> drill_core::Result<Note> {
    let rows: Vec<Note> = self
      .select(Table::Notes, &[select_all(), ("id", eq(id))])
      .await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| drill_core::Error::not_found("note", id))
  }

  async fn create_note(&self, input: NewNote) -> drill_core::Result<Note> {
    let rows = self.insert(Table::Notes, &input.normalized()).await?;
    let note: Note = written(rows, "note")?;
    debug!(note_id = %note.id, "note created");
    Ok(note)
  }

  async fn update_note(&self, id: Uuid, update: NoteUpdate) -> drill_core::Result<Note> {
    let mut body = serde_json::to_value(update.normalized())?;
    if let Some(fields) = body.as_object_mut() {
      fields.insert(
        "updated_at".into(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
      );
    }
    let rows: Vec<Note> = self.patch(Table::Notes, id, &body).await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| drill_core::Error::not_found("note", id))
  }

  async fn delete_note(&self, id: Uuid) -> drill_core::Result<()> {
    self.delete(Table::Notes, id).await?;
    debug!(note_id = %id, "note deleted");
    Ok(())
  }

  // ── Attempts ──────────────────────────────────────────────────────────────

  async fn list_attempts(&self, note_id: Uuid) -> drill_core::Result<Vec<Attempt>> {
    Ok(
      self
        .select(Table::Attempts, &[
          select_all(),
          ("note_id", eq(note_id)),
          ("order", "attempt_number.asc".to_owned()),
        ])
        .await?,
    )
  }

  async fn create_attempt(&self, input: NewAttempt) -> drill_core::Result<Attempt> {
    let rows = self.insert(Table::Attempts, &input).await?;
    let attempt: Attempt = written(rows, "attempt")?;
    debug!(note_id = %attempt.note_id, number = attempt.attempt_number, "attempt created");
    Ok(attempt)
  }

  async fn update_attempt(&self, id: Uuid, update: AttemptUpdate) -> drill_core::Result<Attempt> {
    let rows: Vec<Attempt> = if update.is_empty() {
      self
        .select(Table::Attempts, &[select_all(), ("id", eq(id))])
        .await?
    } else {
      self
        .patch(Table::Attempts, id, &update.normalized())
        .await?
    };
    rows
      .into_iter()
      .next()
      .ok_or_else(|| drill_core::Error::not_found("attempt", id))
  }

  async fn delete_attempt(&self, id: Uuid) -> drill_core::Result<()> {
    self.delete(Table::Attempts, id).await?;
    Ok(())
  }
}
