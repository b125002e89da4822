//! [`SqliteNoteStore`], the SQLite implementation of [`NoteStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use drill_core::{
  attempt::{Attempt, AttemptUpdate, NewAttempt},
  note::{NewNote, Note, NoteUpdate, NoteWithAttempts},
  schema::Table,
  store::NoteStore,
};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    ATTEMPT_COLUMNS, NOTE_COLUMNS, RawAttempt, RawNote, encode_dt, encode_uuid, text_or_null,
  },
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A personal backend in a single SQLite database.
///
/// Opening never creates tables: until the bootstrap script has been run
/// against the database every read fails with a schema error.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteNoteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteNoteStore {
  /// Open (or create) the database at `path`. SQLite URIs such as
  /// `file:name?mode=memory&cache=shared` are accepted too.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  async fn fetch_note(&self, id: Uuid) -> Result<Option<Note>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawNote> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
              rusqlite::params![id_str],
              RawNote::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawNote::into_note).transpose()
  }

  async fn fetch_attempt(&self, id: Uuid) -> Result<Option<Attempt>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawAttempt> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1"),
              rusqlite::params![id_str],
              RawAttempt::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAttempt::into_attempt).transpose()
  }

  /// Run `UPDATE {table} SET … WHERE id = ?` with the given assignments and
  /// report whether a row matched.
  async fn update_columns(
    &self,
    table: Table,
    id: Uuid,
    assignments: Vec<(&'static str, Value)>,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        let set = assignments
          .iter()
          .enumerate()
          .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "UPDATE {table} SET {set} WHERE id = ?{}",
          assignments.len() + 1
        );
        let params = assignments
          .into_iter()
          .map(|(_, value)| value)
          .chain(std::iter::once(Value::Text(id_str)));
        Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
      })
      .await?;
    Ok(changed > 0)
  }
}

// ─── NoteStore impl ──────────────────────────────────────────────────────────

impl NoteStore for SqliteNoteStore {
  async fn probe(&self, table: Table) -> drill_core::Result<()> {
    self
      .conn
      .call(move |conn| {
        conn
          .query_row(&format!("SELECT 1 FROM {table} LIMIT 1"), [], |_| Ok(()))
          .optional()?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;
    Ok(())
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  async fn list_notes(&self) -> drill_core::Result<Vec<Note>> {
    let raws: Vec<RawNote> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTE_COLUMNS} FROM notes ORDER BY updated_at DESC"
        ))?;
        let rows = stmt
          .query_map([], RawNote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(
      raws
        .into_iter()
        .map(RawNote::into_note)
        .collect::<Result<Vec<_>>>()?,
    )
  }

  async fn list_notes_with_attempts(&self) -> drill_core::Result<Vec<NoteWithAttempts>> {
    let (raw_notes, raw_attempts): (Vec<RawNote>, Vec<RawAttempt>) = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let notes = tx
          .prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY updated_at DESC"
          ))?
          .query_map([], RawNote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let attempts = tx
          .prepare(&format!("SELECT {ATTEMPT_COLUMNS} FROM attempts"))?
          .query_map([], RawAttempt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        tx.commit()?;
        Ok((notes, attempts))
      })
      .await
      .map_err(crate::Error::from)?;

    let mut by_note: HashMap<Uuid, Vec<Attempt>> = HashMap::new();
    for raw in raw_attempts {
      let attempt = raw.into_attempt()?;
      by_note.entry(attempt.note_id).or_default().push(attempt);
    }

    let mut rows = Vec::with_capacity(raw_notes.len());
    for raw in raw_notes {
      let note = raw.into_note()?;
      let attempts = by_note.remove(&note.id).unwrap_or_default();
      rows.push(NoteWithAttempts { note, attempts });
    }
    Ok(rows)
  }

  async fn get_note(&self, id: Uuid) -> drill_core::Result<Note> {
    self
      .fetch_note(id)
      .await?
      .ok_or_else(|| drill_core::Error::not_found("note", id))
  }

  async fn create_note(&self, input: NewNote) -> drill_core::Result<Note> {
    let input = input.normalized();
    let now = Utc::now();
    let note = Note {
      id:              Uuid::new_v4(),
      user_id:         input.user_id,
      title:           input.title,
      question:        input.question,
      standard_answer: input.standard_answer,
      key_points:      input.key_points,
      created_at:      now,
      updated_at:      now,
    };

    let id_str   = encode_uuid(note.id);
    let user_id  = note.user_id.clone();
    let title    = note.title.clone();
    let question = note.question.clone();
    let answer   = note.standard_answer.clone();
    let points   = note.key_points.clone();
    let at_str   = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notes (
             id, user_id, title, question, standard_answer, key_points,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, user_id, title, question, answer, points, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;

    debug!(note_id = %note.id, "note created");
    Ok(note)
  }

  async fn update_note(&self, id: Uuid, update: NoteUpdate) -> drill_core::Result<Note> {
    let update = update.normalized();
    let mut assignments = vec![("updated_at", Value::Text(encode_dt(Utc::now())))];
    if let Some(title) = update.title {
      assignments.push(("title", Value::Text(title)));
    }
    if let Some(question) = update.question {
      assignments.push(("question", Value::Text(question)));
    }
    if let Some(answer) = update.standard_answer {
      assignments.push(("standard_answer", text_or_null(answer)));
    }
    if let Some(points) = update.key_points {
      assignments.push(("key_points", text_or_null(points)));
    }

    if !self.update_columns(Table::Notes, id, assignments).await? {
      return Err(drill_core::Error::not_found("note", id));
    }
    self.get_note(id).await
  }

  async fn delete_note(&self, id: Uuid) -> drill_core::Result<()> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM notes WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await
      .map_err(crate::Error::from)?;
    debug!(note_id = %id, deleted, "note deleted");
    Ok(())
  }

  // ── Attempts ──────────────────────────────────────────────────────────────

  async fn list_attempts(&self, note_id: Uuid) -> drill_core::Result<Vec<Attempt>> {
    let id_str = encode_uuid(note_id);
    let raws: Vec<RawAttempt> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE note_id = ?1 ORDER BY attempt_number ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawAttempt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(
      raws
        .into_iter()
        .map(RawAttempt::into_attempt)
        .collect::<Result<Vec<_>>>()?,
    )
  }

  async fn create_attempt(&self, input: NewAttempt) -> drill_core::Result<Attempt> {
    let attempt = Attempt {
      id:             Uuid::new_v4(),
      note_id:        input.note_id,
      attempt_number: input.attempt_number,
      answer_content: input.answer_content,
      is_correct:     input.is_correct,
      correction:     input.correction,
      error_content:  input.error_content,
      usecase:        input.usecase,
      created_at:     Utc::now(),
    };

    let id_str      = encode_uuid(attempt.id);
    let note_id_str = encode_uuid(attempt.note_id);
    let number      = attempt.attempt_number;
    let answer      = attempt.answer_content.clone();
    let is_correct  = attempt.is_correct;
    let correction  = attempt.correction.clone();
    let error       = attempt.error_content.clone();
    let usecase     = attempt.usecase.clone();
    let at_str      = encode_dt(attempt.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO attempts (
             id, note_id, attempt_number, answer_content, is_correct,
             correction, error_content, usecase, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            note_id_str,
            number,
            answer,
            is_correct,
            correction,
            error,
            usecase,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;

    debug!(note_id = %attempt.note_id, number, "attempt created");
    Ok(attempt)
  }

  async fn update_attempt(&self, id: Uuid, update: AttemptUpdate) -> drill_core::Result<Attempt> {
    let update = update.normalized();
    let mut assignments = Vec::new();
    if let Some(answer) = update.answer_content {
      assignments.push(("answer_content", Value::Text(answer)));
    }
    if let Some(correct) = update.is_correct {
      assignments.push(("is_correct", Value::Integer(i64::from(correct))));
    }
    if let Some(correction) = update.correction {
      assignments.push(("correction", text_or_null(correction)));
    }
    if let Some(error) = update.error_content {
      assignments.push(("error_content", text_or_null(error)));
    }
    if let Some(usecase) = update.usecase {
      assignments.push(("usecase", text_or_null(usecase)));
    }

    if !assignments.is_empty() && !self.update_columns(Table::Attempts, id, assignments).await? {
      return Err(drill_core::Error::not_found("attempt", id));
    }
    self
      .fetch_attempt(id)
      .await?
      .ok_or_else(|| drill_core::Error::not_found("attempt", id))
  }

  async fn delete_attempt(&self, id: Uuid) -> drill_core::Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM attempts WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;
    Ok(())
  }
}
