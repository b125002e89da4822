//! Encoding and decoding helpers between drill types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with nanosecond
//! precision, so lexicographic order matches chronological order. UUIDs are
//! stored as hyphenated lowercase strings and booleans as 0/1 integers.

use chrono::{DateTime, SecondsFormat, Utc};
use drill_core::{attempt::Attempt, identity::UserSettings, note::Note};
use rusqlite::{Row, types::Value};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// A nullable text column as a dynamic SQL value.
pub fn text_or_null(value: Option<String>) -> Value {
  value.map_or(Value::Null, Value::Text)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const NOTE_COLUMNS: &str =
  "id, user_id, title, question, standard_answer, key_points, created_at, updated_at";

/// Raw strings read directly from a `notes` row.
pub struct RawNote {
  pub id:              String,
  pub user_id:         String,
  pub title:           String,
  pub question:        String,
  pub standard_answer: Option<String>,
  pub key_points:      Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawNote {
  /// Read a row selected with [`NOTE_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      user_id:         row.get(1)?,
      title:           row.get(2)?,
      question:        row.get(3)?,
      standard_answer: row.get(4)?,
      key_points:      row.get(5)?,
      created_at:      row.get(6)?,
      updated_at:      row.get(7)?,
    })
  }

  pub fn into_note(self) -> Result<Note> {
    Ok(Note {
      id:              decode_uuid(&self.id)?,
      user_id:         self.user_id,
      title:           self.title,
      question:        self.question,
      standard_answer: self.standard_answer,
      key_points:      self.key_points,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const ATTEMPT_COLUMNS: &str = "id, note_id, attempt_number, answer_content, is_correct, \
                                   correction, error_content, usecase, created_at";

/// Raw values read directly from an `attempts` row.
pub struct RawAttempt {
  pub id:             String,
  pub note_id:        String,
  pub attempt_number: i32,
  pub answer_content: String,
  pub is_correct:     bool,
  pub correction:     Option<String>,
  pub error_content:  Option<String>,
  pub usecase:        Option<String>,
  pub created_at:     String,
}

impl RawAttempt {
  /// Read a row selected with [`ATTEMPT_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      note_id:        row.get(1)?,
      attempt_number: row.get(2)?,
      answer_content: row.get(3)?,
      is_correct:     row.get(4)?,
      correction:     row.get(5)?,
      error_content:  row.get(6)?,
      usecase:        row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_attempt(self) -> Result<Attempt> {
    Ok(Attempt {
      id:             decode_uuid(&self.id)?,
      note_id:        decode_uuid(&self.note_id)?,
      attempt_number: self.attempt_number,
      answer_content: self.answer_content,
      is_correct:     self.is_correct,
      correction:     self.correction,
      error_content:  self.error_content,
      usecase:        self.usecase,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const SETTINGS_COLUMNS: &str =
  "id, user_id, supabase_url, supabase_anon_key, created_at, updated_at";

/// Raw strings read directly from a `user_settings` row.
pub struct RawSettings {
  pub id:                String,
  pub user_id:           String,
  pub supabase_url:      String,
  pub supabase_anon_key: String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawSettings {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      user_id:           row.get(1)?,
      supabase_url:      row.get(2)?,
      supabase_anon_key: row.get(3)?,
      created_at:        row.get(4)?,
      updated_at:        row.get(5)?,
    })
  }

  pub fn into_settings(self) -> Result<UserSettings> {
    Ok(UserSettings {
      id:                decode_uuid(&self.id)?,
      user_id:           self.user_id,
      supabase_url:      self.supabase_url,
      supabase_anon_key: self.supabase_anon_key,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexicographically() {
    let early = Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 59).unwrap();
    let late = early + chrono::Duration::nanoseconds(1);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn bad_timestamp_is_a_decode_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
