//! Notes: recorded practice questions with an optional standard answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::attempt::Attempt;

/// A practice question stored in the personal backend's `notes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub id:              Uuid,
  pub user_id:         String,
  pub title:           String,
  pub question:        String,
  pub standard_answer: Option<String>,
  #[serde(default)]
  pub key_points:      Option<String>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// A note joined with every attempt recorded against it.
///
/// Attempts arrive in whatever order the backend returns them; call
/// [`NoteWithAttempts::sort_attempts`] before displaying history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWithAttempts {
  #[serde(flatten)]
  pub note:     Note,
  #[serde(default)]
  pub attempts: Vec<Attempt>,
}

impl NoteWithAttempts {
  pub fn sort_attempts(&mut self) {
    self.attempts.sort_by_key(|a| (a.attempt_number, a.created_at));
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::NoteStore::create_note`].
/// `id`, `created_at` and `updated_at` are assigned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
  pub user_id:         String,
  pub title:           String,
  pub question:        String,
  #[serde(default)]
  pub standard_answer: Option<String>,
  #[serde(default)]
  pub key_points:      Option<String>,
}

impl NewNote {
  pub fn new(
    user_id: impl Into<String>,
    title: impl Into<String>,
    question: impl Into<String>,
  ) -> Self {
    Self {
      user_id:         user_id.into(),
      title:           title.into(),
      question:        question.into(),
      standard_answer: None,
      key_points:      None,
    }
  }

  pub fn with_standard_answer(mut self, answer: impl Into<String>) -> Self {
    self.standard_answer = Some(answer.into());
    self
  }

  pub fn with_key_points(mut self, key_points: impl Into<String>) -> Self {
    self.key_points = Some(key_points.into());
    self
  }

  /// Trim the required texts and store blank optional texts as null.
  pub fn normalized(self) -> Self {
    Self {
      user_id:         self.user_id,
      title:           self.title.trim().to_owned(),
      question:        self.question.trim().to_owned(),
      standard_answer: non_blank(self.standard_answer),
      key_points:      non_blank(self.key_points),
    }
  }
}

/// Partial update for a note. `None` leaves a field untouched; for nullable
/// columns `Some(None)` clears the value.
///
/// `updated_at` is not accepted: every update re-stamps it to now.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question:        Option<String>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub standard_answer: Option<Option<String>>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub key_points:      Option<Option<String>>,
}

impl NoteUpdate {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.question.is_none()
      && self.standard_answer.is_none()
      && self.key_points.is_none()
  }

  /// Trim the texts; blank nullable texts become an explicit clear.
  pub fn normalized(self) -> Self {
    Self {
      title:           self.title.map(|s| s.trim().to_owned()),
      question:        self.question.map(|s| s.trim().to_owned()),
      standard_answer: self.standard_answer.map(non_blank),
      key_points:      self.key_points.map(non_blank),
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Trim `value` and map an empty result to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
}

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Deserialize::deserialize(de).map(Some)
}
