//! Attempts: one recorded try at answering a note.
//!
//! An attempt's `attempt_number` is 1-based and unique within its note.
//! Numbering is append-only: deleting an attempt leaves a gap that is never
//! refilled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::note::{double_option, non_blank};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
  pub id:             Uuid,
  pub note_id:        Uuid,
  pub attempt_number: i32,
  pub answer_content: String,
  pub is_correct:     bool,
  pub correction:     Option<String>,
  pub error_content:  Option<String>,
  pub usecase:        Option<String>,
  pub created_at:     DateTime<Utc>,
}

/// The user-entered part of an attempt, before a number is assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptDraft {
  pub answer_content: String,
  #[serde(default)]
  pub is_correct:     bool,
  #[serde(default)]
  pub correction:     Option<String>,
  #[serde(default)]
  pub error_content:  Option<String>,
  #[serde(default)]
  pub usecase:        Option<String>,
}

impl AttemptDraft {
  pub fn correct(answer: impl Into<String>) -> Self {
    Self {
      answer_content: answer.into(),
      is_correct: true,
      ..Self::default()
    }
  }

  pub fn incorrect(answer: impl Into<String>) -> Self {
    Self {
      answer_content: answer.into(),
      is_correct: false,
      ..Self::default()
    }
  }

  pub fn with_correction(mut self, text: impl Into<String>) -> Self {
    self.correction = Some(text.into());
    self
  }

  pub fn with_error(mut self, text: impl Into<String>) -> Self {
    self.error_content = Some(text.into());
    self
  }

  pub fn with_usecase(mut self, text: impl Into<String>) -> Self {
    self.usecase = Some(text.into());
    self
  }
}

/// Input to [`crate::store::NoteStore::create_attempt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttempt {
  pub note_id:        Uuid,
  pub attempt_number: i32,
  pub answer_content: String,
  pub is_correct:     bool,
  pub correction:     Option<String>,
  pub error_content:  Option<String>,
  pub usecase:        Option<String>,
}

impl NewAttempt {
  /// Build the insert payload; blank optional texts become null.
  pub fn from_draft(note_id: Uuid, attempt_number: i32, draft: AttemptDraft) -> Self {
    Self {
      note_id,
      attempt_number,
      answer_content: draft.answer_content.trim().to_owned(),
      is_correct: draft.is_correct,
      correction: non_blank(draft.correction),
      error_content: non_blank(draft.error_content),
      usecase: non_blank(draft.usecase),
    }
  }
}

/// Partial update for an attempt. For nullable columns `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer_content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_correct:     Option<bool>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub correction:     Option<Option<String>>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub error_content:  Option<Option<String>>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub usecase:        Option<Option<String>>,
}

impl AttemptUpdate {
  pub fn is_empty(&self) -> bool {
    self.answer_content.is_none()
      && self.is_correct.is_none()
      && self.correction.is_none()
      && self.error_content.is_none()
      && self.usecase.is_none()
  }

  /// Trim the answer; blank nullable texts become an explicit clear.
  pub fn normalized(self) -> Self {
    Self {
      answer_content: self.answer_content.map(|s| s.trim().to_owned()),
      is_correct:     self.is_correct,
      correction:     self.correction.map(non_blank),
      error_content:  self.error_content.map(non_blank),
      usecase:        self.usecase.map(non_blank),
    }
  }
}

/// The number the next attempt on a note should carry: one past the highest
/// existing number, or 1 for an empty history.
pub fn next_attempt_number(attempts: &[Attempt]) -> i32 {
  attempts
    .iter()
    .map(|a| a.attempt_number)
    .max()
    .unwrap_or(0)
    + 1
}
