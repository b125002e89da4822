//! Dashboard read model built from the aggregate notes-with-attempts read.

use serde::{Deserialize, Serialize};

use crate::{
  attempt::Attempt,
  note::{Note, NoteWithAttempts},
};

/// One note's line on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
  pub note:          Note,
  pub attempt_count: usize,
  pub correct_count: usize,
  /// Incorrect attempts still worth reviewing, attempt number ascending.
  pub incorrect:     Vec<Attempt>,
}

/// The whole library, most recently updated note first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySummary {
  pub notes:               Vec<NoteSummary>,
  /// Incorrect attempts across every listed note.
  pub pending_corrections: usize,
}

pub fn summarize(rows: Vec<NoteWithAttempts>) -> LibrarySummary {
  let notes: Vec<NoteSummary> = rows
    .into_iter()
    .map(|mut row| {
      row.sort_attempts();
      let attempt_count = row.attempts.len();
      let (correct, incorrect): (Vec<_>, Vec<_>) =
        row.attempts.into_iter().partition(|a| a.is_correct);
      NoteSummary {
        note: row.note,
        attempt_count,
        correct_count: correct.len(),
        incorrect,
      }
    })
    .collect();
  let pending_corrections = notes.iter().map(|n| n.incorrect.len()).sum();
  LibrarySummary { notes, pending_corrections }
}

/// Case-insensitive substring match on title or question. An empty query
/// matches everything.
pub fn matches_query(note: &Note, query: &str) -> bool {
  let needle = query.trim().to_lowercase();
  needle.is_empty()
    || note.title.to_lowercase().contains(&needle)
    || note.question.to_lowercase().contains(&needle)
}

pub fn filter_notes(notes: Vec<Note>, query: &str) -> Vec<Note> {
  notes
    .into_iter()
    .filter(|n| matches_query(n, query))
    .collect()
}
