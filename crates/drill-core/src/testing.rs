//! In-memory backends for unit tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  attempt::{Attempt, AttemptUpdate, NewAttempt},
  identity::{Identity, Session, UserSettings},
  note::{NewNote, Note, NoteUpdate, NoteWithAttempts},
  schema::Table,
  store::{Connector, NoteStore, SettingsStore},
};

pub fn session(user_id: &str) -> Session {
  Session::new(Identity::new(user_id, format!("{user_id}@example.com")), "token")
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Project {
  pub unreachable: bool,
  pub has_schema:  bool,
  /// Every attempt insert loses a race with another writer.
  pub contended:   bool,
  /// Attempt inserts tried, successful or not.
  pub inserts:     usize,
  pub notes:       Vec<Note>,
  pub attempts:    Vec<Attempt>,
}

impl Project {
  pub fn ready() -> Self {
    Self {
      has_schema: true,
      ..Self::default()
    }
  }

  pub fn empty() -> Self { Self::default() }

  pub fn offline() -> Self {
    Self {
      unreachable: true,
      ..Self::default()
    }
  }
}

type SharedProject = Arc<Mutex<Project>>;

/// Connector over a registry of in-memory projects. URLs that were never
/// registered behave like a ready project.
#[derive(Default)]
pub struct MemoryConnector {
  projects: Mutex<HashMap<String, SharedProject>>,
  connects: AtomicUsize,
}

impl MemoryConnector {
  pub fn with_project(self, url: &str, project: Project) -> Self {
    self.add_project(url, project);
    self
  }

  pub fn add_project(&self, url: &str, project: Project) {
    self
      .projects
      .lock()
      .unwrap()
      .insert(url.to_owned(), Arc::new(Mutex::new(project)));
  }

  /// Mutate a registered project, e.g. to simulate the user running the
  /// bootstrap script.
  pub fn edit(&self, url: &str, f: impl FnOnce(&mut Project)) {
    let projects = self.projects.lock().unwrap();
    let project = projects.get(url).expect("project registered");
    f(&mut project.lock().unwrap());
  }

  pub fn connect_count(&self) -> usize { self.connects.load(Ordering::SeqCst) }
}

impl Connector for MemoryConnector {
  type Client = MemoryStore;

  async fn connect(&self, url: &str, key: &str) -> Result<MemoryStore> {
    if key.trim().is_empty() {
      return Err(Error::Configuration("anon key is empty".into()));
    }
    self.connects.fetch_add(1, Ordering::SeqCst);
    let project = Arc::clone(
      self
        .projects
        .lock()
        .unwrap()
        .entry(url.to_owned())
        .or_insert_with(|| Arc::new(Mutex::new(Project::ready()))),
    );
    Ok(MemoryStore { project })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryStore {
  project: SharedProject,
}

impl MemoryStore {
  fn with<R>(&self, f: impl FnOnce(&mut Project) -> Result<R>) -> Result<R> {
    let mut project = self.project.lock().unwrap();
    if project.unreachable {
      return Err(Error::backend("connection refused"));
    }
    if !project.has_schema {
      return Err(Error::Schema("relation \"notes\" does not exist".into()));
    }
    f(&mut project)
  }
}

impl NoteStore for MemoryStore {
  async fn probe(&self, _table: Table) -> Result<()> { self.with(|_| Ok(())) }

  async fn list_notes(&self) -> Result<Vec<Note>> {
    self.with(|p| {
      let mut notes = p.notes.clone();
      notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
      Ok(notes)
    })
  }

  async fn list_notes_with_attempts(&self) -> Result<Vec<NoteWithAttempts>> {
    let notes = self.list_notes().await?;
    self.with(|p| {
      Ok(
        notes
          .into_iter()
          .map(|note| {
            let attempts = p
              .attempts
              .iter()
              .filter(|a| a.note_id == note.id)
              .cloned()
              .collect();
            NoteWithAttempts { note, attempts }
          })
          .collect(),
      )
    })
  }

  async fn get_note(&self, id: Uuid) -> Result<Note> {
    self.with(|p| {
      p.notes
        .iter()
        .find(|n| n.id == id)
        .cloned()
        .ok_or_else(|| Error::not_found("note", id))
    })
  }

  async fn create_note(&self, input: NewNote) -> Result<Note> {
    let input = input.normalized();
    self.with(|p| {
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
      p.notes.push(note.clone());
      Ok(note)
    })
  }

  async fn update_note(&self, id: Uuid, update: NoteUpdate) -> Result<Note> {
    self.with(|p| {
      let note = p
        .notes
        .iter_mut()
        .find(|n| n.id == id)
        .ok_or_else(|| Error::not_found("note", id))?;
      if let Some(title) = update.title {
        note.title = title;
      }
      if let Some(question) = update.question {
        note.question = question;
      }
      if let Some(answer) = update.standard_answer {
        note.standard_answer = answer;
      }
      if let Some(points) = update.key_points {
        note.key_points = points;
      }
      note.updated_at = Utc::now();
      Ok(note.clone())
    })
  }

  async fn delete_note(&self, id: Uuid) -> Result<()> {
    self.with(|p| {
      p.notes.retain(|n| n.id != id);
      p.attempts.retain(|a| a.note_id != id);
      Ok(())
    })
  }

  async fn list_attempts(&self, note_id: Uuid) -> Result<Vec<Attempt>> {
    self.with(|p| {
      let mut attempts: Vec<_> = p
        .attempts
        .iter()
        .filter(|a| a.note_id == note_id)
        .cloned()
        .collect();
      attempts.sort_by_key(|a| a.attempt_number);
      Ok(attempts)
    })
  }

  async fn create_attempt(&self, input: NewAttempt) -> Result<Attempt> {
    self.with(|p| {
      p.inserts += 1;
      let taken = p.contended
        || p
          .attempts
          .iter()
          .any(|a| a.note_id == input.note_id && a.attempt_number == input.attempt_number);
      if taken {
        return Err(Error::Conflict("duplicate attempt number".into()));
      }
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
      p.attempts.push(attempt.clone());
      Ok(attempt)
    })
  }

  async fn update_attempt(&self, id: Uuid, update: AttemptUpdate) -> Result<Attempt> {
    self.with(|p| {
      let attempt = p
        .attempts
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| Error::not_found("attempt", id))?;
      if let Some(answer) = update.answer_content {
        attempt.answer_content = answer;
      }
      if let Some(correct) = update.is_correct {
        attempt.is_correct = correct;
      }
      if let Some(correction) = update.correction {
        attempt.correction = correction;
      }
      if let Some(error) = update.error_content {
        attempt.error_content = error;
      }
      if let Some(usecase) = update.usecase {
        attempt.usecase = usecase;
      }
      Ok(attempt.clone())
    })
  }

  async fn delete_attempt(&self, id: Uuid) -> Result<()> {
    self.with(|p| {
      p.attempts.retain(|a| a.id != id);
      Ok(())
    })
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySettings {
  rows:       Mutex<HashMap<String, UserSettings>>,
  fail_reads: AtomicBool,
}

impl MemorySettings {
  pub fn with_row(self, user_id: &str, url: &str, key: &str) -> Self {
    let now = Utc::now();
    self.rows.lock().unwrap().insert(user_id.to_owned(), UserSettings {
      id:                Uuid::new_v4(),
      user_id:           user_id.to_owned(),
      supabase_url:      url.to_owned(),
      supabase_anon_key: key.to_owned(),
      created_at:        now,
      updated_at:        now,
    });
    self
  }

  pub fn fail_reads(&self, fail: bool) { self.fail_reads.store(fail, Ordering::SeqCst); }

  pub fn row(&self, user_id: &str) -> Option<UserSettings> {
    self.rows.lock().unwrap().get(user_id).cloned()
  }
}

impl SettingsStore for MemorySettings {
  async fn get_settings(&self, session: &Session) -> Result<Option<UserSettings>> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(Error::backend("settings read failed"));
    }
    Ok(self.row(session.user_id()))
  }

  async fn save_settings(&self, session: &Session, url: &str, key: &str) -> Result<UserSettings> {
    let now = Utc::now();
    let mut rows = self.rows.lock().unwrap();
    let row = rows
      .entry(session.user_id().to_owned())
      .or_insert_with(|| UserSettings {
        id:                Uuid::new_v4(),
        user_id:           session.user_id().to_owned(),
        supabase_url:      String::new(),
        supabase_anon_key: String::new(),
        created_at:        now,
        updated_at:        now,
      });
    row.supabase_url = url.to_owned();
    row.supabase_anon_key = key.to_owned();
    row.updated_at = now;
    Ok(row.clone())
  }
}
