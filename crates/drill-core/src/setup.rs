//! The settings bootstrap flow.
//!
//! Walks an identity from raw credential input to a verified, persisted
//! [`UserSettings`] row:
//!
//! ```text
//! Input ──submit──▶ Testing ──▶ CreateTables ──confirm──▶ Done
//!   ▲                  │              │
//!   └──── failure ─────┘◀──── back ───┘
//! ```
//!
//! The flow never runs the bootstrap script. It shows the script and then
//! checks that the tables exist.

use tracing::{debug, info};

use crate::{
  Error, Result,
  cache::ClientCache,
  identity::{Session, UserSettings},
  schema::Table,
  store::{Connector, NoteStore, SettingsStore},
};

// ─── URL normalization ───────────────────────────────────────────────────────

/// Trim, add `https://` when no scheme is present, and strip one trailing
/// `/`.
pub fn normalize_url(raw: &str) -> String {
  let trimmed = raw.trim();
  let mut url = if trimmed.starts_with("http") {
    trimmed.to_owned()
  } else {
    format!("https://{trimmed}")
  };
  if url.ends_with('/') {
    url.pop();
  }
  url
}

// ─── Checks ──────────────────────────────────────────────────────────────────

/// Whether both required tables exist on a reachable backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
  Present,
  Missing,
}

/// Confirm the backend answers at all. A missing `notes` table is expected
/// before setup and counts as reachable.
pub async fn probe_connectivity<N: NoteStore>(client: &N) -> Result<()> {
  match client.probe(Table::Notes).await {
    Ok(()) => Ok(()),
    Err(e) if e.is_missing_table() => Ok(()),
    Err(e) => Err(e),
  }
}

/// Check every required table with a minimal read.
pub async fn check_schema<N: NoteStore>(client: &N) -> Result<SchemaState> {
  for table in Table::REQUIRED {
    match client.probe(table).await {
      Ok(()) => {}
      Err(e) if e.is_missing_table() => {
        debug!(%table, "required table missing");
        return Ok(SchemaState::Missing);
      }
      Err(e) => return Err(e),
    }
  }
  Ok(SchemaState::Present)
}

/// The result of submitting credentials.
#[derive(Debug, Clone)]
pub enum SetupOutcome {
  /// Reachable, but the tables must be created by running `script`.
  CreateTables {
    url:    String,
    key:    String,
    script: &'static str,
  },
  /// Verified and persisted.
  Done(UserSettings),
}

/// Validate raw credentials end to end: normalize, probe, check the schema,
/// and persist the settings when the schema is present.
pub async fn submit_credentials<S, C>(
  settings_store: &S,
  cache: &ClientCache<C>,
  session: &Session,
  raw_url: &str,
  raw_key: &str,
) -> Result<SetupOutcome>
where
  S: SettingsStore,
  C: Connector,
{
  if raw_url.trim().is_empty() || raw_key.trim().is_empty() {
    return Err(Error::Configuration(
      "both the project URL and the anon key are required".into(),
    ));
  }
  let url = normalize_url(raw_url);
  let key = raw_key.trim().to_owned();

  let client = cache.get(&url, &key).await?;
  probe_connectivity(&*client).await?;

  match check_schema(&*client).await? {
    SchemaState::Missing => Ok(SetupOutcome::CreateTables {
      url,
      key,
      script: cache.connector().bootstrap_script(),
    }),
    SchemaState::Present => {
      let settings = settings_store.save_settings(session, &url, &key).await?;
      info!(user_id = %session.user_id(), %url, "personal backend configured");
      Ok(SetupOutcome::Done(settings))
    }
  }
}

/// Re-check the schema after the user reports running the script, and
/// persist the settings if the tables now exist.
///
/// `url` and `key` are normally the values carried by
/// [`SetupOutcome::CreateTables`]; they are normalized again before use.
pub async fn confirm_tables<S, C>(
  settings_store: &S,
  cache: &ClientCache<C>,
  session: &Session,
  url: &str,
  key: &str,
) -> Result<UserSettings>
where
  S: SettingsStore,
  C: Connector,
{
  if url.trim().is_empty() || key.trim().is_empty() {
    return Err(Error::Configuration(
      "both the project URL and the anon key are required".into(),
    ));
  }
  let url = normalize_url(url);
  let key = key.trim();

  let client = cache.get(&url, key).await?;
  match check_schema(&*client).await? {
    SchemaState::Missing => Err(Error::Schema(
      "the tables have not been created yet; run the script in your project's SQL editor first"
        .into(),
    )),
    SchemaState::Present => {
      let settings = settings_store.save_settings(session, &url, key).await?;
      info!(user_id = %session.user_id(), %url, "personal backend configured");
      Ok(settings)
    }
  }
}

// ─── Flow ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SetupStep {
  Input,
  Testing,
  CreateTables {
    url:    String,
    key:    String,
    script: &'static str,
  },
  Done(UserSettings),
}

impl SetupStep {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Input => "input",
      Self::Testing => "testing",
      Self::CreateTables { .. } => "create_tables",
      Self::Done(_) => "done",
    }
  }
}

/// Stateful wrapper over [`submit_credentials`] and [`confirm_tables`] for
/// one interactive setup session. The last failure is kept for display.
pub struct SetupFlow<'a, S: SettingsStore, C: Connector> {
  settings_store: &'a S,
  cache:          &'a ClientCache<C>,
  session:        &'a Session,
  step:           SetupStep,
  error:          Option<Error>,
}

impl<'a, S: SettingsStore, C: Connector> SetupFlow<'a, S, C> {
  pub fn new(settings_store: &'a S, cache: &'a ClientCache<C>, session: &'a Session) -> Self {
    Self {
      settings_store,
      cache,
      session,
      step: SetupStep::Input,
      error: None,
    }
  }

  pub fn step(&self) -> &SetupStep { &self.step }

  pub fn error(&self) -> Option<&Error> { self.error.as_ref() }

  /// Test the given credentials. Ends in `CreateTables`, `Done`, or back in
  /// `Input` with [`SetupFlow::error`] set.
  pub async fn submit(&mut self, raw_url: &str, raw_key: &str) -> &SetupStep {
    self.error = None;
    self.step = SetupStep::Testing;
    let outcome =
      submit_credentials(self.settings_store, self.cache, self.session, raw_url, raw_key).await;
    self.step = match outcome {
      Ok(SetupOutcome::CreateTables { url, key, script }) => {
        SetupStep::CreateTables { url, key, script }
      }
      Ok(SetupOutcome::Done(settings)) => SetupStep::Done(settings),
      Err(e) => {
        debug!(error = %e, "credential check failed");
        self.error = Some(e);
        SetupStep::Input
      }
    };
    &self.step
  }

  /// From `CreateTables`, verify the tables now exist. Stays in
  /// `CreateTables` with an error if they do not.
  pub async fn confirm_tables_created(&mut self) -> &SetupStep {
    let SetupStep::CreateTables { url, key, .. } = &self.step else {
      return &self.step;
    };
    let (url, key) = (url.clone(), key.clone());
    self.error = None;
    match confirm_tables(self.settings_store, self.cache, self.session, &url, &key).await {
      Ok(settings) => self.step = SetupStep::Done(settings),
      Err(e) => self.error = Some(e),
    }
    &self.step
  }

  /// Leave `CreateTables` to edit the credentials again.
  pub fn back_to_input(&mut self) {
    if matches!(self.step, SetupStep::CreateTables { .. }) {
      self.step = SetupStep::Input;
      self.error = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    ErrorKind,
    schema::BOOTSTRAP_SQL,
    status::{DatabaseStatus, UserDatabase},
    testing::{MemoryConnector, MemorySettings, Project, session},
  };

  #[test]
  fn normalize_adds_scheme_and_strips_slash() {
    assert_eq!(normalize_url("abc.example.com/"), "https://abc.example.com");
    assert_eq!(normalize_url("https://abc.example.com"), "https://abc.example.com");
    assert_eq!(normalize_url("  http://localhost:54321/ "), "http://localhost:54321");
  }

  #[test]
  fn normalize_strips_only_one_slash() {
    assert_eq!(normalize_url("https://abc.example.com//"), "https://abc.example.com/");
  }

  #[tokio::test]
  async fn blank_input_is_a_configuration_error() {
    let settings = MemorySettings::default();
    let cache = ClientCache::new(MemoryConnector::default());
    let s = session("u1");
    let mut flow = SetupFlow::new(&settings, &cache, &s);

    assert!(matches!(flow.submit("  ", "key").await, SetupStep::Input));
    assert_eq!(flow.error().unwrap().kind(), ErrorKind::Configuration);
    assert!(cache.is_empty().await);
  }

  #[tokio::test]
  async fn missing_schema_yields_create_tables() {
    let settings = MemorySettings::default();
    let connector =
      MemoryConnector::default().with_project("https://abc.example.com", Project::empty());
    let cache = ClientCache::new(connector);
    let s = session("u1");
    let mut flow = SetupFlow::new(&settings, &cache, &s);

    match flow.submit("abc.example.com/", " key ").await {
      SetupStep::CreateTables { url, key, script } => {
        assert_eq!(url, "https://abc.example.com");
        assert_eq!(key, "key");
        assert_eq!(*script, BOOTSTRAP_SQL);
      }
      other => panic!("unexpected step {other:?}"),
    }
    assert!(flow.error().is_none());
    assert!(settings.row("u1").is_none());
  }

  #[tokio::test]
  async fn unreachable_backend_is_a_plain_error() {
    let settings = MemorySettings::default();
    let connector =
      MemoryConnector::default().with_project("https://down.example.com", Project::offline());
    let cache = ClientCache::new(connector);
    let s = session("u1");
    let mut flow = SetupFlow::new(&settings, &cache, &s);

    assert!(matches!(
      flow.submit("https://down.example.com", "key").await,
      SetupStep::Input
    ));
    assert_eq!(flow.error().unwrap().kind(), ErrorKind::Backend);
  }

  #[tokio::test]
  async fn ready_backend_is_saved_immediately() {
    let settings = MemorySettings::default();
    let cache = ClientCache::new(MemoryConnector::default());
    let s = session("u1");
    let mut flow = SetupFlow::new(&settings, &cache, &s);

    let step = flow.submit("ready.example.com", "key").await;
    assert!(matches!(step, SetupStep::Done(row) if row.supabase_url == "https://ready.example.com"));
    assert_eq!(settings.row("u1").unwrap().supabase_anon_key, "key");
  }

  #[tokio::test]
  async fn confirm_before_running_script_stays_put() {
    let settings = MemorySettings::default();
    let connector =
      MemoryConnector::default().with_project("https://abc.example.com", Project::empty());
    let cache = ClientCache::new(connector);
    let s = session("u1");
    let mut flow = SetupFlow::new(&settings, &cache, &s);

    flow.submit("abc.example.com", "key").await;
    let step = flow.confirm_tables_created().await;
    assert_eq!(step.name(), "create_tables");
    assert_eq!(flow.error().unwrap().kind(), ErrorKind::Schema);

    flow.back_to_input();
    assert!(matches!(flow.step(), SetupStep::Input));
    assert!(flow.error().is_none());
  }

  #[tokio::test]
  async fn confirm_saves_the_normalized_url() {
    let settings = MemorySettings::default();
    let cache = ClientCache::new(MemoryConnector::default());
    let s = session("u1");

    let row = confirm_tables(&settings, &cache, &s, " u1.example.com/ ", " anon ")
      .await
      .unwrap();
    assert_eq!(row.supabase_url, "https://u1.example.com");
    assert_eq!(row.supabase_anon_key, "anon");
    assert!(cache.contains("https://u1.example.com", "anon").await);
    assert_eq!(cache.len().await, 1);

    let err = confirm_tables(&settings, &cache, &s, "  ", "anon")
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
  }

  #[tokio::test]
  async fn resubmitting_overwrites_previous_settings() {
    let settings = MemorySettings::default().with_row("u1", "https://old.example.com", "old");
    let cache = ClientCache::new(MemoryConnector::default());
    let s = session("u1");
    let mut flow = SetupFlow::new(&settings, &cache, &s);

    flow.submit("new.example.com", "new").await;
    let row = settings.row("u1").unwrap();
    assert_eq!(row.supabase_url, "https://new.example.com");
    assert_eq!(row.supabase_anon_key, "new");
  }

  #[tokio::test]
  async fn first_time_user_reaches_connected() {
    let settings = Arc::new(MemorySettings::default());
    let connector =
      MemoryConnector::default().with_project("https://u1.example.com", Project::empty());
    let cache = Arc::new(ClientCache::new(connector));
    let s = session("u1");

    let mut db = UserDatabase::new(Arc::clone(&settings), Arc::clone(&cache));
    assert!(matches!(db.set_session(Some(s.clone())).await, DatabaseStatus::NeedsSetup));

    let mut flow = SetupFlow::new(&*settings, &*cache, &s);
    let SetupStep::CreateTables { script, .. } = flow.submit("u1.example.com", "anon").await
    else {
      panic!("expected create_tables");
    };
    assert_eq!(*script, BOOTSTRAP_SQL);

    // The user runs the script in their project's console.
    cache
      .connector()
      .edit("https://u1.example.com", |p| p.has_schema = true);

    assert!(matches!(flow.confirm_tables_created().await, SetupStep::Done(_)));
    assert!(db.refresh().await.is_connected());
    assert_eq!(db.settings().unwrap().supabase_url, "https://u1.example.com");
  }
}
