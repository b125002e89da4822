//! [`SqliteConnector`] maps a personal-backend URL to a SQLite database.
//!
//! The URL only names the database; the key has no meaning for SQLite but
//! must be non-blank, matching what a hosted backend demands.

use std::path::PathBuf;

use drill_core::store::Connector;
use tracing::debug;

use crate::{SqliteNoteStore, schema::BOOTSTRAP_SQL};

#[derive(Debug, Clone)]
enum Location {
  /// Named shared-cache in-memory databases; they live as long as at least
  /// one connection to them is open.
  Memory,
  /// One `<name>.sqlite3` file per URL under the directory.
  Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SqliteConnector {
  location: Location,
}

impl SqliteConnector {
  pub fn in_memory() -> Self { Self { location: Location::Memory } }

  pub fn in_directory(root: impl Into<PathBuf>) -> Self {
    Self { location: Location::Directory(root.into()) }
  }

  /// The database path or SQLite URI that `url` opens.
  pub fn database_for(&self, url: &str) -> String {
    let name = database_name(url);
    match &self.location {
      Location::Memory => format!("file:{name}?mode=memory&cache=shared"),
      Location::Directory(root) => root
        .join(format!("{name}.sqlite3"))
        .to_string_lossy()
        .into_owned(),
    }
  }
}

impl Connector for SqliteConnector {
  type Client = SqliteNoteStore;

  async fn connect(&self, url: &str, key: &str) -> drill_core::Result<SqliteNoteStore> {
    if url.trim().is_empty() {
      return Err(drill_core::Error::Configuration("project URL is empty".into()));
    }
    if key.trim().is_empty() {
      return Err(drill_core::Error::Configuration("anon key is empty".into()));
    }
    let database = self.database_for(url);
    debug!(%url, %database, "opening sqlite personal backend");
    Ok(SqliteNoteStore::open(database).await?)
  }

  fn bootstrap_script(&self) -> &'static str { BOOTSTRAP_SQL }
}

/// Reduce a URL to a file-name-safe database name: the scheme is dropped and
/// anything outside `[A-Za-z0-9._-]` becomes `_`.
fn database_name(url: &str) -> String {
  let url = url.trim();
  let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
  rest
    .trim_end_matches('/')
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
        c
      } else {
        '_'
      }
    })
    .collect()
}
