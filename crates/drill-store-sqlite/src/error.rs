//! Error type for `drill-store-sqlite`, and its classification into the
//! core taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for drill_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Database(db) => {
        let message = db.to_string();
        if message.contains("no such table") {
          drill_core::Error::Schema(message)
        } else if message.contains("UNIQUE constraint failed") {
          drill_core::Error::Conflict(message)
        } else {
          drill_core::Error::Backend(Box::new(db))
        }
      }
      other => drill_core::Error::Unknown(other.to_string()),
    }
  }
}
