//! SQLite backends for the drill study log.
//!
//! [`SqliteNoteStore`] is a personal backend holding one user's notes and
//! attempts; [`SqliteConnector`] opens one per project URL.
//! [`SqliteSettingsStore`] keeps the shared `user_settings` table.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod connector;
mod encode;
mod schema;
mod settings;
mod store;

pub mod error;

pub use connector::SqliteConnector;
pub use error::{Error, Result};
pub use schema::BOOTSTRAP_SQL;
pub use settings::SqliteSettingsStore;
pub use store::SqliteNoteStore;
