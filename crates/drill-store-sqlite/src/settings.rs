//! [`SqliteSettingsStore`] keeps `user_settings` rows in a local SQLite
//! database, standing in for the shared backend in single-machine setups.

use std::path::Path;

use chrono::Utc;
use drill_core::{
  identity::{Session, UserSettings},
  store::SettingsStore,
};
use rusqlite::OptionalExtension as _;
use tracing::info;
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawSettings, SETTINGS_COLUMNS, encode_dt, encode_uuid},
  schema::SETTINGS_SCHEMA,
};

/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteSettingsStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteSettingsStore {
  /// Open (or create) a settings database at `path` and run schema
  /// initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SETTINGS_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch(&self, user_id: String) -> Result<Option<UserSettings>> {
    let raw: Option<RawSettings> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = ?1"),
              rusqlite::params![user_id],
              RawSettings::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSettings::into_settings).transpose()
  }
}

impl SettingsStore for SqliteSettingsStore {
  async fn get_settings(&self, session: &Session) -> drill_core::Result<Option<UserSettings>> {
    Ok(self.fetch(session.user_id().to_owned()).await?)
  }

  async fn save_settings(
    &self,
    session: &Session,
    url: &str,
    key: &str,
  ) -> drill_core::Result<UserSettings> {
    let user_id = session.user_id().to_owned();
    let id_str  = encode_uuid(Uuid::new_v4());
    let at_str  = encode_dt(Utc::now());
    let url     = url.to_owned();
    let key     = key.to_owned();

    let params_user = user_id.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_settings (
             id, user_id, supabase_url, supabase_anon_key, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
           ON CONFLICT (user_id) DO UPDATE SET
             supabase_url      = excluded.supabase_url,
             supabase_anon_key = excluded.supabase_anon_key,
             updated_at        = excluded.updated_at",
          rusqlite::params![id_str, params_user, url, key, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;

    info!(%user_id, "user settings saved");
    self
      .fetch(user_id.clone())
      .await?
      .ok_or_else(|| drill_core::Error::Unknown(format!("settings for {user_id} vanished after save")))
  }
}
