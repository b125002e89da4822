//! [`SharedClient`], the application's own Supabase project: the identity
//! provider and the `user_settings` table.

use chrono::{DateTime, Duration, Utc};
use drill_core::{
  identity::{Identity, OAuthProvider, Session, UserSettings},
  store::{IdentityProvider, SettingsStore},
};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  connector::http_client,
  rest::{Rest, send, send_json},
};

/// Schema for the shared project. Rows are readable and writable only by the
/// identity they belong to.
pub const SETTINGS_SQL: &str = "CREATE TABLE IF NOT EXISTS user_settings (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  user_id TEXT NOT NULL UNIQUE,
  supabase_url TEXT NOT NULL,
  supabase_anon_key TEXT NOT NULL,
  created_at TIMESTAMPTZ DEFAULT NOW(),
  updated_at TIMESTAMPTZ DEFAULT NOW()
);

ALTER TABLE user_settings ENABLE ROW LEVEL SECURITY;

DROP POLICY IF EXISTS \"Own settings only\" ON user_settings;
CREATE POLICY \"Own settings only\" ON user_settings
  FOR ALL USING (auth.uid()::text = user_id) WITH CHECK (auth.uid()::text = user_id);
";

const SETTINGS_TABLE: &str = "user_settings";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
  full_name:  Option<String>,
  name:       Option<String>,
  avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
  id:            String,
  #[serde(default)]
  email:         Option<String>,
  #[serde(default)]
  user_metadata: UserMetadata,
}

impl AuthUser {
  fn into_identity(self) -> Identity {
    Identity {
      id:           self.id,
      email:        self.email.unwrap_or_default(),
      display_name: self.user_metadata.full_name.or(self.user_metadata.name),
      avatar_url:   self.user_metadata.avatar_url,
    }
  }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token:  String,
  refresh_token: Option<String>,
  expires_in:    Option<i64>,
  user:          AuthUser,
}

impl TokenResponse {
  fn into_session(self, now: DateTime<Utc>) -> Session {
    Session {
      identity:      self.user.into_identity(),
      access_token:  self.access_token,
      refresh_token: self.refresh_token,
      expires_at:    self.expires_in.map(|secs| now + Duration::seconds(secs)),
    }
  }
}

#[derive(Serialize)]
struct Credentials<'a> {
  email:    &'a str,
  password: &'a str,
}

#[derive(Serialize)]
struct SettingsUpsert<'a> {
  user_id:           &'a str,
  supabase_url:      &'a str,
  supabase_anon_key: &'a str,
  updated_at:        DateTime<Utc>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SharedClient {
  rest: Rest,
}

impl SharedClient {
  pub fn new(url: &str, anon_key: &str) -> Result<Self> {
    Self::with_client(http_client()?, url, anon_key)
  }

  pub fn with_client(http: Client, url: &str, anon_key: &str) -> Result<Self> {
    Ok(Self { rest: Rest::new(http, url, anon_key)? })
  }

  pub fn url(&self) -> &str { self.rest.base() }
}

/// Wrong email or password comes back as 400; report it as rejected
/// credentials rather than a backend fault.
fn credentials_error(e: Error) -> drill_core::Error {
  match e.status() {
    Some(StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY) => {
      drill_core::Error::Configuration(e.to_string())
    }
    _ => e.into(),
  }
}

impl IdentityProvider for SharedClient {
  async fn sign_in_with_password(&self, email: &str, password: &str) -> drill_core::Result<Session> {
    let req = self
      .rest
      .request(Method::POST, "auth/v1/token", None)
      .query(&[("grant_type", "password")])
      .json(&Credentials { email, password });
    let token: TokenResponse = send_json(req).await.map_err(credentials_error)?;
    let session = token.into_session(Utc::now());
    info!(user_id = %session.user_id(), "signed in");
    Ok(session)
  }

  async fn sign_up(&self, email: &str, password: &str) -> drill_core::Result<Option<Session>> {
    let req = self
      .rest
      .request(Method::POST, "auth/v1/signup", None)
      .json(&Credentials { email, password });
    let body: serde_json::Value = send_json(req).await.map_err(credentials_error)?;

    // Projects that require email confirmation answer with the bare user.
    if body.get("access_token").is_none() {
      debug!(%email, "sign-up awaiting email confirmation");
      return Ok(None);
    }
    let token: TokenResponse = serde_json::from_value(body)?;
    Ok(Some(token.into_session(Utc::now())))
  }

  async fn sign_out(&self, session: &Session) -> drill_core::Result<()> {
    send(
      self
        .rest
        .request(Method::POST, "auth/v1/logout", Some(&session.access_token)),
    )
    .await?;
    info!(user_id = %session.user_id(), "signed out");
    Ok(())
  }

  async fn session_for_token(&self, access_token: &str) -> drill_core::Result<Option<Session>> {
    let req = self
      .rest
      .request(Method::GET, "auth/v1/user", Some(access_token));
    match send_json::<AuthUser>(req).await {
      Ok(user) => Ok(Some(Session::new(user.into_identity(), access_token))),
      Err(e) if matches!(e.status(), Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)) => {
        Ok(None)
      }
      Err(e) => Err(e.into()),
    }
  }

  fn authorize_url(
    &self,
    provider: OAuthProvider,
    redirect_to: Option<&str>,
  ) -> drill_core::Result<String> {
    let mut url = Url::parse(&self.rest.url("auth/v1/authorize"))
      .map_err(|e| drill_core::Error::Configuration(e.to_string()))?;
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("provider", provider.as_str());
      if let Some(redirect_to) = redirect_to {
        query.append_pair("redirect_to", redirect_to);
      }
    }
    Ok(url.into())
  }
}

impl SettingsStore for SharedClient {
  async fn get_settings(&self, session: &Session) -> drill_core::Result<Option<UserSettings>> {
    let req = self
      .rest
      .table(Method::GET, SETTINGS_TABLE, Some(&session.access_token))
      .query(&[
        ("select", "*".to_owned()),
        ("user_id", format!("eq.{}", session.user_id())),
      ]);
    let rows: Vec<UserSettings> = send_json(req).await?;
    Ok(rows.into_iter().next())
  }

  async fn save_settings(
    &self,
    session: &Session,
    url: &str,
    key: &str,
  ) -> drill_core::Result<UserSettings> {
    let req = self
      .rest
      .table(Method::POST, SETTINGS_TABLE, Some(&session.access_token))
      .query(&[("on_conflict", "user_id")])
      .header("Prefer", "resolution=merge-duplicates,return=representation")
      .json(&SettingsUpsert {
        user_id:           session.user_id(),
        supabase_url:      url,
        supabase_anon_key: key,
        updated_at:        Utc::now(),
      });
    let rows: Vec<UserSettings> = send_json(req).await?;
    let settings = rows
      .into_iter()
      .next()
      .ok_or_else(|| drill_core::Error::Unknown("settings upsert returned no row".into()))?;
    info!(user_id = %session.user_id(), "user settings saved");
    Ok(settings)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn authorize_url_carries_provider_and_redirect() {
    let client = SharedClient::new("https://shared.supabase.co", "anon").unwrap();
    let url = client
      .authorize_url(OAuthProvider::Github, Some("http://localhost:3000/"))
      .unwrap();
    assert_eq!(
      url,
      "https://shared.supabase.co/auth/v1/authorize?provider=github&redirect_to=http%3A%2F%2Flocalhost%3A3000%2F"
    );
  }

  #[test]
  fn token_response_builds_a_session() {
    let token: TokenResponse = serde_json::from_value(serde_json::json!({
      "access_token": "jwt",
      "token_type": "bearer",
      "expires_in": 3600,
      "refresh_token": "r",
      "user": {
        "id": "8d0fd2b3-9ca7-4b0b-9d2f-3f1d7f1f2b10",
        "email": "ada@example.com",
        "user_metadata": { "full_name": "Ada" }
      }
    }))
    .unwrap();
    let now = Utc::now();
    let session = token.into_session(now);
    assert_eq!(session.user_id(), "8d0fd2b3-9ca7-4b0b-9d2f-3f1d7f1f2b10");
    assert_eq!(session.identity.display_name.as_deref(), Some("Ada"));
    assert_eq!(session.expires_at, Some(now + Duration::seconds(3600)));
  }
}
