//! HTTP plumbing shared by the project and shared-backend clients.

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// `Prefer` header asking PostgREST to echo written rows.
pub(crate) const RETURN_REPRESENTATION: &str = "return=representation";

/// A Supabase project root plus the key every request carries.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub(crate) struct Rest {
  http:     Client,
  base:     String,
  anon_key: String,
}

impl Rest {
  pub fn new(http: Client, url: &str, anon_key: &str) -> Result<Self> {
    let parsed = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl {
      url:    url.to_owned(),
      reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
      return Err(Error::InvalidUrl {
        url:    url.to_owned(),
        reason: "expected an http(s) URL with a host".into(),
      });
    }
    Ok(Self {
      http,
      base: parsed.as_str().trim_end_matches('/').to_owned(),
      anon_key: anon_key.trim().to_owned(),
    })
  }

  pub fn base(&self) -> &str { &self.base }

  pub fn url(&self, path: &str) -> String { format!("{}/{}", self.base, path.trim_start_matches('/')) }

  /// A request authenticated with the anon key, or with `bearer` when a user
  /// token is available.
  pub fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
    self
      .http
      .request(method, self.url(path))
      .header("apikey", &self.anon_key)
      .bearer_auth(bearer.unwrap_or(&self.anon_key))
  }

  /// `{base}/rest/v1/{table}`
  pub fn table(&self, method: Method, table: &str, bearer: Option<&str>) -> RequestBuilder {
    self.request(method, &format!("rest/v1/{table}"), bearer)
  }
}

/// Send `req` and turn any non-success status into [`Error::Api`].
pub(crate) async fn send(req: RequestBuilder) -> Result<Response> {
  let resp = req.send().await?;
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::from_response(status, &body))
}

pub(crate) async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
  Ok(send(req).await?.json().await?)
}
