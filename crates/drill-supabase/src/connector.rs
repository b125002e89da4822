//! [`SupabaseConnector`] builds [`ProjectClient`]s for the client cache.

use std::time::Duration;

use drill_core::store::Connector;
use reqwest::Client;
use tracing::debug;

use crate::{ProjectClient, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP client every Supabase request goes through.
pub(crate) fn http_client() -> Result<Client> {
  Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Connector over one shared [`reqwest::Client`]; every project client it
/// hands out reuses the same connection pool.
#[derive(Clone)]
pub struct SupabaseConnector {
  http: Client,
}

impl SupabaseConnector {
  pub fn new() -> Result<Self> { Ok(Self { http: http_client()? }) }

  pub fn with_client(http: Client) -> Self { Self { http } }
}

impl Connector for SupabaseConnector {
  type Client = ProjectClient;

  async fn connect(&self, url: &str, key: &str) -> drill_core::Result<ProjectClient> {
    if key.trim().is_empty() {
      return Err(drill_core::Error::Configuration("anon key is empty".into()));
    }
    let client = ProjectClient::new(self.http.clone(), url, key)?;
    debug!(url = client.url(), "project client created");
    Ok(client)
  }
}
