//! HTTP server for the drill study log.
//!
//! Mounts the JSON API under `/api`, answers `/api/health`, and serves the
//! single-page frontend from a static directory with an `index.html`
//! fallback for client-side routes.

use std::path::{Path, PathBuf};

use axum::{Json, Router, routing::get};
use drill_api::{AppState, api_router};
use drill_core::{
  cache::DEFAULT_CAPACITY,
  store::{Connector, IdentityProvider, SettingsStore},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
  cors::CorsLayer,
  services::{ServeDir, ServeFile},
  trace::TraceLayer,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DRILL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Directory holding the built frontend.
  #[serde(default = "default_static_dir")]
  pub static_dir:      PathBuf,
  /// The application's own Supabase project (auth and `user_settings`).
  pub shared_url:      String,
  pub shared_anon_key: String,
  /// Maximum number of personal-backend clients kept alive.
  #[serde(default = "default_cache_capacity")]
  pub cache_capacity:  usize,
}

fn default_host() -> String { "0.0.0.0".into() }

fn default_port() -> u16 { 3000 }

fn default_static_dir() -> PathBuf { PathBuf::from("dist") }

fn default_cache_capacity() -> usize { DEFAULT_CAPACITY }

// ─── Router ──────────────────────────────────────────────────────────────────

/// `GET /api/health`
pub async fn health() -> Json<Value> {
  Json(json!({
    "status":  "ok",
    "service": "drill-server",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

/// Build the full application router.
pub fn app<I, S, C>(state: AppState<I, S, C>, static_dir: &Path) -> Router
where
  I: IdentityProvider + 'static,
  S: SettingsStore + 'static,
  C: Connector + 'static,
{
  let api = Router::new()
    .route("/health", get(health))
    .merge(api_router(state));
  let frontend =
    ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

  Router::new()
    .nest("/api", api)
    .fallback_service(frontend)
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
}
