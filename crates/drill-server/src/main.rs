//! drill-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `DRILL_*`
//! environment variables, connects to the shared Supabase project, and serves
//! the API and the frontend over HTTP. `PORT` overrides the configured port.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use drill_api::AppState;
use drill_core::cache::ClientCache;
use drill_server::ServerConfig;
use drill_supabase::{SETTINGS_SQL, SharedClient, SupabaseConnector};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "drill study-log server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the SQL that creates the shared `user_settings` table and exit.
  #[arg(long)]
  print_settings_sql: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.print_settings_sql {
    print!("{SETTINGS_SQL}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DRILL"))
    .set_override_option("port", std::env::var("PORT").ok())
    .context("invalid PORT")?
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let shared = SharedClient::new(&server_cfg.shared_url, &server_cfg.shared_anon_key)
    .context("invalid shared project configuration")?;
  let connector = SupabaseConnector::new().context("failed to build HTTP client")?;

  let state = AppState::new(
    shared.clone(),
    shared,
    ClientCache::with_capacity(connector, server_cfg.cache_capacity),
  );

  let static_dir = expand_tilde(&server_cfg.static_dir);
  let app = drill_server::app(state, &static_dir);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(static_dir = %static_dir.display(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      tokio::signal::ctrl_c().await.ok();
    })
    .await
    .context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
