//! adboard server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `ADBOARD_*`
//! environment variables, opens the SQLite store, and serves the
//! advertisement API under `/api`.
//!
//! ```toml
//! host       = "0.0.0.0"
//! port       = 8000
//! store_path = "~/.local/share/adboard/adboard.db"
//! anon_rate  = "100/day"
//! ```
//!
//! # Managing principals
//!
//! ```text
//! cargo run -p adboard-api --bin adboard -- --add-user alice
//! cargo run -p adboard-api --bin adboard -- --hash-password
//! ```
//!
//! Both read the password from stdin.

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use adboard_api::{
  AppState, ServerConfig,
  auth::hash_password,
  throttle::{AnonThrottle, ThrottleRate},
};
use adboard_core::store::AdStore;
use adboard_store_sqlite::SqliteStore;
use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How often idle throttle windows are swept.
const THROTTLE_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(author, version, about = "adboard advertisement server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Register a user with a password entered on stdin and exit.
  #[arg(long, value_name = "USERNAME", conflicts_with = "hash_password")]
  add_user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ADBOARD"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let anon_rate = server_cfg
    .anon_rate
    .as_deref()
    .map(str::parse::<ThrottleRate>)
    .transpose()
    .context("invalid anon_rate")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: register a principal and exit.
  if let Some(username) = cli.add_user {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    let user = store
      .add_user(username, hash)
      .await
      .context("failed to add user")?;
    println!("created user {} (id {})", user.username, user.id);
    return Ok(());
  }

  let throttle = Arc::new(AnonThrottle::new(anon_rate, server_cfg.trust_forwarded_for));
  match throttle.rate() {
    Some(rate) => tracing::info!(
      requests = rate.num_requests,
      period = ?rate.period,
      "anonymous throttle enabled"
    ),
    None => tracing::info!("anonymous throttle disabled"),
  }
  spawn_throttle_pruner(throttle.clone());

  let state = AppState {
    store: Arc::new(store),
    throttle,
  };

  let app = Router::new().nest("/api", adboard_api::router(state));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")?;

  Ok(())
}

fn spawn_throttle_pruner(throttle: Arc<AnonThrottle>) {
  if throttle.rate().is_none() {
    return;
  }
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(THROTTLE_PRUNE_INTERVAL);
    loop {
      ticker.tick().await;
      let removed = throttle.prune_expired();
      if removed > 0 {
        tracing::debug!(removed, "pruned expired throttle windows");
      }
    }
  });
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_string();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
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
