//! rollcall server binary.
//!
//! Reads `rollcall.toml` (or the path given with `--config`) overlaid with
//! environment variables, picks the Supabase backend when it is configured
//! and the local SQLite backend otherwise, and serves the REST API.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use rollcall_api::{AppState, RecognizerControl};
use rollcall_core::{photo::PhotoBucket, store::AttendanceStore};
use rollcall_server::{PHOTO_ROUTE, ServerConfig, expand_tilde};
use rollcall_store_sqlite::{DiskBucket, SqliteStore};
use rollcall_store_supabase::{SupabaseBucket, SupabaseClient, SupabaseConfig, SupabaseStore};
use tokio::{net::TcpListener, signal};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "rollcall attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rollcall.toml")]
  config: PathBuf,
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
  let cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;
  let recognizer = RecognizerControl::new(cfg.recognizer_command());

  match cfg.supabase() {
    Some((url, service_role)) => {
      let client = SupabaseClient::new(&SupabaseConfig {
        url:          url.to_owned(),
        service_role: service_role.to_owned(),
      })
      .context("invalid supabase configuration")?;
      info!(%url, bucket = %cfg.student_bucket, "using supabase backend");

      let store = SupabaseStore::new(client.clone());
      let bucket = SupabaseBucket::new(client, cfg.student_bucket.clone());
      let state = AppState::new(Arc::new(store), Arc::new(bucket), recognizer);
      serve(&cfg, state, None).await
    }
    None => {
      warn!("SUPABASE_URL or SUPABASE_SERVICE_ROLE not set, using local SQLite backend");

      let store_path = expand_tilde(&cfg.store_path);
      let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store at {store_path:?}"))?;
      let photo_dir = expand_tilde(&cfg.photo_dir);
      let bucket = DiskBucket::new(&photo_dir, PHOTO_ROUTE);
      info!(store = %store_path.display(), photos = %photo_dir.display(), "using sqlite backend");

      let state = AppState::new(Arc::new(store), Arc::new(bucket), recognizer);
      serve(&cfg, state, Some(photo_dir)).await
    }
  }
}

async fn serve<S, B>(
  cfg: &ServerConfig,
  state: AppState<S, B>,
  photo_dir: Option<PathBuf>,
) -> anyhow::Result<()>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let recognizer = Arc::clone(&state.recognizer);
  let app = rollcall_server::app(state, &cfg.static_dir, photo_dir.as_deref());
  let address = cfg.address();

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  info!("Listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  if let Err(e) = recognizer.stop().await {
    warn!(error = %e, "failed to stop recognizer on shutdown");
  }
  info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    match signal::ctrl_c().await {
      Ok(()) => info!("received Ctrl+C, shutting down"),
      Err(e) => {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
        info!("received terminate signal, shutting down");
      }
      Err(e) => {
        warn!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
