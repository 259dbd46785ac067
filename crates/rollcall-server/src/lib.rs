//! HTTP server assembly for rollcall.
//!
//! Wraps the API router from `rollcall-api` with static file serving, CORS,
//! and request tracing. Backend selection and process setup live in the
//! binary.

use std::path::{Path, PathBuf};

use axum::Router;
use rollcall_api::{AppState, RecognizerCommand};
use rollcall_core::{photo::PhotoBucket, store::AttendanceStore};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// URL prefix the disk photo bucket is served under.
pub const PHOTO_ROUTE: &str = "/photos";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration.
///
/// Keys match the plain environment variable names, lowercased: `PORT` sets
/// `port`, `SUPABASE_URL` sets `supabase_url`, and so on.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub supabase_url:          Option<String>,
  pub supabase_service_role: Option<String>,
  pub student_bucket:        String,
  pub python_cmd:            String,
  pub python_script:         PathBuf,
  pub store_path:            PathBuf,
  pub photo_dir:             PathBuf,
  pub static_dir:            PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "0.0.0.0".into(),
      port:                  3001,
      supabase_url:          None,
      supabase_service_role: None,
      student_bucket:        "students".into(),
      python_cmd:            "python".into(),
      python_script:         "program.py".into(),
      store_path:            "rollcall.db".into(),
      photo_dir:             "photos".into(),
      static_dir:            "web".into(),
    }
  }
}

impl ServerConfig {
  /// Build the settings from an optional TOML file overlaid with the
  /// process environment.
  pub fn load(file: &Path) -> Result<Self, config::ConfigError> {
    Self::from_sources(file, config::Environment::default())
  }

  fn from_sources(
    file: &Path,
    env: config::Environment,
  ) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  /// Supabase URL and service-role key, when both are set and non-blank.
  pub fn supabase(&self) -> Option<(&str, &str)> {
    let url = self.supabase_url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let role = self
      .supabase_service_role
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())?;
    Some((url, role))
  }

  pub fn recognizer_command(&self) -> RecognizerCommand {
    RecognizerCommand::script(&self.python_cmd, &self.python_script)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router plus static files, with CORS and request tracing.
///
/// `photo_dir` is mounted under [`PHOTO_ROUTE`] when the photos live on
/// disk. `static_dir` is the fallback for unmatched paths when it exists.
pub fn app<S, B>(
  state: AppState<S, B>,
  static_dir: &Path,
  photo_dir: Option<&Path>,
) -> Router
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let mut router = rollcall_api::api_router(state);

  if let Some(dir) = photo_dir {
    router = router.nest_service(PHOTO_ROUTE, ServeDir::new(dir));
  }

  if static_dir.is_dir() {
    info!(dir = %static_dir.display(), "serving static frontend");
    router = router.fallback_service(ServeDir::new(static_dir));
  } else {
    warn!(dir = %static_dir.display(), "static directory not found, frontend disabled");
  }

  router
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
