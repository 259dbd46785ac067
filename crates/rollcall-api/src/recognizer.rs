//! Lifecycle control of the external recognition process.
//!
//! The process is modelled as a two-state machine, `Stopped` and
//! `Running(child)`. `start` is only valid from `Stopped`; `stop` from
//! `Running` kills the child and is a no-op otherwise. A child that exits on
//! its own is reaped the next time the state is inspected.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/start` | Optional body `{"ip_webcam_url":"..."}`; 409 if already running |
//! | `POST` | `/stop`  | Always succeeds |

use std::path::{Path, PathBuf};

use axum::{Json, extract::State};
use bytes::Bytes;
use rollcall_core::{photo::PhotoBucket, store::AttendanceStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
  process::{Child, Command},
  sync::Mutex,
};
use tracing::{info, warn};

use crate::{
  AppState,
  error::{ApiError, json_body},
};

/// Environment variable through which the recognizer learns its camera URL.
pub const WEBCAM_URL_ENV: &str = "IP_WEBCAM_URL";

// ─── Command ─────────────────────────────────────────────────────────────────

/// How to launch the recognizer.
#[derive(Debug, Clone)]
pub struct RecognizerCommand {
  pub program:     String,
  pub args:        Vec<String>,
  pub working_dir: Option<PathBuf>,
}

impl RecognizerCommand {
  /// `<interpreter> <script>`, run from the script's directory.
  pub fn script(interpreter: impl Into<String>, script: impl AsRef<Path>) -> Self {
    let script = std::path::absolute(script.as_ref())
      .unwrap_or_else(|_| script.as_ref().to_path_buf());
    Self {
      program:     interpreter.into(),
      working_dir: script.parent().map(Path::to_path_buf),
      args:        vec![script.to_string_lossy().into_owned()],
    }
  }
}

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
enum ProcessState {
  #[default]
  Stopped,
  Running(Child),
}

/// Observable state of the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RecognizerStatus {
  Stopped,
  Running { pid: Option<u32> },
}

#[derive(Debug, Error)]
pub enum ControlError {
  #[error("recognizer already running")]
  AlreadyRunning,

  #[error("failed to start recognizer: {0}")]
  Spawn(#[source] std::io::Error),

  #[error("failed to stop recognizer: {0}")]
  Kill(#[source] std::io::Error),
}

impl From<ControlError> for ApiError {
  fn from(e: ControlError) -> Self {
    match e {
      ControlError::AlreadyRunning => ApiError::Conflict(e.to_string()),
      other => ApiError::Internal(other.to_string()),
    }
  }
}

/// Owns at most one running recognizer process.
#[derive(Debug)]
pub struct RecognizerControl {
  command: RecognizerCommand,
  state:   Mutex<ProcessState>,
}

impl RecognizerControl {
  pub fn new(command: RecognizerCommand) -> Self {
    Self { command, state: Mutex::new(ProcessState::Stopped) }
  }

  /// `Stopped → Running`. Returns the child's pid.
  pub async fn start(&self, webcam_url: Option<&str>) -> Result<Option<u32>, ControlError> {
    let mut state = self.state.lock().await;
    reap(&mut state);
    if matches!(*state, ProcessState::Running(_)) {
      return Err(ControlError::AlreadyRunning);
    }

    let mut cmd = Command::new(&self.command.program);
    cmd.args(&self.command.args).kill_on_drop(true);
    if let Some(dir) = &self.command.working_dir {
      cmd.current_dir(dir);
    }
    if let Some(url) = webcam_url {
      info!(%url, "starting recognizer with IP webcam");
      cmd.env(WEBCAM_URL_ENV, url);
    }

    let child = cmd.spawn().map_err(ControlError::Spawn)?;
    let pid = child.id();
    info!(program = %self.command.program, ?pid, "recognizer started");
    *state = ProcessState::Running(child);
    Ok(pid)
  }

  /// `Running → Stopped`. Returns whether a process was running.
  pub async fn stop(&self) -> Result<bool, ControlError> {
    let mut state = self.state.lock().await;
    reap(&mut state);
    let ProcessState::Running(mut child) = std::mem::take(&mut *state) else {
      return Ok(false);
    };

    match child.kill().await {
      Ok(()) => {
        info!("recognizer stopped");
        Ok(true)
      }
      // The child may have exited between the reap and the kill.
      Err(_) if matches!(child.try_wait(), Ok(Some(_))) => Ok(true),
      Err(e) => {
        *state = ProcessState::Running(child);
        Err(ControlError::Kill(e))
      }
    }
  }

  pub async fn status(&self) -> RecognizerStatus {
    let mut state = self.state.lock().await;
    reap(&mut state);
    match &*state {
      ProcessState::Stopped => RecognizerStatus::Stopped,
      ProcessState::Running(child) => RecognizerStatus::Running { pid: child.id() },
    }
  }
}

/// Move a child that has already exited back to `Stopped`.
fn reap(state: &mut ProcessState) {
  let ProcessState::Running(child) = state else { return };
  match child.try_wait() {
    Ok(Some(status)) => {
      info!(%status, "recognizer exited");
      *state = ProcessState::Stopped;
    }
    Ok(None) => {}
    Err(e) => warn!(error = %e, "failed to poll recognizer process"),
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StartBody {
  pub ip_webcam_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pid:     Option<u32>,
}

/// `POST /start`: the body is optional.
pub async fn start<S, B>(
  State(state): State<AppState<S, B>>,
  body: Bytes,
) -> Result<Json<ControlResponse>, ApiError>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let body: StartBody = json_body(&body)?;

  let webcam_url = body
    .ip_webcam_url
    .as_deref()
    .map(str::trim)
    .filter(|u| !u.is_empty());
  let pid = state.recognizer.start(webcam_url).await?;

  let source = if webcam_url.is_some() { "IP Webcam" } else { "webcam" };
  Ok(Json(ControlResponse {
    success: true,
    message: format!("Recognizer started with {source}"),
    pid,
  }))
}

/// `POST /stop`
pub async fn stop<S, B>(
  State(state): State<AppState<S, B>>,
) -> Result<Json<ControlResponse>, ApiError>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let message = if state.recognizer.stop().await? {
    "Recognizer stopped"
  } else {
    "Recognizer is not running"
  };
  Ok(Json(ControlResponse { success: true, message: message.into(), pid: None }))
}
