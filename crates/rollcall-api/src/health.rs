//! `GET /health`: liveness plus recognizer state.

use axum::{Json, extract::State};
use rollcall_core::{photo::PhotoBucket, store::AttendanceStore};
use serde::Serialize;

use crate::{AppState, recognizer::RecognizerStatus};

#[derive(Debug, Serialize)]
pub struct Health {
  pub ok:         bool,
  /// Seconds since the router was built.
  pub uptime:     f64,
  pub recognizer: RecognizerStatus,
}

pub async fn handler<S, B>(State(state): State<AppState<S, B>>) -> Json<Health>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  Json(Health {
    ok:         true,
    uptime:     state.started_at.elapsed().as_secs_f64(),
    recognizer: state.recognizer.status().await,
  })
}
