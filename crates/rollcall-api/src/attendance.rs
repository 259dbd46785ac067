//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/attendance` | Optional `?name=` (substring) and `?date=YYYY-MM-DD` |
//! | `POST` | `/attendance` | Body: [`RecordBody`]; at most one record per name per day |

use axum::{
  Json,
  extract::{Query, State},
};
use bytes::Bytes;
use chrono::NaiveDate;
use rollcall_core::{
  attendance::AttendanceRecord,
  photo::PhotoBucket,
  recorder::{RecordOutcome, RecordRequest},
  store::{AttendanceQuery, AttendanceStore},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState, DataResponse,
  error::{ApiError, json_body},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Case-insensitive substring of the name.
  pub name: Option<String>,
  /// Local calendar day, `YYYY-MM-DD`.
  pub date: Option<String>,
}

/// `GET /attendance[?name=...][&date=YYYY-MM-DD]`: newest first.
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  Query(params): Query<ListParams>,
) -> Result<Json<DataResponse<Vec<AttendanceRecord>>>, ApiError>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let day = params
    .date
    .as_deref()
    .map(str::trim)
    .filter(|d| !d.is_empty())
    .map(|d| {
      NaiveDate::parse_from_str(d, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("date must be YYYY-MM-DD, got {d:?}")))
    })
    .transpose()?;

  let query = AttendanceQuery {
    name: params.name.filter(|n| !n.trim().is_empty()),
    day,
  };

  let records = state
    .store
    .list_attendance(query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(DataResponse::new(records)))
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /attendance`.
#[derive(Debug, Default, Deserialize)]
pub struct RecordBody {
  pub name:        Option<String>,
  pub roll_no:     Option<String>,
  /// ISO 8601 timestamp; defaults to the time of the request.
  pub recorded_at: Option<String>,
  pub source:      Option<String>,
}

impl From<RecordBody> for RecordRequest {
  fn from(b: RecordBody) -> Self {
    RecordRequest {
      name:        b.name,
      roll_no:     b.roll_no,
      recorded_at: b.recorded_at,
      source:      b.source,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
  pub success:        bool,
  pub already_exists: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:           Option<Vec<AttendanceRecord>>,
}

/// `POST /attendance`: records the subject unless already recorded that day.
///
/// The body is decoded by hand so malformed JSON gets the usual error
/// envelope instead of the extractor's plain-text rejection.
pub async fn create<S, B>(
  State(state): State<AppState<S, B>>,
  body: Bytes,
) -> Result<Json<RecordResponse>, ApiError>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let body: RecordBody = json_body(&body)?;
  let response = match state.recorder.record(body.into()).await? {
    RecordOutcome::Created(record) => RecordResponse {
      success:        true,
      already_exists: false,
      message:        None,
      data:           Some(vec![record]),
    },
    RecordOutcome::AlreadyRecorded => RecordResponse {
      success:        true,
      already_exists: true,
      message:        Some("Attendance already recorded for today".into()),
      data:           None,
    },
  };
  Ok(Json(response))
}
