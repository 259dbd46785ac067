//! Handlers for `/students` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/students` | Ordered by name |
//! | `POST` | `/students` | Multipart: `name`, `roll_no`, `photo` (≤ 5 MiB) |

use axum::{
  Json,
  extract::{
    Multipart, State,
    multipart::MultipartError,
  },
  http::StatusCode,
};
use rollcall_core::{
  photo::{MAX_PHOTO_BYTES, PhotoBucket, PhotoObject},
  store::AttendanceStore,
  student::{NewStudent, Student},
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppState, DataResponse, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /students`
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
) -> Result<Json<DataResponse<Vec<Student>>>, ApiError>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let students = state
    .store
    .list_students()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(DataResponse::new(students)))
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
  pub success: bool,
  pub data:    Vec<Student>,
}

fn multipart_error(e: MultipartError) -> ApiError {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    ApiError::PayloadTooLarge(e.body_text())
  } else {
    ApiError::BadRequest(e.body_text())
  }
}

/// `POST /students`: multipart form with the student's reference photo.
pub async fn create<S, B>(
  State(state): State<AppState<S, B>>,
  mut multipart: Multipart,
) -> Result<Json<RegisterResponse>, ApiError>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  let mut name: Option<String> = None;
  let mut roll_no = String::new();
  let mut photo: Option<PhotoObject> = None;

  while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
    let field_name = field.name().map(str::to_owned);
    match field_name.as_deref() {
      Some("name") => name = Some(field.text().await.map_err(multipart_error)?),
      Some("roll_no") => roll_no = field.text().await.map_err(multipart_error)?,
      Some("photo") => {
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > MAX_PHOTO_BYTES {
          return Err(ApiError::PayloadTooLarge(format!(
            "photo exceeds {MAX_PHOTO_BYTES} bytes"
          )));
        }
        if !bytes.is_empty() {
          photo = Some(PhotoObject::with_random_key(
            file_name.as_deref(),
            content_type.as_deref(),
            bytes,
          ));
        }
      }
      _ => {}
    }
  }

  let name = name
    .map(|n| n.trim().to_owned())
    .filter(|n| !n.is_empty())
    .ok_or_else(|| ApiError::BadRequest("name is required".into()))?;
  let photo = photo.ok_or_else(|| ApiError::BadRequest("photo file is required".into()))?;

  if let Err(e) = state.bucket.ensure_bucket().await {
    warn!(error = %e, "photo bucket check/create failed");
  }

  let photo_url = state
    .bucket
    .upload(photo)
    .await
    .map_err(ApiError::store)?;

  let student = state
    .store
    .add_student(NewStudent {
      name,
      roll_no: roll_no.trim().to_owned(),
      photo_url: Some(photo_url),
    })
    .await
    .map_err(ApiError::store)?;

  info!(id = %student.id, name = %student.name, "student registered");
  Ok(Json(RegisterResponse { success: true, data: vec![student] }))
}
