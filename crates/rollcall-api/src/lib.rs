//! JSON REST API for rollcall.
//!
//! Exposes an axum [`Router`] backed by any
//! [`rollcall_core::store::AttendanceStore`] and
//! [`rollcall_core::photo::PhotoBucket`]. Static files, CORS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = rollcall_api::api_router(state).fallback_service(ServeDir::new("web"));
//! ```

pub mod attendance;
pub mod error;
pub mod health;
pub mod recognizer;
pub mod students;

use std::{sync::Arc, time::Instant};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use rollcall_core::{
  photo::{MAX_PHOTO_BYTES, PhotoBucket},
  recorder::Recorder,
  store::AttendanceStore,
};
use serde::Serialize;

pub use error::ApiError;
pub use recognizer::{RecognizerCommand, RecognizerControl, RecognizerStatus};

/// Room for the multipart framing and text fields around the photo.
const STUDENT_BODY_LIMIT: usize = MAX_PHOTO_BYTES + 64 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, B> {
  pub store:      Arc<S>,
  pub bucket:     Arc<B>,
  pub recorder:   Recorder<S>,
  pub recognizer: Arc<RecognizerControl>,
  pub started_at: Instant,
}

impl<S, B> Clone for AppState<S, B> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      bucket:     Arc::clone(&self.bucket),
      recorder:   self.recorder.clone(),
      recognizer: Arc::clone(&self.recognizer),
      started_at: self.started_at,
    }
  }
}

impl<S: AttendanceStore, B> AppState<S, B> {
  pub fn new(store: Arc<S>, bucket: Arc<B>, recognizer: RecognizerControl) -> Self {
    Self {
      recorder: Recorder::new(Arc::clone(&store)),
      store,
      bucket,
      recognizer: Arc::new(recognizer),
      started_at: Instant::now(),
    }
  }
}

/// `{"data": [...]}` envelope of the list endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
  pub data: T,
}

impl<T> DataResponse<T> {
  pub fn new(data: T) -> Self { Self { data } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<S, B>(state: AppState<S, B>) -> Router<()>
where
  S: AttendanceStore + 'static,
  B: PhotoBucket + 'static,
{
  Router::new()
    // Attendance
    .route(
      "/attendance",
      get(attendance::list::<S, B>).post(attendance::create::<S, B>),
    )
    // Students
    .route(
      "/students",
      get(students::list::<S, B>)
        .post(students::create::<S, B>)
        .layer(DefaultBodyLimit::max(STUDENT_BODY_LIMIT)),
    )
    // Recognizer
    .route("/start", post(recognizer::start::<S, B>))
    .route("/stop", post(recognizer::stop::<S, B>))
    .route("/health", get(health::handler::<S, B>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use rollcall_store_sqlite::{DiskBucket, SqliteStore};
  use serde_json::{Value, json};
  use tempfile::TempDir;
  use tower::ServiceExt as _;

  use super::*;

  type TestState = AppState<SqliteStore, DiskBucket>;

  async fn make_state(recognizer: RecognizerCommand) -> (TestState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let bucket = DiskBucket::new(dir.path().join("photos"), "/photos");
    let state = AppState::new(
      Arc::new(store),
      Arc::new(bucket),
      RecognizerControl::new(recognizer),
    );
    (state, dir)
  }

  fn idle_recognizer() -> RecognizerCommand {
    RecognizerCommand {
      program:     "sleep".into(),
      args:        vec!["30".into()],
      working_dir: None,
    }
  }

  async fn oneshot_raw(
    state:   TestState,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
    body:    Body,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(body).unwrap();
    api_router(state).oneshot(req).await.unwrap()
  }

  async fn send_json(state: TestState, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = oneshot_raw(
      state,
      method,
      uri,
      vec![(header::CONTENT_TYPE, "application/json")],
      Body::from(body.to_string()),
    )
    .await;
    read_json(resp).await
  }

  async fn get_json(state: TestState, uri: &str) -> (StatusCode, Value) {
    let resp = oneshot_raw(state, "GET", uri, vec![], Body::empty()).await;
    read_json(resp).await
  }

  async fn read_json(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }

  const BOUNDARY: &str = "rollcall-test-boundary";

  fn multipart_body(name: Option<&str>, roll_no: &str, photo: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    let mut text = |field: &str, value: &str| {
      body.extend_from_slice(
        format!(
          "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
        )
        .as_bytes(),
      );
    };
    if let Some(name) = name {
      text("name", name);
    }
    text("roll_no", roll_no);
    if let Some(photo) = photo {
      body.extend_from_slice(
        format!(
          "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; \
           filename=\"face.PNG\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
      );
      body.extend_from_slice(photo);
      body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
  }

  async fn register(state: TestState, body: Vec<u8>) -> (StatusCode, Value) {
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    let resp = oneshot_raw(
      state,
      "POST",
      "/students",
      vec![(header::CONTENT_TYPE, content_type.as_str())],
      Body::from(body),
    )
    .await;
    read_json(resp).await
  }

  // ── Attendance ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn same_day_repeat_reports_already_exists() {
    let (state, _dir) = make_state(idle_recognizer()).await;

    let (status, body) = send_json(
      state.clone(),
      "POST",
      "/attendance",
      json!({
        "name": "Alice",
        "roll_no": "12",
        "source": "web",
        "recorded_at": "2026-10-18T09:00:00",
      }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["alreadyExists"], false);
    assert_eq!(body["data"][0]["name"], "Alice");
    assert_eq!(body["data"][0]["roll_no"], "12");
    assert_eq!(body["data"][0]["day"], "2026-10-18");

    let (status, body) = send_json(
      state.clone(),
      "POST",
      "/attendance",
      json!({
        "name": "Alice",
        "roll_no": "12",
        "source": "web",
        "recorded_at": "2026-10-18T17:00:00",
      }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["alreadyExists"], true);
    assert!(body.get("data").is_none());
    assert!(body["message"].is_string());

    let (_, listed) = get_json(state, "/attendance?date=2026-10-18").await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn different_days_are_recorded_separately() {
    let (state, _dir) = make_state(idle_recognizer()).await;
    for at in ["2026-10-18T09:00:00", "2026-10-19T09:00:00"] {
      let (_, body) = send_json(
        state.clone(),
        "POST",
        "/attendance",
        json!({ "name": "Bob", "recorded_at": at }),
      )
      .await;
      assert_eq!(body["alreadyExists"], false);
    }

    let (_, listed) = get_json(state, "/attendance").await;
    let data = listed["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    // Newest first.
    assert_eq!(data[0]["day"], "2026-10-19");
    assert_eq!(data[0]["source"], "web");
  }

  #[tokio::test]
  async fn missing_name_is_rejected() {
    let (state, _dir) = make_state(idle_recognizer()).await;

    let (status, body) =
      send_json(state.clone(), "POST", "/attendance", json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "name is required");

    let (status, _) = send_json(state.clone(), "POST", "/attendance", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = get_json(state, "/attendance").await;
    assert!(listed["data"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn malformed_record_bodies_get_the_error_envelope() {
    let (state, _dir) = make_state(idle_recognizer()).await;
    let cases: [(&str, Option<&str>); 4] = [
      (r#"{"name": "Alice""#, Some("application/json")),
      (r#"{"name": 5}"#, Some("application/json")),
      ("name=Alice", Some("application/x-www-form-urlencoded")),
      ("", None),
    ];

    for (raw, content_type) in cases {
      let headers = content_type.map(|ct| (header::CONTENT_TYPE, ct)).into_iter().collect();
      let resp = oneshot_raw(state.clone(), "POST", "/attendance", headers, Body::from(raw)).await;
      let (status, body) = read_json(resp).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{raw:?}");
      assert_eq!(body["success"], false, "{raw:?}");
      assert!(body["error"].is_string(), "{raw:?}");
    }

    let (_, listed) = get_json(state, "/attendance").await;
    assert!(listed["data"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn record_body_without_content_type_is_accepted() {
    let (state, _dir) = make_state(idle_recognizer()).await;

    let resp = oneshot_raw(
      state,
      "POST",
      "/attendance",
      vec![],
      Body::from(r#"{"name": "Alice", "recorded_at": "2026-10-18T09:00:00"}"#),
    )
    .await;
    let (status, body) = read_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Alice");
  }

  #[tokio::test]
  async fn list_filters_by_name_and_date() {
    let (state, _dir) = make_state(idle_recognizer()).await;
    for (name, at) in [
      ("Alice Smith", "2026-10-18T09:00:00"),
      ("Bob", "2026-10-18T09:05:00"),
      ("alice jones", "2026-10-19T08:00:00"),
    ] {
      send_json(
        state.clone(),
        "POST",
        "/attendance",
        json!({ "name": name, "recorded_at": at }),
      )
      .await;
    }

    let (_, by_name) = get_json(state.clone(), "/attendance?name=ALICE").await;
    assert_eq!(by_name["data"].as_array().unwrap().len(), 2);

    let (_, both) = get_json(state.clone(), "/attendance?name=alice&date=2026-10-18").await;
    let data = both["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Alice Smith");

    let (status, body) = get_json(state, "/attendance?date=18-10-2026").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
  }

  // ── Students ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn registered_student_is_linked_to_attendance() {
    let (state, dir) = make_state(idle_recognizer()).await;

    let (status, body) =
      register(state.clone(), multipart_body(Some("Alice"), "12", Some(b"fake-png"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let student = &body["data"][0];
    assert_eq!(student["name"], "Alice");
    let photo_url = student["photo_url"].as_str().unwrap();
    let file = photo_url.strip_prefix("/photos/").unwrap();
    assert!(file.ends_with(".png"), "{file}");
    assert_eq!(std::fs::read(dir.path().join("photos").join(file)).unwrap(), b"fake-png");

    let (_, listed) = get_json(state.clone(), "/students").await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let (_, alice) =
      send_json(state.clone(), "POST", "/attendance", json!({ "name": "Alice" })).await;
    assert_eq!(alice["data"][0]["student_id"], student["id"]);

    let (_, carol) = send_json(state, "POST", "/attendance", json!({ "name": "Carol" })).await;
    assert!(carol["data"][0]["student_id"].is_null());
  }

  #[tokio::test]
  async fn registration_requires_name_and_photo() {
    let (state, _dir) = make_state(idle_recognizer()).await;

    let (status, body) = register(state.clone(), multipart_body(None, "1", Some(b"x"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name is required");

    let (status, body) = register(state.clone(), multipart_body(Some("Dan"), "1", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "photo file is required");

    let (_, listed) = get_json(state, "/students").await;
    assert!(listed["data"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn oversized_photo_is_rejected() {
    let (state, _dir) = make_state(idle_recognizer()).await;
    let photo = vec![0u8; MAX_PHOTO_BYTES + 1];
    let (status, body) = register(state, multipart_body(Some("Eve"), "", Some(&photo))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
  }

  // ── Recognizer & health ─────────────────────────────────────────────────────

  #[cfg(unix)]
  #[tokio::test]
  async fn start_twice_conflicts_until_stopped() {
    let (state, _dir) = make_state(idle_recognizer()).await;

    let resp = oneshot_raw(state.clone(), "POST", "/start", vec![], Body::empty()).await;
    let (status, body) = read_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send_json(
      state.clone(),
      "POST",
      "/start",
      json!({ "ip_webcam_url": "http://10.0.0.2:8080/video" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, health) = get_json(state.clone(), "/health").await;
    assert_eq!(health["ok"], true);
    assert_eq!(health["recognizer"]["state"], "running");

    let (status, _) = send_json(state.clone(), "POST", "/stop", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, health) = get_json(state.clone(), "/health").await;
    assert_eq!(health["recognizer"]["state"], "stopped");

    // Stopping again is a no-op.
    let (status, body) = send_json(state, "POST", "/stop", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
  }

  #[tokio::test]
  async fn start_reports_spawn_failure() {
    let (state, _dir) = make_state(RecognizerCommand {
      program:     "/nonexistent/recognizer".into(),
      args:        vec![],
      working_dir: None,
    })
    .await;
    let (status, body) = send_json(state, "POST", "/start", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn health_reports_uptime() {
    let (state, _dir) = make_state(idle_recognizer()).await;
    let (status, body) = get_json(state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert_eq!(body["recognizer"]["state"], "stopped");
  }
}
