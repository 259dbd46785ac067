//! Async HTTP client wrapping the rollcall JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, SecondsFormat};
use reqwest::{Client, Response};
use rollcall_core::{
  attendance::AttendanceRecord,
  debounce::{Sighting, SubmitOutcome, Submitter},
  student::Student,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

/// Connection settings for the rollcall API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the rollcall REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
  data: T,
}

#[derive(Serialize)]
struct RecordBody<'a> {
  name:        &'a str,
  roll_no:     &'a str,
  recorded_at: String,
  source:      &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordReply {
  #[serde(default)]
  already_exists: bool,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  /// `POST /attendance`: returns whether the subject was already recorded.
  pub async fn record(&self, sighting: &Sighting) -> Result<bool> {
    let body = RecordBody {
      name:        &sighting.name,
      roll_no:     &sighting.roll_no,
      recorded_at: sighting.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
      source:      &sighting.source,
    };
    let resp = self
      .client
      .post(self.url("/attendance"))
      .json(&body)
      .send()
      .await
      .context("POST /attendance failed")?;
    let reply: RecordReply = read("POST /attendance", resp).await?;
    Ok(reply.already_exists)
  }

  /// `GET /attendance[?name=...][&date=...]`
  pub async fn list_attendance(
    &self,
    name: Option<&str>,
    date: Option<NaiveDate>,
  ) -> Result<Vec<AttendanceRecord>> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(name) = name {
      query.push(("name", name.to_owned()));
    }
    if let Some(date) = date {
      query.push(("date", date.to_string()));
    }
    let resp = self
      .client
      .get(self.url("/attendance"))
      .query(&query)
      .send()
      .await
      .context("GET /attendance failed")?;
    let envelope: DataEnvelope<_> = read("GET /attendance", resp).await?;
    Ok(envelope.data)
  }

  // ── Students ──────────────────────────────────────────────────────────────

  /// `GET /students`
  pub async fn list_students(&self) -> Result<Vec<Student>> {
    let resp = self
      .client
      .get(self.url("/students"))
      .send()
      .await
      .context("GET /students failed")?;
    let envelope: DataEnvelope<_> = read("GET /students", resp).await?;
    Ok(envelope.data)
  }

  // ── Recognizer ────────────────────────────────────────────────────────────

  /// `POST /start`: returns the server's message.
  pub async fn start(&self, webcam_url: Option<&str>) -> Result<String> {
    let body = match webcam_url {
      Some(url) => json!({ "ip_webcam_url": url }),
      None => json!({}),
    };
    let resp = self
      .client
      .post(self.url("/start"))
      .json(&body)
      .send()
      .await
      .context("POST /start failed")?;
    message("POST /start", resp).await
  }

  /// `POST /stop`: returns the server's message.
  pub async fn stop(&self) -> Result<String> {
    let resp = self
      .client
      .post(self.url("/stop"))
      .send()
      .await
      .context("POST /stop failed")?;
    message("POST /stop", resp).await
  }

  /// `GET /health`
  pub async fn health(&self) -> Result<Value> {
    let resp = self
      .client
      .get(self.url("/health"))
      .send()
      .await
      .context("GET /health failed")?;
    read("GET /health", resp).await
  }
}

impl Submitter for ApiClient {
  type Error = anyhow::Error;

  async fn submit(&self, sighting: Sighting) -> Result<SubmitOutcome> {
    Ok(if self.record(&sighting).await? {
      SubmitOutcome::AlreadyRecorded
    } else {
      SubmitOutcome::Recorded
    })
  }
}

/// Decode a success body, or turn the server's `{"error": ...}` into an
/// error.
async fn read<T: DeserializeOwned>(what: &str, resp: Response) -> Result<T> {
  let status = resp.status();
  if !status.is_success() {
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    return Err(match body.get("error").and_then(Value::as_str) {
      Some(error) => anyhow!("{what} → {status}: {error}"),
      None => anyhow!("{what} → {status}"),
    });
  }
  resp.json().await.with_context(|| format!("deserialising {what} response"))
}

async fn message(what: &str, resp: Response) -> Result<String> {
  let body: Value = read(what, resp).await?;
  Ok(
    body
      .get("message")
      .and_then(Value::as_str)
      .unwrap_or("ok")
      .to_owned(),
  )
}
