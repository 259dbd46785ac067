//! Thin authenticated HTTP client for a Supabase project.

use std::time::Duration;

use reqwest::{
  Client, RequestBuilder, Response,
  header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Deserialize;

use crate::{Error, Result};

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
  /// Project URL, e.g. `https://abcd.supabase.co`.
  pub url:          String,
  /// Service-role key; bypasses row-level security.
  pub service_role: String,
}

/// Async HTTP client for the PostgREST and storage endpoints of one project.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
  http:     Client,
  base_url: String,
}

impl SupabaseClient {
  pub fn new(config: &SupabaseConfig) -> Result<Self> {
    let base_url = config.url.trim().trim_end_matches('/').to_owned();
    if base_url.is_empty() {
      return Err(Error::Config("supabase url is empty".into()));
    }

    let key = HeaderValue::from_str(config.service_role.trim())
      .map_err(|e| Error::Config(format!("service role key: {e}")))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_role.trim()))
      .map_err(|e| Error::Config(format!("service role key: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);

    let http = Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Self { http, base_url })
  }

  /// `<base>/rest/v1/<table>`
  pub(crate) fn rest(&self, table: &str) -> String {
    format!("{}/rest/v1/{table}", self.base_url)
  }

  /// `<base>/storage/v1/<path>`
  pub(crate) fn storage(&self, path: &str) -> String {
    format!("{}/storage/v1/{path}", self.base_url)
  }

  pub(crate) fn get(&self, url: String) -> RequestBuilder { self.http.get(url) }

  pub(crate) fn post(&self, url: String) -> RequestBuilder { self.http.post(url) }

  /// Send `req` and turn a non-success status into [`Error::Api`].
  pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
  }
}

/// Error body shapes of PostgREST (`code`/`message`) and the storage API
/// (`statusCode`/`error`/`message`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  code:    Option<serde_json::Value>,
  message: Option<String>,
  error:   Option<String>,
  details: Option<String>,
}

pub(crate) fn api_error(status: u16, body: &str) -> Error {
  let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
  let code = parsed.code.map(|c| match c {
    serde_json::Value::String(s) => s,
    other => other.to_string(),
  });
  let message = parsed
    .message
    .or(parsed.error)
    .map(|m| match parsed.details {
      Some(details) => format!("{m} ({details})"),
      None => m,
    })
    .unwrap_or_else(|| body.trim().to_owned());
  Error::Api { status, code, message }
}
