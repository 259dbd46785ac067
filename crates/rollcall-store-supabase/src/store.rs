//! [`SupabaseStore`]: [`AttendanceStore`] over PostgREST.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use rollcall_core::{
  attendance::{AttendanceRecord, DEFAULT_SOURCE, DayWindow, NewAttendance},
  store::{AttendanceQuery, AttendanceStore, InsertOutcome},
  student::{NewStudent, Student},
};

use crate::{Error, Result, client::SupabaseClient};

const ATTENDANCE: &str = "attendance";
const STUDENTS: &str = "students";
const STUDENT_COLUMNS: &str = "id,name,roll_no,photo_url,created_at";

type Params = Vec<(&'static str, String)>;

// ─── Rows ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AttendanceInsert<'a> {
  name:        &'a str,
  roll_no:     &'a str,
  recorded_at: String,
  day:         NaiveDate,
  source:      &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  student_id:  Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct AttendanceRow {
  id:          Uuid,
  name:        String,
  roll_no:     Option<String>,
  recorded_at: DateTime<Utc>,
  day:         NaiveDate,
  source:      Option<String>,
  student_id:  Option<Uuid>,
}

impl From<AttendanceRow> for AttendanceRecord {
  fn from(row: AttendanceRow) -> Self {
    AttendanceRecord {
      id:          row.id,
      name:        row.name,
      roll_no:     row.roll_no.unwrap_or_default(),
      recorded_at: row.recorded_at,
      day:         row.day,
      source:      row.source.unwrap_or_else(|| DEFAULT_SOURCE.to_owned()),
      student_id:  row.student_id,
    }
  }
}

#[derive(Debug, Serialize)]
struct StudentInsert<'a> {
  name:      &'a str,
  roll_no:   &'a str,
  photo_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StudentRow {
  id:         Uuid,
  name:       String,
  roll_no:    Option<String>,
  photo_url:  Option<String>,
  created_at: DateTime<Utc>,
}

impl From<StudentRow> for Student {
  fn from(row: StudentRow) -> Self {
    Student {
      id:         row.id,
      name:       row.name,
      roll_no:    row.roll_no.unwrap_or_default(),
      photo_url:  row.photo_url,
      created_at: row.created_at,
    }
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

fn timestamp(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Millis, true) }

/// PostgREST query for the first record of `name` inside `window`.
fn window_params(name: &str, window: &DayWindow) -> Params {
  vec![
    ("select", "*".into()),
    ("name", format!("eq.{name}")),
    ("recorded_at", format!("gte.{}", timestamp(window.start))),
    ("recorded_at", format!("lte.{}", timestamp(window.end))),
    ("order", "recorded_at.asc".into()),
    ("limit", "1".into()),
  ]
}

/// PostgREST query for [`AttendanceStore::list_attendance`].
fn list_params(query: &AttendanceQuery) -> Params {
  let mut params: Params = vec![
    ("select", "*".into()),
    ("order", "recorded_at.desc".into()),
  ];
  if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
    params.push(("name", format!("ilike.*{}*", escape_like(name))));
  }
  if let Some(day) = query.day {
    params.push(("day", format!("eq.{day}")));
  }
  params
}

/// Escape the Postgres `LIKE` metacharacters.
///
/// PostgREST rewrites every `*` in a `like`/`ilike` value to `%` before the
/// backslash escapes apply, so `*` cannot be matched literally. It is sent
/// as the single-character wildcard `_`, which still matches it in place.
fn escape_like(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len());
  for c in needle.chars() {
    match c {
      '%' | '_' | '\\' => {
        out.push('\\');
        out.push(c);
      }
      '*' => out.push('_'),
      _ => out.push(c),
    }
  }
  out
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by the `attendance` and `students` tables of
/// a Supabase project (see `schema.sql`).
#[derive(Debug, Clone)]
pub struct SupabaseStore {
  client: SupabaseClient,
}

impl SupabaseStore {
  pub fn new(client: SupabaseClient) -> Self { Self { client } }

  async fn select<T: serde::de::DeserializeOwned>(
    &self,
    table: &str,
    params: &Params,
  ) -> Result<Vec<T>> {
    let req = self.client.get(self.client.rest(table)).query(params);
    Ok(self.client.send(req).await?.json().await?)
  }

  async fn insert<B: Serialize, T: serde::de::DeserializeOwned>(
    &self,
    table: &str,
    body: &B,
  ) -> Result<T> {
    let req = self
      .client
      .post(self.client.rest(table))
      .header("Prefer", "return=representation")
      .header(ACCEPT, HeaderValue::from_static("application/vnd.pgrst.object+json"))
      .json(&[body]);
    Ok(self.client.send(req).await?.json().await?)
  }
}

impl AttendanceStore for SupabaseStore {
  type Error = Error;

  async fn find_in_window(
    &self,
    name: String,
    window: DayWindow,
  ) -> Result<Option<AttendanceRecord>> {
    let rows: Vec<AttendanceRow> =
      self.select(ATTENDANCE, &window_params(&name, &window)).await?;
    Ok(rows.into_iter().next().map(AttendanceRecord::from))
  }

  async fn insert_attendance(&self, input: NewAttendance) -> Result<InsertOutcome> {
    let body = AttendanceInsert {
      name:        &input.name,
      roll_no:     &input.roll_no,
      recorded_at: timestamp(input.recorded_at),
      day:         input.day,
      source:      &input.source,
      student_id:  input.student_id,
    };

    match self.insert::<_, AttendanceRow>(ATTENDANCE, &body).await {
      Ok(row) => Ok(InsertOutcome::Inserted(row.into())),
      Err(e) if e.is_unique_violation() => {
        debug!(name = %input.name, day = %input.day, "unique key rejected duplicate attendance");
        Ok(InsertOutcome::Duplicate)
      }
      Err(e) => Err(e),
    }
  }

  async fn list_attendance(&self, query: AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let rows: Vec<AttendanceRow> = self.select(ATTENDANCE, &list_params(&query)).await?;
    Ok(rows.into_iter().map(AttendanceRecord::from).collect())
  }

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let body = StudentInsert {
      name:      &input.name,
      roll_no:   &input.roll_no,
      photo_url: input.photo_url.as_deref(),
    };
    let row: StudentRow = self.insert(STUDENTS, &body).await?;
    Ok(row.into())
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    let params: Params = vec![
      ("select", STUDENT_COLUMNS.into()),
      ("order", "name.asc".into()),
    ];
    let rows: Vec<StudentRow> = self.select(STUDENTS, &params).await?;
    Ok(rows.into_iter().map(Student::from).collect())
  }

  async fn find_student_by_name(&self, name: String) -> Result<Option<Student>> {
    let params: Params = vec![
      ("select", STUDENT_COLUMNS.into()),
      ("name", format!("eq.{name}")),
      ("order", "created_at.asc".into()),
      ("limit", "1".into()),
    ];
    let rows: Vec<StudentRow> = self.select(STUDENTS, &params).await?;
    Ok(rows.into_iter().next().map(Student::from))
  }
}
