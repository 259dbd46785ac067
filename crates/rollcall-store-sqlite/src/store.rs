//! [`SqliteStore`]: the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use rollcall_core::{
  attendance::{AttendanceRecord, DayWindow, NewAttendance},
  store::{AttendanceQuery, AttendanceStore, InsertOutcome},
  student::{NewStudent, Student},
};

use crate::{
  Result,
  encode::{
    RawRecord, RawStudent, contains_pattern, encode_day, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Whether `err` is a violation of a `UNIQUE` constraint.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = crate::Error;

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn find_in_window(
    &self,
    name: String,
    window: DayWindow,
  ) -> Result<Option<AttendanceRecord>> {
    let start_str = encode_dt(window.start);
    let end_str   = encode_dt(window.end);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM attendance
               WHERE name = ?1 AND recorded_at >= ?2 AND recorded_at <= ?3
               ORDER BY recorded_at
               LIMIT 1",
              RawRecord::COLUMNS
            ),
            rusqlite::params![name, start_str, end_str],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn insert_attendance(&self, input: NewAttendance) -> Result<InsertOutcome> {
    let record = AttendanceRecord {
      id:          Uuid::new_v4(),
      name:        input.name,
      roll_no:     input.roll_no,
      recorded_at: input.recorded_at.trunc_subsecs(3),
      day:         input.day,
      source:      input.source,
      student_id:  input.student_id,
    };

    let id_str         = encode_uuid(record.id);
    let name           = record.name.clone();
    let roll_no        = record.roll_no.clone();
    let recorded_str   = encode_dt(record.recorded_at);
    let day_str        = encode_day(record.day);
    let source         = record.source.clone();
    let student_id_str = record.student_id.map(encode_uuid);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO attendance (id, name, roll_no, recorded_at, day, source, student_id)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            name,
            roll_no,
            recorded_str,
            day_str,
            source,
            student_id_str,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if inserted {
      Ok(InsertOutcome::Inserted(record))
    } else {
      debug!(name = %record.name, day = %record.day, "unique key rejected duplicate attendance");
      Ok(InsertOutcome::Duplicate)
    }
  }

  async fn list_attendance(&self, query: AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let name_pattern = query
      .name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .map(contains_pattern);
    let day_str = query.day.map(encode_day);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM attendance
           WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR day = ?2)
           ORDER BY recorded_at DESC",
          RawRecord::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![name_pattern, day_str], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let student = Student {
      id:         Uuid::new_v4(),
      name:       input.name,
      roll_no:    input.roll_no,
      photo_url:  input.photo_url,
      created_at: Utc::now().trunc_subsecs(3),
    };

    let id_str    = encode_uuid(student.id);
    let name      = student.name.clone();
    let roll_no   = student.roll_no.clone();
    let photo_url = student.photo_url.clone();
    let at_str    = encode_dt(student.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (id, name, roll_no, photo_url, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, roll_no, photo_url, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(student)
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    let raws: Vec<RawStudent> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM students ORDER BY name ASC, created_at ASC",
          RawStudent::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  async fn find_student_by_name(&self, name: String) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM students WHERE name = ?1 ORDER BY created_at ASC LIMIT 1",
              RawStudent::COLUMNS
            ),
            rusqlite::params![name],
            RawStudent::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }
}
