//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with exactly three
//! fractional digits, so lexicographic order equals chronological order.
//! Days are `YYYY-MM-DD`. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rollcall_core::{attendance::AttendanceRecord, student::Student};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_day(day: NaiveDate) -> String { day.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// A `LIKE ... ESCAPE '\'` pattern matching `needle` anywhere.
pub fn contains_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `attendance` row.
pub struct RawRecord {
  pub id:          String,
  pub name:        String,
  pub roll_no:     String,
  pub recorded_at: String,
  pub day:         String,
  pub source:      String,
  pub student_id:  Option<String>,
}

impl RawRecord {
  pub const COLUMNS: &'static str =
    "id, name, roll_no, recorded_at, day, source, student_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      roll_no:     row.get(2)?,
      recorded_at: row.get(3)?,
      day:         row.get(4)?,
      source:      row.get(5)?,
      student_id:  row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      id:          decode_uuid(&self.id)?,
      name:        self.name,
      roll_no:     self.roll_no,
      recorded_at: decode_dt(&self.recorded_at)?,
      day:         decode_day(&self.day)?,
      source:      self.source,
      student_id:  self.student_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub id:         String,
  pub name:       String,
  pub roll_no:    String,
  pub photo_url:  Option<String>,
  pub created_at: String,
}

impl RawStudent {
  pub const COLUMNS: &'static str = "id, name, roll_no, photo_url, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      roll_no:    row.get(2)?,
      photo_url:  row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:         decode_uuid(&self.id)?,
      name:       self.name,
      roll_no:    self.roll_no,
      photo_url:  self.photo_url,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexicographically() {
    let a = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::milliseconds(5);
    assert_eq!(encode_dt(a), "2026-10-18T09:00:00.000Z");
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(contains_pattern("al"), "%al%");
    assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
  }

  #[test]
  fn bad_day_is_an_error() {
    assert!(decode_day("2026-13-01").is_err());
    assert_eq!(
      decode_day("2026-10-18").unwrap(),
      NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    );
  }
}
