//! Attendance records and the calendar-day arithmetic behind the
//! once-per-day policy.
//!
//! A record is an immutable claim that a subject was seen at a point in time.
//! Records are never updated or deleted once written.

use chrono::{
  DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
  TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Origin tag used when the caller does not supply one.
pub const DEFAULT_SOURCE: &str = "web";

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// A persisted attendance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id:          Uuid,
  pub name:        String,
  /// Free-text roll number; empty when unknown.
  #[serde(default)]
  pub roll_no:     String,
  pub recorded_at: DateTime<Utc>,
  /// Local calendar day of `recorded_at`; the de-duplication key together
  /// with `name`.
  pub day:         NaiveDate,
  pub source:      String,
  /// Weak reference to the student this record was linked to at insert time.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student_id:  Option<Uuid>,
}

// ─── NewAttendance ───────────────────────────────────────────────────────────

/// Input to [`crate::store::AttendanceStore::insert_attendance`].
/// `id` is always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAttendance {
  pub name:        String,
  pub roll_no:     String,
  pub recorded_at: DateTime<Utc>,
  pub day:         NaiveDate,
  pub source:      String,
  pub student_id:  Option<Uuid>,
}

impl NewAttendance {
  /// Convenience constructor: the day is derived from `recorded_at` in the
  /// process's local timezone, optional fields take their defaults.
  pub fn new(name: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
    Self {
      name: name.into(),
      roll_no: String::new(),
      recorded_at,
      day: DayWindow::local(recorded_at).day,
      source: DEFAULT_SOURCE.to_owned(),
      student_id: None,
    }
  }
}

// ─── DayWindow ───────────────────────────────────────────────────────────────

/// The closed interval `[00:00:00.000, 23:59:59.999]` of one calendar day,
/// expressed as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
  pub day:   NaiveDate,
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl DayWindow {
  /// The window of the local calendar day containing `at`.
  pub fn local(at: DateTime<Utc>) -> Self { Self::in_zone(at, &Local) }

  /// The window of `day` in the process's local timezone.
  pub fn local_day(day: NaiveDate) -> Self { Self::of_day(day, &Local) }

  /// The window of the calendar day containing `at`, as observed in `tz`.
  pub fn in_zone<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> Self {
    Self::of_day(at.with_timezone(tz).date_naive(), tz)
  }

  /// The window of `day` in `tz`.
  ///
  /// A boundary that falls inside a DST gap resolves to the nearest valid
  /// instant inside the day, so the window always covers every instant whose
  /// local date is `day`.
  pub fn of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Self {
    let start_local = day.and_time(NaiveTime::MIN);
    let end_local = day.and_time(last_milli());

    Self {
      day,
      start: resolve(tz, start_local, Boundary::Start),
      end: resolve(tz, end_local, Boundary::End),
    }
  }

  /// Whether `at` falls inside the window (both ends inclusive).
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at <= self.end
  }
}

enum Boundary {
  Start,
  End,
}

fn last_milli() -> NaiveTime {
  NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn resolve<Tz: TimeZone>(
  tz: &Tz,
  local: NaiveDateTime,
  boundary: Boundary,
) -> DateTime<Utc> {
  match tz.from_local_datetime(&local) {
    LocalResult::Single(dt) => dt.with_timezone(&Utc),
    LocalResult::Ambiguous(early, late) => match boundary {
      Boundary::Start => early.with_timezone(&Utc),
      Boundary::End => late.with_timezone(&Utc),
    },
    // Inside a DST gap: walk towards the middle of the day in one-minute
    // steps until a valid local time appears. Gaps are at most a few hours.
    LocalResult::None => {
      let step = match boundary {
        Boundary::Start => chrono::Duration::minutes(1),
        Boundary::End => chrono::Duration::minutes(-1),
      };
      let mut probe = local;
      for _ in 0..(24 * 60) {
        probe += step;
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
          return dt.with_timezone(&Utc);
        }
      }
      Utc.from_utc_datetime(&local)
    }
  }
}

// ─── Timestamp parsing ───────────────────────────────────────────────────────

/// Parse a caller-supplied timestamp.
///
/// Accepts RFC 3339 (`2026-10-18T09:00:00Z`, `...+05:30`) and, failing that,
/// a naive `YYYY-MM-DDTHH:MM:SS[.fff]` interpreted in local time. Returns
/// `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
  use chrono::{FixedOffset, Timelike};

  use super::*;

  fn ist() -> FixedOffset { FixedOffset::east_opt(5 * 3600 + 1800).unwrap() }

  #[test]
  fn window_spans_the_local_day() {
    // 2026-03-01 20:00 UTC is 2026-03-02 01:30 in IST.
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
    let w = DayWindow::in_zone(at, &ist());

    assert_eq!(w.day, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    assert_eq!(w.start, Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap());
    assert_eq!(w.end.hour(), 18);
    assert_eq!(w.end.minute(), 29);
    assert_eq!(w.end.nanosecond(), 999_000_000);
    assert!(w.contains(at));
  }

  #[test]
  fn window_bounds_are_inclusive() {
    let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let w = DayWindow::of_day(day, &Utc);

    assert!(w.contains(w.start));
    assert!(w.contains(w.end));
    assert!(!w.contains(w.end + chrono::Duration::milliseconds(1)));
    assert!(!w.contains(w.start - chrono::Duration::milliseconds(1)));
  }

  #[test]
  fn local_window_contains_its_instant() {
    let at = Utc::now();
    let w = DayWindow::local(at);
    assert!(w.contains(at));
    assert_eq!(w.day, at.with_timezone(&Local).date_naive());
  }

  #[test]
  fn parses_rfc3339_with_offset() {
    let parsed = parse_timestamp("2026-10-18T09:00:00+05:30").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 10, 18, 3, 30, 0).unwrap());
  }

  #[test]
  fn parses_naive_as_local() {
    let parsed = parse_timestamp("2026-10-18T09:00:00.250").unwrap();
    let local = parsed.with_timezone(&Local);
    assert_eq!(local.hour(), 9);
    assert_eq!(local.nanosecond(), 250_000_000);
  }

  #[test]
  fn rejects_garbage() {
    assert!(parse_timestamp("yesterday").is_none());
    assert!(parse_timestamp("   ").is_none());
  }

  #[test]
  fn new_attendance_defaults() {
    let at = Utc::now();
    let input = NewAttendance::new("Alice", at);
    assert_eq!(input.roll_no, "");
    assert_eq!(input.source, DEFAULT_SOURCE);
    assert_eq!(input.day, DayWindow::local(at).day);
    assert!(input.student_id.is_none());
  }
}
