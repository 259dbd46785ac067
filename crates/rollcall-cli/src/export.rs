//! CSV export of attendance records and the student roster.

use std::io::{self, Write};

use chrono::SecondsFormat;
use rollcall_core::{attendance::AttendanceRecord, student::Student};

const ATTENDANCE_HEADER: &[&str] = &["name", "roll_no", "recorded_at", "source"];
const STUDENT_HEADER: &[&str] = &["name", "roll_no", "photo_url"];

/// Write `records` as CSV.
pub fn write_attendance<W: Write + ?Sized>(
  out: &mut W,
  records: &[AttendanceRecord],
) -> io::Result<()> {
  let rows = records.iter().map(|r| {
    let recorded_at = r.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    vec![r.name.clone(), r.roll_no.clone(), recorded_at, r.source.clone()]
  });
  write_csv(out, ATTENDANCE_HEADER, rows)
}

/// Write the roster as CSV. A student without a photo gets an empty
/// `photo_url`.
pub fn write_students<W: Write + ?Sized>(out: &mut W, students: &[Student]) -> io::Result<()> {
  let rows = students.iter().map(|s| {
    vec![s.name.clone(), s.roll_no.clone(), s.photo_url.clone().unwrap_or_default()]
  });
  write_csv(out, STUDENT_HEADER, rows)
}

/// Write a header line and one line per row. Every field is quoted; embedded
/// quotes are doubled.
pub fn write_csv<W, I>(out: &mut W, header: &[&str], rows: I) -> io::Result<()>
where
  W: Write + ?Sized,
  I: IntoIterator<Item = Vec<String>>,
{
  write_row(out, header.iter().copied())?;
  for row in rows {
    write_row(out, row.iter().map(String::as_str))?;
  }
  out.flush()
}

fn write_row<'a, W: Write + ?Sized>(
  out: &mut W,
  fields: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
  let line = fields.map(quote).collect::<Vec<_>>().join(",");
  writeln!(out, "{line}")
}

fn quote(field: &str) -> String { format!("\"{}\"", field.replace('"', "\"\"")) }

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone, Utc};
  use uuid::Uuid;

  use super::*;

  fn record(name: &str, roll_no: &str) -> AttendanceRecord {
    AttendanceRecord {
      id:          Uuid::new_v4(),
      name:        name.into(),
      roll_no:     roll_no.into(),
      recorded_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
      day:         NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
      source:      "web".into(),
      student_id:  None,
    }
  }

  fn student(name: &str, roll_no: &str, photo_url: Option<&str>) -> Student {
    Student {
      id:         Uuid::new_v4(),
      name:       name.into(),
      roll_no:    roll_no.into(),
      photo_url:  photo_url.map(str::to_owned),
      created_at: Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
    }
  }

  #[test]
  fn quotes_every_field() {
    let mut out = Vec::new();
    write_attendance(&mut out, &[record("Alice", "12")]).unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "\"name\",\"roll_no\",\"recorded_at\",\"source\"\n\
       \"Alice\",\"12\",\"2026-10-18T09:00:00.000Z\",\"web\"\n"
    );
  }

  #[test]
  fn doubles_embedded_quotes() {
    let mut out = Vec::new();
    write_attendance(&mut out, &[record("Bob \"The Builder\", Jr", "")]).unwrap();
    let text = String::from_utf8(out).unwrap();
    let row = text.lines().nth(1).unwrap();
    assert!(row.starts_with("\"Bob \"\"The Builder\"\", Jr\",\"\","), "{row}");
  }

  #[test]
  fn empty_export_has_header_only() {
    let mut out = Vec::new();
    write_attendance(&mut out, &[]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
  }

  #[test]
  fn roster_export_lists_photo_urls() {
    let mut out = Vec::new();
    write_students(
      &mut out,
      &[
        student("Alice", "12", Some("https://p.supabase.co/storage/v1/object/public/students/a.jpg")),
        student("Bob", "", None),
      ],
    )
    .unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "\"name\",\"roll_no\",\"photo_url\"\n\
       \"Alice\",\"12\",\"https://p.supabase.co/storage/v1/object/public/students/a.jpg\"\n\
       \"Bob\",\"\",\"\"\n"
    );
  }

  #[test]
  fn writes_to_a_trait_object() {
    let mut buf = Vec::new();
    let out: &mut dyn Write = &mut buf;
    write_students(out, &[student("Carol", "7", None)]).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 2);
  }
}
