//! The attendance recorder: once-per-calendar-day recording policy.
//!
//! A submission is checked against the local day window of its timestamp.
//! If the subject already has a record that day the call is an idempotent
//! no-op; otherwise a record is inserted, linked to a student by exact name
//! when one exists. The storage layer's `(name, day)` unique key closes the
//! window between the check and the insert.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  attendance::{AttendanceRecord, DEFAULT_SOURCE, DayWindow, NewAttendance, parse_timestamp},
  store::{AttendanceStore, InsertOutcome},
};

/// A raw attendance submission as received from a client.
#[derive(Debug, Clone, Default)]
pub struct RecordRequest {
  pub name:        Option<String>,
  pub roll_no:     Option<String>,
  /// Caller-supplied timestamp; see [`parse_timestamp`] for accepted forms.
  pub recorded_at: Option<String>,
  pub source:      Option<String>,
}

impl RecordRequest {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: Some(name.into()), ..Self::default() }
  }
}

/// What [`Recorder::record`] did.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
  /// A fresh record was written.
  Created(AttendanceRecord),
  /// The subject was already recorded on that calendar day.
  AlreadyRecorded,
}

impl RecordOutcome {
  pub fn already_exists(&self) -> bool { matches!(self, Self::AlreadyRecorded) }
}

/// Applies the once-per-day policy on top of an [`AttendanceStore`].
pub struct Recorder<S> {
  store: Arc<S>,
}

impl<S> Clone for Recorder<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: AttendanceStore> Recorder<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Record attendance for `req.name`, at most once per local calendar day.
  ///
  /// Validation happens before any storage access. Failures of the student
  /// lookup are logged and ignored; failures of the existence check or the
  /// insert abort with [`Error::Storage`].
  pub async fn record(&self, req: RecordRequest) -> Result<RecordOutcome> {
    let name = req
      .name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .ok_or(Error::MissingField("name"))?
      .to_owned();

    let recorded_at = effective_timestamp(req.recorded_at.as_deref());
    let window = DayWindow::local(recorded_at);

    let existing = self
      .store
      .find_in_window(name.clone(), window)
      .await
      .map_err(Error::storage)?;

    if let Some(existing) = existing {
      info!(%name, day = %window.day, existing = %existing.id, "attendance already recorded");
      return Ok(RecordOutcome::AlreadyRecorded);
    }

    let student_id = self.link_student(&name).await;

    let input = NewAttendance {
      name: name.clone(),
      roll_no: req.roll_no.unwrap_or_default(),
      recorded_at,
      day: window.day,
      source: req
        .source
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_owned()),
      student_id,
    };

    match self.store.insert_attendance(input).await.map_err(Error::storage)? {
      InsertOutcome::Inserted(record) => {
        info!(%name, day = %window.day, id = %record.id, "attendance recorded");
        Ok(RecordOutcome::Created(record))
      }
      InsertOutcome::Duplicate => {
        info!(%name, day = %window.day, "attendance recorded concurrently");
        Ok(RecordOutcome::AlreadyRecorded)
      }
    }
  }

  /// Best-effort lookup of the student id for `name`.
  async fn link_student(&self, name: &str) -> Option<Uuid> {
    match self.store.find_student_by_name(name.to_owned()).await {
      Ok(Some(student)) => Some(student.id),
      Ok(None) => {
        debug!(%name, "no student matches attendance name");
        None
      }
      Err(e) => {
        warn!(%name, error = %e, "student lookup failed");
        None
      }
    }
  }
}

fn effective_timestamp(raw: Option<&str>) -> DateTime<Utc> {
  match raw {
    None => Utc::now(),
    Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
      warn!(recorded_at = raw, "unparseable timestamp, using current time");
      Utc::now()
    }),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::{Local, NaiveDate, TimeZone};

  use super::*;
  use crate::{
    store::AttendanceQuery,
    student::{NewStudent, Student},
  };

  #[derive(Debug, thiserror::Error)]
  #[error("backend unavailable")]
  struct Unavailable;

  /// In-memory store with switchable failure modes.
  #[derive(Default)]
  struct FakeStore {
    records:          Mutex<Vec<AttendanceRecord>>,
    students:         Mutex<Vec<Student>>,
    fail_lookup:      bool,
    fail_writes:      bool,
    /// Pretend the existence check raced with another writer.
    blind_existence:  bool,
  }

  impl AttendanceStore for FakeStore {
    type Error = Unavailable;

    async fn find_in_window(
      &self,
      name: String,
      window: DayWindow,
    ) -> Result<Option<AttendanceRecord>, Unavailable> {
      if self.blind_existence {
        return Ok(None);
      }
      let records = self.records.lock().unwrap();
      Ok(
        records
          .iter()
          .find(|r| r.name == name && window.contains(r.recorded_at))
          .cloned(),
      )
    }

    async fn insert_attendance(
      &self,
      input: NewAttendance,
    ) -> Result<InsertOutcome, Unavailable> {
      if self.fail_writes {
        return Err(Unavailable);
      }
      let mut records = self.records.lock().unwrap();
      if records.iter().any(|r| r.name == input.name && r.day == input.day) {
        return Ok(InsertOutcome::Duplicate);
      }
      let record = AttendanceRecord {
        id:          Uuid::new_v4(),
        name:        input.name,
        roll_no:     input.roll_no,
        recorded_at: input.recorded_at,
        day:         input.day,
        source:      input.source,
        student_id:  input.student_id,
      };
      records.push(record.clone());
      Ok(InsertOutcome::Inserted(record))
    }

    async fn list_attendance(
      &self,
      _query: AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, Unavailable> {
      Ok(self.records.lock().unwrap().clone())
    }

    async fn add_student(&self, input: NewStudent) -> Result<Student, Unavailable> {
      let student = Student {
        id:         Uuid::new_v4(),
        name:       input.name,
        roll_no:    input.roll_no,
        photo_url:  input.photo_url,
        created_at: Utc::now(),
      };
      self.students.lock().unwrap().push(student.clone());
      Ok(student)
    }

    async fn list_students(&self) -> Result<Vec<Student>, Unavailable> {
      Ok(self.students.lock().unwrap().clone())
    }

    async fn find_student_by_name(
      &self,
      name: String,
    ) -> Result<Option<Student>, Unavailable> {
      if self.fail_lookup {
        return Err(Unavailable);
      }
      Ok(self.students.lock().unwrap().iter().find(|s| s.name == name).cloned())
    }
  }

  fn local_at(day: NaiveDate, hour: u32) -> String {
    Local
      .from_local_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
      .earliest()
      .unwrap()
      .to_rfc3339()
  }

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2026, 10, d).unwrap() }

  fn request(name: &str, at: String) -> RecordRequest {
    RecordRequest {
      name:        Some(name.into()),
      roll_no:     Some("12".into()),
      recorded_at: Some(at),
      source:      Some("web".into()),
    }
  }

  #[tokio::test]
  async fn same_day_records_once() {
    let store = Arc::new(FakeStore::default());
    let recorder = Recorder::new(store.clone());

    let first = recorder.record(request("Alice", local_at(day(5), 9))).await.unwrap();
    let second = recorder.record(request("Alice", local_at(day(5), 17))).await.unwrap();

    let RecordOutcome::Created(record) = first else { panic!("expected a fresh record") };
    assert_eq!(record.day, day(5));
    assert_eq!(record.roll_no, "12");
    assert!(second.already_exists());
    assert_eq!(store.records.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn different_days_record_twice() {
    let store = Arc::new(FakeStore::default());
    let recorder = Recorder::new(store.clone());

    recorder.record(request("Alice", local_at(day(5), 9))).await.unwrap();
    let next = recorder.record(request("Alice", local_at(day(6), 9))).await.unwrap();

    assert!(!next.already_exists());
    assert_eq!(store.records.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn missing_name_is_rejected_before_storage() {
    let store = Arc::new(FakeStore { fail_writes: true, ..FakeStore::default() });
    let recorder = Recorder::new(store.clone());

    for name in [None, Some(String::new()), Some("   ".to_owned())] {
      let err = recorder
        .record(RecordRequest { name, ..RecordRequest::default() })
        .await
        .unwrap_err();
      assert!(matches!(err, Error::MissingField("name")), "{err}");
    }
    assert!(store.records.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn links_matching_student() {
    let store = Arc::new(FakeStore::default());
    let alice = store
      .add_student(NewStudent { name: "Alice".into(), roll_no: "12".into(), photo_url: None })
      .await
      .unwrap();
    let recorder = Recorder::new(store.clone());

    let outcome = recorder.record(RecordRequest::named("Alice")).await.unwrap();
    let RecordOutcome::Created(record) = outcome else { panic!("expected a fresh record") };
    assert_eq!(record.student_id, Some(alice.id));

    let outcome = recorder.record(RecordRequest::named("Bob")).await.unwrap();
    let RecordOutcome::Created(record) = outcome else { panic!("expected a fresh record") };
    assert_eq!(record.student_id, None);
  }

  #[tokio::test]
  async fn lookup_failure_does_not_block_insert() {
    let store = Arc::new(FakeStore { fail_lookup: true, ..FakeStore::default() });
    let recorder = Recorder::new(store.clone());

    let outcome = recorder.record(RecordRequest::named("Alice")).await.unwrap();
    let RecordOutcome::Created(record) = outcome else { panic!("expected a fresh record") };
    assert!(record.student_id.is_none());
  }

  #[tokio::test]
  async fn write_failure_is_a_storage_error() {
    let store = Arc::new(FakeStore { fail_writes: true, ..FakeStore::default() });
    let recorder = Recorder::new(store);

    let err = recorder.record(RecordRequest::named("Alice")).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
  }

  #[tokio::test]
  async fn unique_key_violation_reports_already_exists() {
    let store = Arc::new(FakeStore { blind_existence: true, ..FakeStore::default() });
    let recorder = Recorder::new(store.clone());

    recorder.record(RecordRequest::named("Alice")).await.unwrap();
    let raced = recorder.record(RecordRequest::named("Alice")).await.unwrap();

    assert!(raced.already_exists());
    assert_eq!(store.records.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn defaults_are_applied() {
    let store = Arc::new(FakeStore::default());
    let recorder = Recorder::new(store);

    let before = Utc::now();
    let outcome = recorder
      .record(RecordRequest {
        name:        Some("  Alice  ".into()),
        roll_no:     None,
        recorded_at: Some("not a date".into()),
        source:      None,
      })
      .await
      .unwrap();

    let RecordOutcome::Created(record) = outcome else { panic!("expected a fresh record") };
    assert_eq!(record.name, "Alice");
    assert_eq!(record.roll_no, "");
    assert_eq!(record.source, DEFAULT_SOURCE);
    assert!(record.recorded_at >= before);
  }
}
