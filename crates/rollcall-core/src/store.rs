//! The `AttendanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (`rollcall-store-sqlite`,
//! `rollcall-store-supabase`). The recorder and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  attendance::{AttendanceRecord, DayWindow, NewAttendance},
  student::{NewStudent, Student},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`AttendanceStore::list_attendance`].
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  /// Case-insensitive substring filter on the record name.
  pub name: Option<String>,
  /// Exact local calendar day.
  pub day:  Option<NaiveDate>,
}

// ─── Insert outcome ──────────────────────────────────────────────────────────

/// Result of [`AttendanceStore::insert_attendance`].
#[derive(Debug, Clone)]
pub enum InsertOutcome {
  /// The record was written.
  Inserted(AttendanceRecord),
  /// A record with the same `(name, day)` key already exists; nothing was
  /// written.
  Duplicate,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an attendance store backend.
///
/// Attendance records are append-only: they are never updated or deleted
/// through this trait. Backends must enforce uniqueness of `(name, day)` and
/// report a violation as [`InsertOutcome::Duplicate`] rather than an error.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Attendance ────────────────────────────────────────────────────────

  /// Return at most one record for `name` whose `recorded_at` falls inside
  /// `window`.
  fn find_in_window(
    &self,
    name: String,
    window: DayWindow,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Persist a new record. The `id` is assigned by the store.
  fn insert_attendance(
    &self,
    input: NewAttendance,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// List records matching `query`, newest `recorded_at` first.
  fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  /// Create and persist a new student.
  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// All students ordered by name ascending.
  fn list_students(
    &self,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// The first student whose name matches `name` exactly, if any.
  fn find_student_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;
}
