//! Students: the registered people attendance is taken for.
//!
//! Students are created by the registration flow and otherwise only read; the
//! recorder uses them to link attendance records by exact name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:         Uuid,
  pub name:       String,
  #[serde(default)]
  pub roll_no:    String,
  /// Public URL of the reference photo used by the recognizer.
  pub photo_url:  Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::AttendanceStore::add_student`].
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub name:      String,
  pub roll_no:   String,
  pub photo_url: Option<String>,
}
