//! Error type for `rollcall-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("photo storage error: {0}")]
  Io(#[from] std::io::Error),

  /// Object keys must be a single plain file name.
  #[error("invalid photo object path: {0:?}")]
  InvalidObjectPath(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
