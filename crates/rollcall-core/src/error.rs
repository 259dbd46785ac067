//! Error types for `rollcall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required input field was absent or blank. User-correctable.
  #[error("{0} is required")]
  MissingField(&'static str),

  /// The backing store was unreachable or rejected a query or insert.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
