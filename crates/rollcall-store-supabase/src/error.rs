//! Error type for `rollcall-store-supabase`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid configuration: {0}")]
  Config(String),

  /// A non-success response from PostgREST or the storage API.
  #[error("supabase responded {status}: {message}")]
  Api {
    status:  u16,
    /// Postgres SQLSTATE or storage error code, when the body carried one.
    code:    Option<String>,
    message: String,
  },
}

impl Error {
  /// Whether this is a Postgres unique-constraint violation (SQLSTATE 23505).
  pub fn is_unique_violation(&self) -> bool {
    matches!(self, Self::Api { code: Some(code), .. } if code == "23505")
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
