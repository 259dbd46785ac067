//! Local backend for rollcall: SQLite records and on-disk photos.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Photos are plain files under a
//! configured directory, served by the HTTP layer.

mod bucket;
mod encode;
mod schema;
mod store;

pub mod error;

pub use bucket::DiskBucket;
pub use error::{Error, Result};
pub use store::SqliteStore;
