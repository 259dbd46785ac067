//! The `PhotoBucket` trait: object storage for student reference photos.

use std::future::Future;

use bytes::Bytes;
use uuid::Uuid;

/// Photos larger than this are rejected at upload time.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// A photo ready to be written to a bucket.
#[derive(Debug, Clone)]
pub struct PhotoObject {
  /// Object key inside the bucket, e.g. `"3f2c….jpg"`.
  pub path:         String,
  pub content_type: String,
  pub bytes:        Bytes,
}

impl PhotoObject {
  /// Build an object with a fresh random key, keeping the extension of
  /// `original_name` (lowercased, `jpg` when absent).
  pub fn with_random_key(
    original_name: Option<&str>,
    content_type: Option<&str>,
    bytes: Bytes,
  ) -> Self {
    Self {
      path: format!("{}.{}", Uuid::new_v4(), extension_of(original_name)),
      content_type: content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or("image/jpeg")
        .to_owned(),
      bytes,
    }
  }
}

fn extension_of(original_name: Option<&str>) -> String {
  original_name
    .and_then(|name| name.rsplit_once('.'))
    .map(|(_, ext)| ext.trim())
    .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .map(str::to_ascii_lowercase)
    .unwrap_or_else(|| "jpg".to_owned())
}

/// Abstraction over the object store holding student photos.
pub trait PhotoBucket: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the bucket if it does not exist yet. Idempotent.
  fn ensure_bucket(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Store `object` and return the public URL it can be fetched from.
  fn upload(
    &self,
    object: PhotoObject,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
