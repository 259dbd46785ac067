//! [`SupabaseBucket`]: student photos in Supabase Storage.

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::info;

use rollcall_core::photo::{PhotoBucket, PhotoObject};

use crate::{Error, Result, client::SupabaseClient};

#[derive(Debug, Deserialize)]
struct BucketInfo {
  name: String,
}

#[derive(Debug, Serialize)]
struct CreateBucket<'a> {
  id:     &'a str,
  name:   &'a str,
  public: bool,
}

/// A public storage bucket in a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseBucket {
  client: SupabaseClient,
  bucket: String,
}

impl SupabaseBucket {
  pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
    Self { client, bucket: bucket.into() }
  }

  /// The URL anonymous clients fetch `path` from.
  pub fn public_url(&self, path: &str) -> String {
    self
      .client
      .storage(&format!("object/public/{}/{path}", self.bucket))
  }
}

impl PhotoBucket for SupabaseBucket {
  type Error = Error;

  async fn ensure_bucket(&self) -> Result<()> {
    let req = self.client.get(self.client.storage("bucket"));
    let buckets: Vec<BucketInfo> = self.client.send(req).await?.json().await?;
    if buckets.iter().any(|b| b.name == self.bucket) {
      return Ok(());
    }

    let req = self
      .client
      .post(self.client.storage("bucket"))
      .json(&CreateBucket { id: &self.bucket, name: &self.bucket, public: true });
    self.client.send(req).await?;
    info!(bucket = %self.bucket, "created storage bucket");
    Ok(())
  }

  async fn upload(&self, object: PhotoObject) -> Result<String> {
    let req = self
      .client
      .post(
        self
          .client
          .storage(&format!("object/{}/{}", self.bucket, object.path)),
      )
      .header(CONTENT_TYPE, object.content_type)
      .header("x-upsert", "false")
      .body(object.bytes);
    self.client.send(req).await?;
    Ok(self.public_url(&object.path))
  }
}
