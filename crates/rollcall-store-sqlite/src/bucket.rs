//! [`DiskBucket`]: student photos as files in a local directory.

use std::path::{Path, PathBuf};

use rollcall_core::photo::{PhotoBucket, PhotoObject};
use tracing::info;

use crate::{Error, Result};

/// A photo bucket rooted at a directory on disk.
///
/// Objects are written as `<root>/<path>`; their public URL is
/// `<url_prefix>/<path>`, which the HTTP layer serves from the same
/// directory.
#[derive(Debug, Clone)]
pub struct DiskBucket {
  root:       PathBuf,
  url_prefix: String,
}

impl DiskBucket {
  pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
    Self {
      root:       root.into(),
      url_prefix: url_prefix.into().trim_end_matches('/').to_owned(),
    }
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn url_prefix(&self) -> &str { &self.url_prefix }

  fn object_path(&self, path: &str) -> Result<PathBuf> {
    let plain = !path.is_empty()
      && path != "."
      && path != ".."
      && !path.contains(['/', '\\']);
    if plain {
      Ok(self.root.join(path))
    } else {
      Err(Error::InvalidObjectPath(path.to_owned()))
    }
  }
}

impl PhotoBucket for DiskBucket {
  type Error = Error;

  async fn ensure_bucket(&self) -> Result<()> {
    if !tokio::fs::try_exists(&self.root).await? {
      tokio::fs::create_dir_all(&self.root).await?;
      info!(root = %self.root.display(), "created photo directory");
    }
    Ok(())
  }

  async fn upload(&self, object: PhotoObject) -> Result<String> {
    let target = self.object_path(&object.path)?;
    tokio::fs::write(&target, &object.bytes).await?;
    Ok(format!("{}/{}", self.url_prefix, object.path))
  }
}
