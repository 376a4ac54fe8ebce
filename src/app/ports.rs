use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::RecordBatch;

/// Destination for one materialised layer artifact
#[async_trait]
pub trait LayerOutputPort: Send + Sync {
    /// Persist `batch` under `name`, returning the path written.
    async fn write_batch(&self, name: &str, batch: &RecordBatch) -> Result<PathBuf>;
}

/// Remote staging area for layer artifacts
#[async_trait]
pub trait StagingPort: Send + Sync {
    /// Regular files directly inside `dir`, sorted by path.
    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Upload each file to `<prefix>/<file name>`, returning the object keys.
    async fn upload_files(&self, files: &[PathBuf], prefix: &str) -> Result<Vec<String>>;

    /// Copy every object under `prefix` into `dest`, returning the local paths.
    async fn download_prefix(&self, prefix: &str, dest: &Path) -> Result<Vec<PathBuf>>;
}
