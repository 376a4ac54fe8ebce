//! Object-storage staging for layer artifacts.
//!
//! S3 (or any S3-compatible endpoint) in production, a local directory for
//! development and tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, info};

use crate::app::ports::StagingPort;
use crate::config::StorageConfig;

pub struct ObjectStoreStaging {
    store: Arc<dyn ObjectStore>,
    description: String,
}

impl ObjectStoreStaging {
    pub fn new(store: Arc<dyn ObjectStore>, description: impl Into<String>) -> Self {
        Self {
            store,
            description: description.into(),
        }
    }

    pub fn s3(config: &StorageConfig) -> Result<Self> {
        info!(bucket = %config.bucket, region = %config.region, "Creating S3 staging client");

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().context("Failed to build S3 client")?;
        Ok(Self::new(Arc::new(store), format!("s3://{}", config.bucket)))
    }

    pub fn local(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        info!(root = %root.display(), "Creating local staging store");
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store), root.display().to_string()))
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

fn object_key(prefix: &str, file: &Path) -> Result<String> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", file.display()))?;
    let prefix = prefix.trim_matches('/');
    Ok(if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    })
}

#[async_trait::async_trait]
impl StagingPort for ObjectStoreStaging {
    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn upload_files(&self, files: &[PathBuf], prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(files.len());
        for file in files {
            let key = object_key(prefix, file)?;
            let bytes = tokio::fs::read(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let size = bytes.len();

            self.store
                .put(&ObjectPath::from(key.as_str()), PutPayload::from(bytes))
                .await
                .with_context(|| format!("Failed to upload {} to {}/{}", file.display(), self.description, key))?;
            crate::observability::metrics::staging::object_uploaded(size);
            info!(file = %file.display(), key = %key, bytes = size, "Uploaded file");
            keys.push(key);
        }
        Ok(keys)
    }

    async fn download_prefix(&self, prefix: &str, dest: &Path) -> Result<Vec<PathBuf>> {
        let prefix_path = ObjectPath::from(prefix.trim_matches('/'));
        let objects: Vec<_> = self
            .store
            .list(Some(&prefix_path))
            .try_collect()
            .await
            .with_context(|| format!("Failed to list {}/{}", self.description, prefix_path))?;

        tokio::fs::create_dir_all(dest).await?;
        let mut written = Vec::with_capacity(objects.len());
        for meta in objects {
            let Some(name) = meta.location.filename() else {
                bail!("object {} has no file name", meta.location);
            };
            let target = dest.join(name);
            let bytes = self.store.get(&meta.location).await?.bytes().await?;
            tokio::fs::write(&target, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", target.display()))?;

            crate::observability::metrics::staging::object_downloaded(bytes.len());
            debug!(key = %meta.location, path = %target.display(), "Downloaded object");
            written.push(target);
        }
        written.sort();
        Ok(written)
    }
}
