use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::app::ports::LayerOutputPort;
use crate::domain::RecordBatch;
use crate::infra::delimited::write_delimited;
use crate::infra::parquet_io::write_parquet;

/// Writes each batch to `<dir>/<name>.csv`
pub struct CsvLayerOutputAdapter {
    dir: PathBuf,
}

impl CsvLayerOutputAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl LayerOutputPort for CsvLayerOutputAdapter {
    async fn write_batch(&self, name: &str, batch: &RecordBatch) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.csv", name));
        let (target, batch) = (path.clone(), batch.clone());
        tokio::task::spawn_blocking(move || write_delimited(&target, &batch))
            .await
            .context("csv writer task panicked")??;

        info!(path = %path.display(), "Wrote layer file");
        Ok(path)
    }
}

/// Writes each batch to `<dir>/<name>.parquet`
pub struct ParquetLayerOutputAdapter {
    dir: PathBuf,
}

impl ParquetLayerOutputAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl LayerOutputPort for ParquetLayerOutputAdapter {
    async fn write_batch(&self, name: &str, batch: &RecordBatch) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.parquet", name));
        let (target, batch) = (path.clone(), batch.clone());
        tokio::task::spawn_blocking(move || write_parquet(&target, &batch))
            .await
            .context("parquet writer task panicked")??;

        info!(path = %path.display(), "Wrote layer file");
        Ok(path)
    }
}
