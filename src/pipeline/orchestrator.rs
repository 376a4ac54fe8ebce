//! End-to-end medallion run: generate -> clean -> aggregate, then optional
//! upload of each layer directory to the staging store.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::StagingPort;
use crate::app::{AggregateUseCase, CleanUseCase, GenerateUseCase};
use crate::config::{Config, PathsConfig};
use crate::constants::LAYERS;
use crate::error::{EtlError, Stage};
use crate::infra::{CsvLayerOutputAdapter, ParquetLayerOutputAdapter};
use crate::pipeline::processing::clean::CleaningReport;

/// Per-run knobs; defaults come from the `[generation]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub records: usize,
    pub duplicates: usize,
    pub seed: Option<u64>,
    pub upload: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            records: config.generation.records,
            duplicates: config.generation.duplicates,
            seed: config.generation.seed,
            upload: false,
        }
    }

    pub fn with_upload(mut self, upload: bool) -> Self {
        self.upload = upload;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoldTableSummary {
    pub name: String,
    pub rows: usize,
    pub path: PathBuf,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub bronze_rows: usize,
    pub bronze_path: PathBuf,
    pub silver_rows: usize,
    pub silver_path: PathBuf,
    pub cleaning: CleaningReport,
    pub gold_tables: Vec<GoldTableSummary>,
    pub uploaded: Vec<String>,
}

impl PipelineRunSummary {
    pub fn gold_table_names(&self) -> Vec<&str> {
        self.gold_tables.iter().map(|t| t.name.as_str()).collect()
    }
}

pub struct PipelineOrchestrator<'a> {
    config: &'a Config,
    staging: Option<Arc<dyn StagingPort>>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, staging: None }
    }

    pub fn with_staging(mut self, staging: Arc<dyn StagingPort>) -> Self {
        self.staging = Some(staging);
        self
    }

    pub async fn run(&self, options: &RunOptions) -> Result<PipelineRunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id);
        let started = Instant::now();

        let result = self.run_stages(run_id, options).instrument(span).await;
        match &result {
            Ok(_) => crate::observability::metrics::pipeline::run_succeeded(started.elapsed().as_secs_f64()),
            Err(_) => crate::observability::metrics::pipeline::run_failed(),
        }
        result
    }

    async fn run_stages(&self, run_id: Uuid, options: &RunOptions) -> Result<PipelineRunSummary> {
        let started_at = Utc::now();
        let paths = &self.config.paths;

        // Refuse before touching any data rather than after the three stages
        let staging = match (options.upload, &self.staging) {
            (true, None) => bail!("upload requested but no staging store is configured"),
            (true, Some(staging)) => Some(staging.clone()),
            (false, _) => None,
        };

        info!(
            records = options.records,
            duplicates = options.duplicates,
            data_dir = %paths.data_dir.display(),
            "Starting pipeline run"
        );

        let generate = GenerateUseCase::new(Box::new(CsvLayerOutputAdapter::new(paths.bronze_dir())))
            .with_seed(options.seed);
        let bronze = run_stage(
            Stage::Generate,
            generate.execute(&paths.bronze_file, options.records, options.duplicates),
        )
        .await?;

        let clean = CleanUseCase::with_default_cleaner(
            self.config.cleaning.clone(),
            Box::new(ParquetLayerOutputAdapter::new(paths.silver_dir())),
        );
        let (silver, cleaning) = run_stage(Stage::Clean, clean.execute(&paths.silver_file, &bronze.batch)).await?;

        let aggregate =
            AggregateUseCase::with_default_aggregator(Box::new(CsvLayerOutputAdapter::new(paths.gold_dir())));
        let (gold, gold_paths) = run_stage(Stage::Aggregate, aggregate.execute(&silver.batch)).await?;

        let mut uploaded = Vec::new();
        if let Some(staging) = staging {
            for layer in LAYERS {
                let keys = run_stage(Stage::Upload, upload_layer(staging.as_ref(), paths, layer)).await?;
                uploaded.extend(keys);
            }
        }

        let summary = PipelineRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            bronze_rows: bronze.batch.len(),
            bronze_path: bronze.path,
            silver_rows: silver.batch.len(),
            silver_path: silver.path,
            cleaning,
            gold_tables: gold
                .iter()
                .zip(gold_paths)
                .map(|(table, path)| GoldTableSummary {
                    name: table.name.clone(),
                    rows: table.len(),
                    path,
                })
                .collect(),
            uploaded,
        };
        info!(
            bronze_rows = summary.bronze_rows,
            silver_rows = summary.silver_rows,
            gold_tables = summary.gold_tables.len(),
            uploaded = summary.uploaded.len(),
            "Pipeline run complete"
        );
        Ok(summary)
    }
}

/// Run one stage inside its own span; on failure log the stage and cause
/// and record the failure kind.
async fn run_stage<T>(stage: Stage, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let span = info_span!("stage", stage = stage.as_str());
    async {
        let started = Instant::now();
        match fut.await {
            Ok(value) => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "Stage finished");
                Ok(value)
            }
            Err(e) => {
                let kind = e.downcast_ref::<EtlError>().map(EtlError::kind);
                error!(error = %format!("{:#}", e), "Stage failed");
                crate::observability::metrics::pipeline::stage_failed(stage, kind);
                Err(e.context(format!("{} stage failed", stage.as_str())))
            }
        }
    }
    .instrument(span)
    .await
}

/// Upload every regular file in the layer's local directory to `<layer>/`.
pub async fn upload_layer(staging: &dyn StagingPort, paths: &PathsConfig, layer: &str) -> Result<Vec<String>> {
    let dir = paths.layer_dir(layer);
    let files = staging
        .list_files(&dir)
        .await
        .with_context(|| format!("no {} layer to upload", layer))?;
    if files.is_empty() {
        info!(layer, dir = %dir.display(), "No files to upload");
        return Ok(Vec::new());
    }
    let keys = staging.upload_files(&files, layer).await?;
    info!(layer, files = keys.len(), "Layer uploaded");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::ObjectStoreStaging;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.paths.data_dir = dir.join("data");
        config
    }

    fn options(records: usize, duplicates: usize) -> RunOptions {
        RunOptions {
            records,
            duplicates,
            seed: Some(11),
            upload: false,
        }
    }

    #[tokio::test]
    async fn test_run_writes_all_layers() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path());

        let summary = PipelineOrchestrator::new(&config).run(&options(1500, 50)).await?;
        assert_eq!(summary.bronze_rows, 1550);
        assert!(summary.silver_rows > 0 && summary.silver_rows <= 1500);
        assert_eq!(summary.silver_rows, summary.cleaning.rows_out);
        assert_eq!(summary.gold_table_names(), crate::constants::tables::ALL.to_vec());
        assert!(config.paths.bronze_path().exists());
        assert!(config.paths.silver_path().exists());
        assert!(config.paths.gold_dir().join("exec_dashboard.csv").exists());
        assert!(summary.uploaded.is_empty());

        let json = serde_json::to_value(&summary)?;
        assert_eq!(json["bronze_rows"], 1550);
        Ok(())
    }

    #[tokio::test]
    async fn test_generation_failure_skips_later_stages() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path());

        let err = PipelineOrchestrator::new(&config).run(&options(10, 20)).await.unwrap_err();
        assert!(err.downcast_ref::<EtlError>().is_some_and(|e| e.is_validation()));
        assert!(format!("{:#}", err).starts_with("generate stage failed"));
        assert!(!config.paths.bronze_path().exists());
        assert!(!config.paths.silver_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_requires_staging() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path());

        let result = PipelineOrchestrator::new(&config)
            .run(&options(100, 0).with_upload(true))
            .await;
        assert!(result.is_err());
        assert!(!config.paths.bronze_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_run_uploads_each_layer() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path());
        let staging = Arc::new(ObjectStoreStaging::local(&dir.path().join("bucket"))?);

        let summary = PipelineOrchestrator::new(&config)
            .with_staging(staging)
            .run(&options(1500, 10).with_upload(true))
            .await?;
        assert!(summary.uploaded.contains(&"bronze/bronze_layer_raw.csv".to_string()));
        assert!(summary.uploaded.contains(&"silver/silver_layer_clean.parquet".to_string()));
        assert!(summary.uploaded.contains(&"gold/yearly_growth.csv".to_string()));
        assert_eq!(summary.uploaded.len(), 2 + crate::constants::tables::ALL.len());
        assert!(dir.path().join("bucket/gold/active_users.csv").exists());
        Ok(())
    }
}
