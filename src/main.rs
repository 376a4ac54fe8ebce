use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use medallion_etl::app::ports::StagingPort;
use medallion_etl::app::{AggregateUseCase, CleanUseCase, GenerateUseCase};
use medallion_etl::config::{Config, StorageConfig, DEFAULT_CONFIG_PATH};
use medallion_etl::constants::{BRONZE_LAYER, GOLD_LAYER, LAYERS, SILVER_LAYER};
use medallion_etl::infra::delimited::read_delimited;
use medallion_etl::infra::parquet_io::read_parquet;
use medallion_etl::infra::{CsvLayerOutputAdapter, ObjectStoreStaging, ParquetLayerOutputAdapter};
use medallion_etl::observability;
use medallion_etl::pipeline::orchestrator::upload_layer;
use medallion_etl::pipeline::{PipelineOrchestrator, RunOptions};

#[derive(Parser)]
#[command(name = "medallion_etl")]
#[command(about = "Bronze/silver/gold batch ETL for synthetic user records")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file (missing file = defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Write Prometheus metrics to this file when the command finishes
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    /// Stage to a local directory instead of the S3 bucket from the environment
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the raw bronze layer
    Generate {
        #[arg(long)]
        records: Option<usize>,
        #[arg(long)]
        duplicates: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Clean a bronze CSV into the silver parquet file
    Clean {
        /// Bronze CSV (defaults to the configured bronze file)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Build the gold tables from a silver parquet file
    Aggregate {
        /// Silver parquet (defaults to the configured silver file)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Upload layer directories to the staging store
    Upload {
        #[arg(long, value_enum, default_value_t = LayerArg::All)]
        layer: LayerArg,
    },
    /// Download every object under a prefix
    Download {
        #[arg(long)]
        prefix: String,
        #[arg(long)]
        dest: PathBuf,
    },
    /// Run generate, clean and aggregate in sequence
    Run {
        /// Upload every layer after the run succeeds
        #[arg(long)]
        upload: bool,
        /// Write the run summary as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LayerArg {
    Bronze,
    Silver,
    Gold,
    All,
}

impl LayerArg {
    fn layers(self) -> Vec<&'static str> {
        match self {
            LayerArg::Bronze => vec![BRONZE_LAYER],
            LayerArg::Silver => vec![SILVER_LAYER],
            LayerArg::Gold => vec![GOLD_LAYER],
            LayerArg::All => LAYERS.to_vec(),
        }
    }
}

fn staging(staging_dir: Option<&Path>) -> Result<Arc<dyn StagingPort>> {
    match staging_dir {
        Some(dir) => Ok(Arc::new(ObjectStoreStaging::local(dir)?)),
        None => {
            let storage = StorageConfig::from_env()?;
            Ok(Arc::new(ObjectStoreStaging::s3(&storage)?))
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let paths = &config.paths;
    info!(config = %cli.config.display(), data_dir = %paths.data_dir.display(), "Configuration loaded");

    match cli.command {
        Commands::Generate { records, duplicates, seed } => {
            println!("🔄 Generating bronze layer...");
            let records = records.unwrap_or(config.generation.records);
            let duplicates = duplicates.unwrap_or(config.generation.duplicates);
            let use_case = GenerateUseCase::new(Box::new(CsvLayerOutputAdapter::new(paths.bronze_dir())))
                .with_seed(seed.or(config.generation.seed));

            let output = use_case.execute(&paths.bronze_file, records, duplicates).await?;
            println!("✅ Wrote {} rows to {}", output.batch.len(), output.path.display());
        }
        Commands::Clean { input } => {
            println!("🧹 Cleaning bronze layer...");
            let input = input.unwrap_or_else(|| paths.bronze_path());
            let bronze = read_delimited(&input)?;
            let use_case = CleanUseCase::with_default_cleaner(
                config.cleaning.clone(),
                Box::new(ParquetLayerOutputAdapter::new(paths.silver_dir())),
            );

            let (output, report) = use_case.execute(&paths.silver_file, &bronze).await?;
            println!("✅ Wrote {} rows to {}", output.batch.len(), output.path.display());
            println!("   Rows in: {}", report.rows_in);
            println!("   Rows dropped: {}", report.rows_dropped());
        }
        Commands::Aggregate { input } => {
            println!("📊 Building gold layer...");
            let input = input.unwrap_or_else(|| paths.silver_path());
            let silver = read_parquet(&input)?;
            let use_case =
                AggregateUseCase::with_default_aggregator(Box::new(CsvLayerOutputAdapter::new(paths.gold_dir())));

            let (gold, written) = use_case.execute(&silver).await?;
            for (table, path) in gold.iter().zip(&written) {
                println!("   {}: {} rows -> {}", table.name, table.len(), path.display());
            }
            println!("✅ Wrote {} gold tables", gold.len());
        }
        Commands::Upload { layer } => {
            println!("📤 Uploading layers...");
            let staging = staging(cli.staging_dir.as_deref())?;
            for layer in layer.layers() {
                let keys = upload_layer(staging.as_ref(), paths, layer).await?;
                for key in &keys {
                    println!("   {}", key);
                }
            }
            println!("✅ Upload complete");
        }
        Commands::Download { prefix, dest } => {
            println!("📥 Downloading {}...", prefix);
            let staging = staging(cli.staging_dir.as_deref())?;
            let files = staging.download_prefix(&prefix, &dest).await?;
            println!("✅ Downloaded {} files to {}", files.len(), dest.display());
        }
        Commands::Run { upload, summary_json } => {
            println!("🚀 Running full pipeline...");
            let mut orchestrator = PipelineOrchestrator::new(&config);
            if upload {
                orchestrator = orchestrator.with_staging(staging(cli.staging_dir.as_deref())?);
            }

            let summary = orchestrator
                .run(&RunOptions::from_config(&config).with_upload(upload))
                .await?;
            println!("\n📊 Pipeline results (run {}):", summary.run_id);
            println!("   Bronze rows: {}", summary.bronze_rows);
            println!("   Silver rows: {}", summary.silver_rows);
            println!("   Gold tables: {}", summary.gold_table_names().join(", "));
            if !summary.uploaded.is_empty() {
                println!("   Uploaded objects: {}", summary.uploaded.len());
            }

            if let Some(path) = summary_json {
                let json = serde_json::to_string_pretty(&summary)?;
                std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                println!("   Summary: {}", path.display());
            }
            println!("✅ Pipeline completed successfully!");
        }
    }
    Ok(())
}

fn write_metrics(path: &Path) -> Result<()> {
    let rendered = observability::metrics::render().unwrap_or_default();
    std::fs::write(path, rendered).with_context(|| format!("Failed to write metrics to {}", path.display()))
}

#[tokio::main]
async fn main() -> ExitCode {
    observability::init_logging();
    let cli = Cli::parse();

    let metrics_file = cli.metrics_file.clone();
    if metrics_file.is_some() {
        if let Err(e) = observability::metrics::init() {
            error!("Failed to initialize metrics: {:#}", e);
        }
    }

    let result = execute(cli).await;

    if let Some(path) = metrics_file {
        if let Err(e) = write_metrics(&path) {
            error!("{:#}", e);
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
