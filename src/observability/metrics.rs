//! Metrics for the medallion pipeline.
//!
//! Every metric is named through [`MetricName`]; the per-stage modules below
//! are the only places that touch the `metrics` facade. Without an installed
//! recorder all calls are no-ops.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Generate
    GenerateRecordsGenerated,
    GenerateDuplicatesInjected,
    GenerateDuration,

    // Clean
    CleanRowsIn,
    CleanRowsOut,
    CleanRowsDropped,
    CleanDuration,

    // Aggregate
    AggregateTablesProduced,
    AggregateTableRows,
    AggregateDuration,

    // Staging
    StagingObjectsUploaded,
    StagingBytesUploaded,
    StagingObjectsDownloaded,
    StagingBytesDownloaded,

    // Pipeline
    PipelineRunsSuccess,
    PipelineRunsError,
    PipelineStageErrors,
    PipelineRunDuration,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::GenerateRecordsGenerated => "medallion_generate_records_total",
            MetricName::GenerateDuplicatesInjected => "medallion_generate_duplicates_total",
            MetricName::GenerateDuration => "medallion_generate_duration_seconds",

            MetricName::CleanRowsIn => "medallion_clean_rows_in_total",
            MetricName::CleanRowsOut => "medallion_clean_rows_out_total",
            MetricName::CleanRowsDropped => "medallion_clean_rows_dropped_total",
            MetricName::CleanDuration => "medallion_clean_duration_seconds",

            MetricName::AggregateTablesProduced => "medallion_aggregate_tables_total",
            MetricName::AggregateTableRows => "medallion_aggregate_table_rows",
            MetricName::AggregateDuration => "medallion_aggregate_duration_seconds",

            MetricName::StagingObjectsUploaded => "medallion_staging_objects_uploaded_total",
            MetricName::StagingBytesUploaded => "medallion_staging_uploaded_bytes",
            MetricName::StagingObjectsDownloaded => "medallion_staging_objects_downloaded_total",
            MetricName::StagingBytesDownloaded => "medallion_staging_downloaded_bytes",

            MetricName::PipelineRunsSuccess => "medallion_pipeline_runs_success_total",
            MetricName::PipelineRunsError => "medallion_pipeline_runs_error_total",
            MetricName::PipelineStageErrors => "medallion_pipeline_stage_errors_total",
            MetricName::PipelineRunDuration => "medallion_pipeline_run_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            GenerateRecordsGenerated,
            GenerateDuplicatesInjected,
            GenerateDuration,
            CleanRowsIn,
            CleanRowsOut,
            CleanRowsDropped,
            CleanDuration,
            AggregateTablesProduced,
            AggregateTableRows,
            AggregateDuration,
            StagingObjectsUploaded,
            StagingBytesUploaded,
            StagingObjectsDownloaded,
            StagingBytesDownloaded,
            PipelineRunsSuccess,
            PipelineRunsError,
            PipelineStageErrors,
            PipelineRunDuration,
        ]
        .into_iter()
    }

    /// (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::GenerateRecordsGenerated => ("generate", "Bronze records generated", None),
            MetricName::GenerateDuplicatesInjected => ("generate", "Duplicate rows injected", None),
            MetricName::GenerateDuration => ("generate", "Generation duration", Some("s")),

            MetricName::CleanRowsIn => ("clean", "Rows entering the cleaner", None),
            MetricName::CleanRowsOut => ("clean", "Rows written to silver", None),
            MetricName::CleanRowsDropped => ("clean", "Rows dropped by reason", None),
            MetricName::CleanDuration => ("clean", "Cleaning duration", Some("s")),

            MetricName::AggregateTablesProduced => ("aggregate", "Gold tables produced", None),
            MetricName::AggregateTableRows => ("aggregate", "Rows per gold table", None),
            MetricName::AggregateDuration => ("aggregate", "Aggregation duration", Some("s")),

            MetricName::StagingObjectsUploaded => ("staging", "Objects uploaded", None),
            MetricName::StagingBytesUploaded => ("staging", "Uploaded object size", Some("bytes")),
            MetricName::StagingObjectsDownloaded => ("staging", "Objects downloaded", None),
            MetricName::StagingBytesDownloaded => ("staging", "Downloaded object size", Some("bytes")),

            MetricName::PipelineRunsSuccess => ("pipeline", "Successful pipeline runs", None),
            MetricName::PipelineRunsError => ("pipeline", "Failed pipeline runs", None),
            MetricName::PipelineStageErrors => ("pipeline", "Stage failures by stage and kind", None),
            MetricName::PipelineRunDuration => ("pipeline", "End-to-end run duration", Some("s")),
        }
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> anyhow::Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    PROMETHEUS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus exposition text, if [`init`] has run.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Generate Metrics
// ============================================================================

pub mod generate {
    use super::MetricName;

    pub fn batch_generated(records: usize, duplicates: usize) {
        ::metrics::counter!(MetricName::GenerateRecordsGenerated.as_str()).increment(records as u64);
        ::metrics::counter!(MetricName::GenerateDuplicatesInjected.as_str()).increment(duplicates as u64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::GenerateDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Clean Metrics
// ============================================================================

pub mod clean {
    use super::MetricName;
    use crate::pipeline::processing::clean::CleaningReport;

    pub fn report_recorded(report: &CleaningReport) {
        ::metrics::counter!(MetricName::CleanRowsIn.as_str()).increment(report.rows_in as u64);
        ::metrics::counter!(MetricName::CleanRowsOut.as_str()).increment(report.rows_out as u64);

        let reasons = [
            ("null_name", report.dropped_null_name),
            ("duplicate_email", report.dropped_duplicate_email),
            ("invalid_email", report.dropped_invalid_email),
            ("age_out_of_range", report.dropped_age_out_of_range),
            ("invalid_signup_date", report.dropped_invalid_signup_date),
        ];
        for (reason, count) in reasons {
            ::metrics::counter!(MetricName::CleanRowsDropped.as_str(), "reason" => reason).increment(count as u64);
        }
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::CleanDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

pub mod aggregate {
    use super::MetricName;

    pub fn table_produced(table: &str, rows: usize) {
        ::metrics::counter!(MetricName::AggregateTablesProduced.as_str()).increment(1);
        ::metrics::histogram!(MetricName::AggregateTableRows.as_str(), "table" => table.to_string())
            .record(rows as f64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::AggregateDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Staging Metrics
// ============================================================================

pub mod staging {
    use super::MetricName;

    pub fn object_uploaded(bytes: usize) {
        ::metrics::counter!(MetricName::StagingObjectsUploaded.as_str()).increment(1);
        ::metrics::histogram!(MetricName::StagingBytesUploaded.as_str()).record(bytes as f64);
    }

    pub fn object_downloaded(bytes: usize) {
        ::metrics::counter!(MetricName::StagingObjectsDownloaded.as_str()).increment(1);
        ::metrics::histogram!(MetricName::StagingBytesDownloaded.as_str()).record(bytes as f64);
    }
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;
    use crate::error::{ErrorKind, Stage};

    pub fn run_succeeded(secs: f64) {
        ::metrics::counter!(MetricName::PipelineRunsSuccess.as_str()).increment(1);
        ::metrics::histogram!(MetricName::PipelineRunDuration.as_str()).record(secs);
    }

    pub fn run_failed() {
        ::metrics::counter!(MetricName::PipelineRunsError.as_str()).increment(1);
    }

    pub fn stage_failed(stage: Stage, kind: Option<ErrorKind>) {
        let kind = match kind {
            Some(ErrorKind::Schema) => "schema",
            Some(ErrorKind::Validation) => "validation",
            Some(ErrorKind::Unexpected) => "unexpected",
            None => "io",
        };
        ::metrics::counter!(
            MetricName::PipelineStageErrors.as_str(),
            "stage" => stage.as_str(),
            "kind" => kind
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("medallion_")));
    }

    #[test]
    fn test_durations_carry_seconds_unit() {
        for metric in MetricName::all_metrics() {
            let (_, _, unit) = metric.metadata();
            if metric.as_str().ends_with("_seconds") {
                assert_eq!(unit, Some("s"), "{}", metric);
            }
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        generate::batch_generated(10, 1);
        staging::object_uploaded(128);
        pipeline::stage_failed(crate::error::Stage::Clean, None);
    }
}
