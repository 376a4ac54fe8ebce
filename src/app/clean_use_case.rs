use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::app::generate_use_case::LayerOutput;
use crate::app::ports::LayerOutputPort;
use crate::domain::RecordBatch;
use crate::pipeline::processing::clean::{Cleaner, CleaningReport, CleaningRules, DefaultCleaner};

/// Use case for turning a bronze batch into the silver layer
pub struct CleanUseCase {
    cleaner: Box<dyn Cleaner + Send + Sync>,
    output: Box<dyn LayerOutputPort>,
}

impl CleanUseCase {
    pub fn new(cleaner: Box<dyn Cleaner + Send + Sync>, output: Box<dyn LayerOutputPort>) -> Self {
        Self { cleaner, output }
    }

    /// Create a use case with the default cleaner
    pub fn with_default_cleaner(rules: CleaningRules, output: Box<dyn LayerOutputPort>) -> Self {
        Self {
            cleaner: Box::new(DefaultCleaner::with_rules(rules)),
            output,
        }
    }

    /// Clean `bronze` and write the result as `name`.
    pub async fn execute(&self, name: &str, bronze: &RecordBatch) -> Result<(LayerOutput, CleaningReport)> {
        let started = Instant::now();
        let (silver, report) = self.cleaner.clean_with_report(bronze)?;

        crate::observability::metrics::clean::report_recorded(&report);
        crate::observability::metrics::clean::duration(started.elapsed().as_secs_f64());
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            dropped = report.rows_dropped(),
            "Bronze batch cleaned"
        );

        let path = self.output.write_batch(name, &silver).await?;
        Ok((LayerOutput { batch: silver, path }, report))
    }
}
