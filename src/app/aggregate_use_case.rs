use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::app::ports::LayerOutputPort;
use crate::domain::RecordBatch;
use crate::pipeline::processing::aggregate::{Aggregator, DefaultAggregator, GoldTables};

/// Use case for deriving the gold tables from a silver batch
pub struct AggregateUseCase {
    aggregator: Box<dyn Aggregator + Send + Sync>,
    output: Box<dyn LayerOutputPort>,
}

impl AggregateUseCase {
    pub fn new(aggregator: Box<dyn Aggregator + Send + Sync>, output: Box<dyn LayerOutputPort>) -> Self {
        Self { aggregator, output }
    }

    /// Create a use case with the default aggregator
    pub fn with_default_aggregator(output: Box<dyn LayerOutputPort>) -> Self {
        Self {
            aggregator: Box::new(DefaultAggregator::new()),
            output,
        }
    }

    /// Build every gold table, then write each one under its own name.
    /// Nothing is written unless all tables were produced.
    pub async fn execute(&self, silver: &RecordBatch) -> Result<(GoldTables, Vec<PathBuf>)> {
        let started = Instant::now();
        let gold = self.aggregator.aggregate(silver)?;
        crate::observability::metrics::aggregate::duration(started.elapsed().as_secs_f64());

        let mut paths = Vec::with_capacity(gold.len());
        for table in gold.iter() {
            crate::observability::metrics::aggregate::table_produced(&table.name, table.len());
            paths.push(self.output.write_batch(&table.name, &table.batch).await?);
        }

        info!(tables = gold.len(), "Gold layer written");
        Ok((gold, paths))
    }
}
