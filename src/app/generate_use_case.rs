use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::app::ports::LayerOutputPort;
use crate::domain::RecordBatch;
use crate::pipeline::generate::BronzeGenerator;

/// Batch produced by a stage together with where it was written
#[derive(Debug, Clone)]
pub struct LayerOutput {
    pub batch: RecordBatch,
    pub path: PathBuf,
}

/// Use case for producing the bronze layer from synthetic data
pub struct GenerateUseCase {
    output: Box<dyn LayerOutputPort>,
    seed: Option<u64>,
}

impl GenerateUseCase {
    pub fn new(output: Box<dyn LayerOutputPort>) -> Self {
        Self { output, seed: None }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Generate `num_records` rows plus `num_duplicates` copies and write
    /// them as `name`.
    pub async fn execute(&self, name: &str, num_records: usize, num_duplicates: usize) -> Result<LayerOutput> {
        let started = Instant::now();
        let mut generator = match self.seed {
            Some(seed) => BronzeGenerator::with_seed(seed),
            None => BronzeGenerator::new(),
        };
        let batch = generator.generate(num_records, num_duplicates)?;

        crate::observability::metrics::generate::batch_generated(num_records, num_duplicates);
        crate::observability::metrics::generate::duration(started.elapsed().as_secs_f64());

        let path = self.output.write_batch(name, &batch).await?;
        info!(rows = batch.len(), path = %path.display(), "Bronze layer written");
        Ok(LayerOutput { batch, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct MockLayerOutput {
        pub written: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl MockLayerOutput {
        pub fn new() -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl LayerOutputPort for MockLayerOutput {
        async fn write_batch(&self, name: &str, batch: &RecordBatch) -> Result<PathBuf> {
            self.written.lock().await.push((name.to_string(), batch.len()));
            Ok(PathBuf::from(format!("mem/{}", name)))
        }
    }

    #[tokio::test]
    async fn test_generate_use_case_writes_bronze() {
        let output = Box::new(MockLayerOutput::new());
        let written = output.written.clone();
        let use_case = GenerateUseCase::new(output).with_seed(Some(5));

        let result = use_case.execute("bronze_layer_raw", 100, 10).await.unwrap();
        assert_eq!(result.batch.len(), 110);
        assert_eq!(result.path, PathBuf::from("mem/bronze_layer_raw"));
        assert_eq!(*written.lock().await, vec![("bronze_layer_raw".to_string(), 110)]);
    }

    #[tokio::test]
    async fn test_invalid_counts_write_nothing() {
        let output = Box::new(MockLayerOutput::new());
        let written = output.written.clone();
        let use_case = GenerateUseCase::new(output);

        let err = use_case.execute("bronze_layer_raw", 10, 20).await.unwrap_err();
        assert!(err.downcast_ref::<EtlError>().is_some_and(|e| e.is_validation()));
        assert!(written.lock().await.is_empty());
    }
}
