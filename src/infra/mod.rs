// Infrastructure adapters: file formats, layer outputs and object staging

pub mod delimited;
pub mod layer_output_adapter;
pub mod object_store_adapter;
pub mod parquet_io;

pub use layer_output_adapter::{CsvLayerOutputAdapter, ParquetLayerOutputAdapter};
pub use object_store_adapter::ObjectStoreStaging;
