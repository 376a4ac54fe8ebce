//! Tabular data shapes shared by every layer of the pipeline.

mod batch;
mod schema;
mod value;

pub use batch::{RecordBatch, Table};
pub use schema::{Field, FieldType, Schema};
pub use value::Value;
