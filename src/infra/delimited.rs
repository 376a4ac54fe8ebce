use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::{Field, FieldType, RecordBatch, Schema, Value};

/// Write a batch as a header row followed by one line per record.
pub fn write_delimited(path: &Path, batch: &RecordBatch) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(batch.schema().names())?;
    for row in batch.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a delimited file into a batch of nullable text columns; empty
/// fields become `Null`.
pub fn read_delimited(path: &Path) -> Result<RecordBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let schema = Schema::new(
        reader
            .headers()?
            .iter()
            .map(|h| Field::nullable(h, FieldType::Text))
            .collect(),
    );

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed record {} in {}", line + 1, path.display()))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Null
                    } else {
                        Value::text(field)
                    }
                })
                .collect(),
        );
    }

    Ok(RecordBatch::from_rows(schema, rows)?)
}
