use super::{Schema, Value};
use crate::error::{EtlError, Result};

/// In-memory ordered collection of same-schema rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordBatch {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a batch, rejecting rows whose width differs from the schema.
    pub fn from_rows(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != schema.len())
        {
            return Err(EtlError::validation(format!(
                "row {} has {} values, schema has {} columns",
                idx,
                row.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column in row order; `None` if the column is absent.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.schema.index_of(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }
}

/// A named batch produced by aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub batch: RecordBatch,
}

impl Table {
    pub fn new(name: impl Into<String>, batch: RecordBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}
