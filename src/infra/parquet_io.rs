use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parquet::basic::{Compression, LogicalType, Repetition, Type as PhysicalType, ZstdLevel};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field as ParquetField;
use parquet::schema::types::{Type, TypePtr};

use crate::domain::{Field, FieldType, RecordBatch, Schema, Value};

fn build_schema(schema: &Schema) -> Result<TypePtr> {
    let fields = schema
        .fields()
        .iter()
        .map(|field| {
            let repetition = if field.nullable {
                Repetition::OPTIONAL
            } else {
                Repetition::REQUIRED
            };
            let builder = match field.field_type {
                FieldType::Text => Type::primitive_type_builder(&field.name, PhysicalType::BYTE_ARRAY)
                    .with_logical_type(Some(LogicalType::String)),
                FieldType::Int => Type::primitive_type_builder(&field.name, PhysicalType::INT64),
                FieldType::Float => Type::primitive_type_builder(&field.name, PhysicalType::DOUBLE),
            };
            Ok(Arc::new(builder.with_repetition(repetition).build()?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Arc::new(Type::group_type_builder("schema").with_fields(fields).build()?))
}

/// Definition levels for an optional column; `None` for required columns.
fn definition_levels(rows: &[Vec<Value>], idx: usize, nullable: bool) -> Option<Vec<i16>> {
    nullable.then(|| rows.iter().map(|r| i16::from(!r[idx].is_null())).collect())
}

/// Write a batch as a single-row-group parquet file.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let schema = build_schema(batch.schema())?;
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .build(),
    );
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;
    let rows = batch.rows();

    let mut rg = writer.next_row_group()?;
    let mut col_index = 0;
    while let Some(mut col_writer) = rg.next_column()? {
        let field: &Field = &batch.schema().fields()[col_index];
        let def_levels = definition_levels(rows, col_index, field.nullable);
        let present = rows.iter().map(|r| &r[col_index]).filter(|v| !v.is_null());

        match field.field_type {
            FieldType::Text => {
                let values = present
                    .map(|v| match v {
                        Value::Text(s) => Ok(ByteArray::from(s.as_str())),
                        other => bail!("column {}: expected text, found {:?}", field.name, other),
                    })
                    .collect::<Result<Vec<_>>>()?;
                col_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&values, def_levels.as_deref(), None)?;
            }
            FieldType::Int => {
                let values = present
                    .map(|v| v.as_i64().with_context(|| format!("column {}: expected integer, found {:?}", field.name, v)))
                    .collect::<Result<Vec<_>>>()?;
                col_writer
                    .typed::<Int64Type>()
                    .write_batch(&values, def_levels.as_deref(), None)?;
            }
            FieldType::Float => {
                let values = present
                    .map(|v| match v {
                        Value::Float(f) => Ok(*f),
                        Value::Int(i) => Ok(*i as f64),
                        other => bail!("column {}: expected float, found {:?}", field.name, other),
                    })
                    .collect::<Result<Vec<_>>>()?;
                col_writer
                    .typed::<DoubleType>()
                    .write_batch(&values, def_levels.as_deref(), None)?;
            }
        }
        col_writer.close()?;
        col_index += 1;
    }
    rg.close()?;
    writer.close()?;
    Ok(())
}

/// Read a parquet file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)?;

    let descr = reader.metadata().file_metadata().schema_descr_ptr();
    let fields = descr
        .columns()
        .iter()
        .map(|col| {
            let field_type = match col.physical_type() {
                PhysicalType::BYTE_ARRAY => FieldType::Text,
                PhysicalType::INT64 => FieldType::Int,
                PhysicalType::DOUBLE => FieldType::Float,
                other => bail!("column {}: unsupported physical type {:?}", col.name(), other),
            };
            let nullable = col.max_def_level() > 0;
            Ok(Field::new(col.name(), field_type, nullable))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(reader.metadata().file_metadata().num_rows() as usize);
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let values = row
            .get_column_iter()
            .map(|(name, field)| match field {
                ParquetField::Null => Ok(Value::Null),
                ParquetField::Long(i) => Ok(Value::Int(*i)),
                ParquetField::Double(f) => Ok(Value::Float(*f)),
                ParquetField::Str(s) => Ok(Value::Text(s.clone())),
                other => bail!("column {}: unsupported value {:?}", name, other),
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(values);
    }

    Ok(RecordBatch::from_rows(Schema::new(fields), rows)?)
}
