use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;

use super::model::{ColumnKind, Table, Value};
use crate::error::Result;

/// Write a table, creating parent directories. `.parquet` / `.pq` paths get
/// Parquet, anything else a CSV with a header row and no index column.
pub fn write_file(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(table, path),
        _ => write_csv(table, path),
    }
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let mut fields = Vec::with_capacity(table.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns.len());

    for (idx, name) in table.columns.iter().enumerate() {
        let cells = table.rows.iter().map(|r| &r[idx]);
        let (data_type, array): (DataType, ArrayRef) = match table.column_kind(name) {
            ColumnKind::Integer => (
                DataType::Int64,
                Arc::new(cells.map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                }).collect::<Int64Array>()),
            ),
            ColumnKind::Float => (
                DataType::Float64,
                Arc::new(cells.map(Value::as_f64).collect::<Float64Array>()),
            ),
            ColumnKind::Bool => (
                DataType::Boolean,
                Arc::new(cells.map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                }).collect::<BooleanArray>()),
            ),
            ColumnKind::Date => (
                DataType::Date32,
                Arc::new(cells.map(|v| match v {
                    Value::Date(d) => Some(date_to_days(*d)),
                    _ => None,
                }).collect::<Date32Array>()),
            ),
            ColumnKind::Text | ColumnKind::Empty => (
                DataType::Utf8,
                Arc::new(cells.map(Value::text).collect::<StringArray>()),
            ),
        };
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn date_to_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}
