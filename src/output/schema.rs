//! Typed Arrow conversion
//!
//! Arrow schemas come from the stream's declared fields rather than from the
//! data, so every file of a stream has the same columns in the same order.

use crate::error::{Error, Result};
use crate::schema::{FieldType, StreamDefinition};
use crate::types::{JsonValue, Record};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Arrow type for a declared field type
pub fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::String => DataType::Utf8,
        FieldType::Integer => DataType::Int64,
        FieldType::Number => DataType::Float64,
    }
}

/// Arrow schema of a stream, in declared field order
pub fn arrow_schema(stream: &StreamDefinition) -> Schema {
    let fields: Vec<Field> = stream
        .fields
        .iter()
        .map(|f| Field::new(&f.name, arrow_type(f.field_type), f.nullable))
        .collect();
    Schema::new(fields)
}

/// Convert records of `stream` to a RecordBatch
pub fn records_to_batch(stream: &StreamDefinition, records: &[Record]) -> Result<RecordBatch> {
    let schema = Arc::new(arrow_schema(stream));

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let values: Vec<Option<&JsonValue>> = records
                .iter()
                .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
                .collect();
            build_array(field.name(), &values, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    RecordBatch::try_new(schema, columns).map_err(|e| {
        Error::output(format!(
            "Failed to create RecordBatch for {}: {e}",
            stream.id
        ))
    })
}

/// Build an Arrow array from JSON values.
///
/// A present value that does not fit the column type is an error, never a
/// silent null.
fn build_array(
    name: &str,
    values: &[Option<&JsonValue>],
    data_type: &DataType,
) -> Result<ArrayRef> {
    match data_type {
        DataType::Int64 => {
            let arr: Int64Array = values
                .iter()
                .enumerate()
                .map(|(row, v)| convert(name, row, *v, as_integer))
                .collect::<Result<_>>()?;
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values
                .iter()
                .enumerate()
                .map(|(row, v)| convert(name, row, *v, as_number))
                .collect::<Result<_>>()?;
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        other => Err(Error::output(format!("Unsupported column type {other}"))),
    }
}

fn convert<T>(
    name: &str,
    row: usize,
    value: Option<&JsonValue>,
    parse: fn(&JsonValue) -> Option<T>,
) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(v) => parse(v).map(Some).ok_or_else(|| {
            Error::output(format!("Column {name} row {row}: cannot convert {v}"))
        }),
    }
}

/// Integer value; integer strings are accepted
fn as_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric value of a metric; numeric strings are accepted
fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
