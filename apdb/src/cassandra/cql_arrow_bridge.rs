use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder, Int8Builder,
    Int16Builder, Int32Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use scylla::frame::response::result::{ColumnType as CqlColumnType, CqlValue, Row};

use crate::error::{Error, Result};
use crate::schema::{ColumnType, TableDef};

/// Arrow type used to store a CQL column.
pub fn cql_type_to_arrow(cql: &CqlColumnType) -> Result<DataType> {
    match cql {
        CqlColumnType::Double => Ok(DataType::Float64),
        CqlColumnType::Float => Ok(DataType::Float32),
        CqlColumnType::BigInt => Ok(DataType::Int64),
        CqlColumnType::Int => Ok(DataType::Int32),
        CqlColumnType::SmallInt => Ok(DataType::Int16),
        CqlColumnType::TinyInt => Ok(DataType::Int8),
        CqlColumnType::Boolean => Ok(DataType::Boolean),
        CqlColumnType::Text | CqlColumnType::Ascii => Ok(DataType::Utf8),
        CqlColumnType::Blob => Ok(DataType::Binary),
        CqlColumnType::Timestamp => Ok(DataType::Timestamp(TimeUnit::Millisecond, None)),
        other => Err(Error::Data(format!(
            "unsupported CQL column type in result set: {other:?}"
        ))),
    }
}

/// Arrow type used to store a catalog column.
pub fn logical_type_to_arrow(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Double => DataType::Float64,
        ColumnType::Float => DataType::Float32,
        ColumnType::BigInt => DataType::Int64,
        ColumnType::Int | ColumnType::TinyInt => DataType::Int32,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Char => DataType::Utf8,
        ColumnType::Blob => DataType::Binary,
        ColumnType::DateTime => DataType::Timestamp(TimeUnit::Millisecond, None),
    }
}

/// An empty result frame typed after a catalog table; used for reads whose
/// plan is empty.
pub fn empty_batch_for_table(def: &TableDef) -> RecordBatch {
    let fields: Vec<Field> = def
        .columns
        .iter()
        .map(|c| {
            Field::new(
                c.name.clone(),
                logical_type_to_arrow(c.column_type),
                c.nullable.unwrap_or(true),
            )
        })
        .collect();
    RecordBatch::new_empty(Arc::new(Schema::new(fields)))
}

enum ColumnBuilder {
    Float64(Float64Builder),
    Float32(Float32Builder),
    Int64(Int64Builder),
    Int32(Int32Builder),
    Int16(Int16Builder),
    Int8(Int8Builder),
    Boolean(BooleanBuilder),
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
    Timestamp(TimestampMillisecondBuilder),
}

impl ColumnBuilder {
    fn for_type(cql: &CqlColumnType, capacity: usize) -> Result<Self> {
        Ok(match cql_type_to_arrow(cql)? {
            DataType::Float64 => ColumnBuilder::Float64(Float64Builder::with_capacity(capacity)),
            DataType::Float32 => ColumnBuilder::Float32(Float32Builder::with_capacity(capacity)),
            DataType::Int64 => ColumnBuilder::Int64(Int64Builder::with_capacity(capacity)),
            DataType::Int32 => ColumnBuilder::Int32(Int32Builder::with_capacity(capacity)),
            DataType::Int16 => ColumnBuilder::Int16(Int16Builder::with_capacity(capacity)),
            DataType::Int8 => ColumnBuilder::Int8(Int8Builder::with_capacity(capacity)),
            DataType::Boolean => ColumnBuilder::Boolean(BooleanBuilder::with_capacity(capacity)),
            DataType::Utf8 => ColumnBuilder::Utf8(StringBuilder::new()),
            DataType::Binary => ColumnBuilder::Binary(BinaryBuilder::new()),
            DataType::Timestamp(..) => {
                ColumnBuilder::Timestamp(TimestampMillisecondBuilder::with_capacity(capacity))
            }
            other => {
                return Err(Error::Data(format!(
                    "no column builder for arrow type {other:?}"
                )));
            }
        })
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnBuilder::Float64(_) => DataType::Float64,
            ColumnBuilder::Float32(_) => DataType::Float32,
            ColumnBuilder::Int64(_) => DataType::Int64,
            ColumnBuilder::Int32(_) => DataType::Int32,
            ColumnBuilder::Int16(_) => DataType::Int16,
            ColumnBuilder::Int8(_) => DataType::Int8,
            ColumnBuilder::Boolean(_) => DataType::Boolean,
            ColumnBuilder::Utf8(_) => DataType::Utf8,
            ColumnBuilder::Binary(_) => DataType::Binary,
            ColumnBuilder::Timestamp(_) => DataType::Timestamp(TimeUnit::Millisecond, None),
        }
    }

    fn append(&mut self, value: Option<&CqlValue>, column: &str) -> Result<()> {
        match (self, value) {
            (ColumnBuilder::Float64(b), None) => b.append_null(),
            (ColumnBuilder::Float64(b), Some(CqlValue::Double(v))) => b.append_value(*v),
            (ColumnBuilder::Float32(b), None) => b.append_null(),
            (ColumnBuilder::Float32(b), Some(CqlValue::Float(v))) => b.append_value(*v),
            (ColumnBuilder::Int64(b), None) => b.append_null(),
            (ColumnBuilder::Int64(b), Some(CqlValue::BigInt(v))) => b.append_value(*v),
            (ColumnBuilder::Int32(b), None) => b.append_null(),
            (ColumnBuilder::Int32(b), Some(CqlValue::Int(v))) => b.append_value(*v),
            (ColumnBuilder::Int16(b), None) => b.append_null(),
            (ColumnBuilder::Int16(b), Some(CqlValue::SmallInt(v))) => b.append_value(*v),
            (ColumnBuilder::Int8(b), None) => b.append_null(),
            (ColumnBuilder::Int8(b), Some(CqlValue::TinyInt(v))) => b.append_value(*v),
            (ColumnBuilder::Boolean(b), None) => b.append_null(),
            (ColumnBuilder::Boolean(b), Some(CqlValue::Boolean(v))) => b.append_value(*v),
            (ColumnBuilder::Utf8(b), None) => b.append_null(),
            (ColumnBuilder::Utf8(b), Some(CqlValue::Text(v))) => b.append_value(v),
            (ColumnBuilder::Utf8(b), Some(CqlValue::Ascii(v))) => b.append_value(v),
            (ColumnBuilder::Binary(b), None) => b.append_null(),
            (ColumnBuilder::Binary(b), Some(CqlValue::Blob(v))) => b.append_value(v),
            (ColumnBuilder::Timestamp(b), None) => b.append_null(),
            (ColumnBuilder::Timestamp(b), Some(CqlValue::Timestamp(v))) => b.append_value(v.0),
            (builder, Some(value)) => {
                return Err(Error::Data(format!(
                    "column {column}: value {value:?} does not match {:?}",
                    builder.data_type()
                )));
            }
        }
        Ok(())
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Float64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Float32(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int32(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int16(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int8(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Boolean(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Utf8(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Binary(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Timestamp(mut b) => Arc::new(b.finish()),
        }
    }
}

/// Assemble result rows into a record batch. Column names and wire types
/// must describe every row; rows shorter than the column list are an error.
pub fn rows_to_record_batch(
    names: &[String],
    types: &[CqlColumnType],
    rows: &[Row],
) -> Result<RecordBatch> {
    if names.len() != types.len() {
        return Err(Error::Data(format!(
            "column name/type count mismatch: {} vs {}",
            names.len(),
            types.len()
        )));
    }
    let mut builders = Vec::with_capacity(types.len());
    for t in types {
        builders.push(ColumnBuilder::for_type(t, rows.len())?);
    }
    for row in rows {
        if row.columns.len() != names.len() {
            return Err(Error::Data(format!(
                "result row has {} columns, expected {}",
                row.columns.len(),
                names.len()
            )));
        }
        for (i, value) in row.columns.iter().enumerate() {
            builders[i].append(value.as_ref(), &names[i])?;
        }
    }
    let fields: Vec<Field> = names
        .iter()
        .zip(&builders)
        .map(|(name, b)| Field::new(name.clone(), b.data_type(), true))
        .collect();
    let arrays: Vec<ArrayRef> = builders.into_iter().map(ColumnBuilder::finish).collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}
