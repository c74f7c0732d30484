use std::collections::HashMap;

use arrow::array::{
    Array, BinaryArray, BooleanArray, Float32Array, Float64Array, Int8Array, Int32Array,
    Int64Array, StringArray, TimestampMicrosecondArray, TimestampMillisecondArray,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use scylla::batch::{Batch, BatchType};
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::CqlTimestamp;
use scylla::query::Query;
use tracing::debug;

use crate::cassandra::partitioner::SpatialPartitioner;
use crate::cassandra::planner::quote_id;
use crate::cassandra::session::ApdbSession;
use crate::config::ApdbConfig;
use crate::error::{Error, Result};
use crate::schema::{ApdbSchema, ApdbTable, ColumnDef, ColumnType, TIME_PARTITION_COLUMN};
use crate::time::TimePartitioner;

/// Columns and per-row values of one INSERT batch.
#[derive(Debug)]
pub struct InsertData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<CqlValue>>>,
}

/// One `store` call: derives partition keys for the visit's catalogs and
/// writes them out, one batch per target table, in the order
/// DiaObjectLast, DiaObject, DiaSource, DiaForcedSource.
pub struct Ingester<'a> {
    pub session: &'a ApdbSession,
    pub schema: &'a ApdbSchema,
    pub config: &'a ApdbConfig,
    pub partitioner: &'a SpatialPartitioner,
    pub time_partitioner: TimePartitioner,
}

impl Ingester<'_> {
    pub async fn store(
        &self,
        visit_time: DateTime<Utc>,
        objects: &RecordBatch,
        sources: Option<&RecordBatch>,
        forced_sources: Option<&RecordBatch>,
    ) -> Result<()> {
        let time_part = self.time_partitioner.partition(visit_time);
        if self.config.time_partition_tables {
            self.check_time_partition(time_part)?;
        }

        let (ra_col, dec_col) = (
            self.config.ra_dec_columns[0].as_str(),
            self.config.ra_dec_columns[1].as_str(),
        );
        let (object_parts, id_map) =
            object_partitions(objects, self.partitioner, ra_col, dec_col)?;

        self.store_dia_objects(objects, &object_parts, visit_time, time_part)
            .await?;

        if let Some(sources) = sources {
            let parts = source_partitions(sources, &id_map, self.partitioner, ra_col, dec_col)?;
            self.store_dia_sources(ApdbTable::DiaSource, sources, &parts, time_part)
                .await?;
        }
        if let Some(forced_sources) = forced_sources {
            let parts = forced_source_partitions(forced_sources, &id_map)?;
            self.store_dia_sources(ApdbTable::DiaForcedSource, forced_sources, &parts, time_part)
                .await?;
        }
        Ok(())
    }

    /// Visits outside the pre-created table range cannot be stored; this
    /// also catches a `time_partition_days` that drifted from the value the
    /// database was initialized with.
    fn check_time_partition(&self, time_part: i64) -> Result<()> {
        let start = self
            .time_partitioner
            .partition(crate::time::parse_tai(&self.config.time_partition_start)?);
        let end = self
            .time_partitioner
            .partition(crate::time::parse_tai(&self.config.time_partition_end)?);
        if time_part < start || time_part > end {
            return Err(Error::Config(format!(
                "time partition {time_part} is outside the pre-created range {start}..={end}"
            )));
        }
        Ok(())
    }

    async fn store_dia_objects(
        &self,
        objects: &RecordBatch,
        parts: &[i64],
        visit_time: DateTime<Utc>,
        time_part: i64,
    ) -> Result<()> {
        let visit_ts = CqlValue::Timestamp(CqlTimestamp(visit_time.timestamp_millis()));
        let last_extras = vec![(
            "lastNonForcedSource".to_string(),
            Some(visit_ts.clone()),
        )];
        self.write_table(ApdbTable::DiaObjectLast, None, objects, parts, &last_extras)
            .await?;

        let mut extras = last_extras;
        extras.push(("validityStart".to_string(), Some(visit_ts)));
        if !self.config.time_partition_tables {
            extras.push((
                TIME_PARTITION_COLUMN.to_string(),
                Some(CqlValue::BigInt(time_part)),
            ));
        }
        self.write_table(ApdbTable::DiaObject, None, objects, parts, &extras)
            .await
    }

    async fn store_dia_sources(
        &self,
        table: ApdbTable,
        sources: &RecordBatch,
        parts: &[i64],
        time_part: i64,
    ) -> Result<()> {
        let mut extras = Vec::new();
        let mut table_suffix = None;
        if self.config.time_partition_tables {
            table_suffix = Some(time_part);
        } else {
            extras.push((
                TIME_PARTITION_COLUMN.to_string(),
                Some(CqlValue::BigInt(time_part)),
            ));
        }
        self.write_table(table, table_suffix, sources, parts, &extras)
            .await
    }

    async fn write_table(
        &self,
        table: ApdbTable,
        table_suffix: Option<i64>,
        batch: &RecordBatch,
        parts: &[i64],
        extra_columns: &[(String, Option<CqlValue>)],
    ) -> Result<()> {
        let column_map = self.schema.column_map(table)?;
        let data = build_insert_data(batch, &column_map, parts, extra_columns)?;

        // all partitioning and clustering columns must be present before
        // anything is sent to the cluster
        let mut required = self.schema.partition_columns(table)?;
        required.extend(self.schema.clustering_columns(table)?);
        check_required_columns(&data.columns, &required)?;

        let mut physical = self.schema.table_name(table);
        if let Some(suffix) = table_suffix {
            physical = format!("{physical}_{suffix}");
        }
        debug!("{physical}: will store {} records", data.rows.len());
        if data.rows.is_empty() {
            return Ok(());
        }

        let quoted: Vec<String> = data.columns.iter().map(|c| quote_id(c)).collect();
        let holders = vec!["?"; data.columns.len()].join(",");
        let cql = format!(
            "INSERT INTO \"{}\".\"{}\" ({}) VALUES ({})",
            self.session.keyspace(),
            physical,
            quoted.join(","),
            holders
        );

        let mut insert_batch = Batch::new(BatchType::Logged);
        if self.config.prepared_statements {
            let prepared = self
                .session
                .prepared_insert(&physical, &data.columns, &cql)
                .await?;
            for _ in 0..data.rows.len() {
                insert_batch.append_statement(prepared.clone());
            }
        } else {
            for _ in 0..data.rows.len() {
                insert_batch.append_statement(Query::new(cql.clone()));
            }
        }
        self.session.execute_batch(insert_batch, data.rows).await
    }
}

/// Every partitioning and clustering column must be present in an INSERT.
pub fn check_required_columns(columns: &[String], required: &[String]) -> Result<()> {
    let missing: Vec<&String> = required.iter().filter(|c| !columns.contains(c)).collect();
    if !missing.is_empty() {
        return Err(Error::Data(format!(
            "primary key columns are missing from catalog: {missing:?}"
        )));
    }
    Ok(())
}

/// Spatial partition of every DiaObject, plus the id -> partition map used
/// to propagate partitions to the source catalogs. Any `apdb_part` column
/// already present in the input is ignored and recomputed.
pub fn object_partitions(
    objects: &RecordBatch,
    partitioner: &SpatialPartitioner,
    ra_col: &str,
    dec_col: &str,
) -> Result<(Vec<i64>, HashMap<i64, i64>)> {
    let ids = int64_column(objects, "diaObjectId")?;
    let mut parts = Vec::with_capacity(objects.num_rows());
    let mut id_map = HashMap::with_capacity(objects.num_rows());
    for row in 0..objects.num_rows() {
        let ra = f64_value(objects, ra_col, row)?;
        let dec = f64_value(objects, dec_col, row)?;
        let pixel = partitioner.pixel_for_ra_dec(ra, dec);
        parts.push(pixel);
        id_map.insert(ids.value(row), pixel);
    }
    Ok((parts, id_map))
}

/// Partition of every DiaSource: copied from the associated DiaObject, or
/// derived from the source's own coordinates for solar-system associations
/// (`diaObjectId == 0`).
pub fn source_partitions(
    sources: &RecordBatch,
    id_map: &HashMap<i64, i64>,
    partitioner: &SpatialPartitioner,
    ra_col: &str,
    dec_col: &str,
) -> Result<Vec<i64>> {
    let ids = int64_column(sources, "diaObjectId")?;
    let mut parts = Vec::with_capacity(sources.num_rows());
    for row in 0..sources.num_rows() {
        let id = ids.value(row);
        if id == 0 {
            let ra = f64_value(sources, ra_col, row)?;
            let dec = f64_value(sources, dec_col, row)?;
            parts.push(partitioner.pixel_for_ra_dec(ra, dec));
        } else {
            let pixel = id_map.get(&id).ok_or_else(|| {
                Error::Data(format!("DiaSource references unknown diaObjectId {id}"))
            })?;
            parts.push(*pixel);
        }
    }
    Ok(parts)
}

/// Partition of every DiaForcedSource, always copied from the associated
/// DiaObject; forced photometry has no coordinates of its own to fall back
/// on.
pub fn forced_source_partitions(
    forced_sources: &RecordBatch,
    id_map: &HashMap<i64, i64>,
) -> Result<Vec<i64>> {
    let ids = int64_column(forced_sources, "diaObjectId")?;
    let mut parts = Vec::with_capacity(forced_sources.num_rows());
    for row in 0..forced_sources.num_rows() {
        let id = ids.value(row);
        let pixel = id_map.get(&id).ok_or_else(|| {
            Error::Data(format!(
                "DiaForcedSource references unknown diaObjectId {id}"
            ))
        })?;
        parts.push(*pixel);
    }
    Ok(parts)
}

/// Build the column list and per-row values for one table: the input
/// columns known to the catalog, the derived spatial partition, then the
/// extra engine-computed columns. Extras win over same-named input columns.
pub fn build_insert_data(
    batch: &RecordBatch,
    column_map: &HashMap<&str, &ColumnDef>,
    parts: &[i64],
    extra_columns: &[(String, Option<CqlValue>)],
) -> Result<InsertData> {
    let schema = batch.schema();
    let mut batch_fields: Vec<(usize, &ColumnDef)> = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    for (index, field) in schema.fields().iter().enumerate() {
        let name = field.name().as_str();
        if name == crate::schema::SPATIAL_PARTITION_COLUMN
            || extra_columns.iter().any(|(extra, _)| extra == name)
        {
            continue;
        }
        let Some(def) = column_map.get(name).copied() else {
            continue;
        };
        batch_fields.push((index, def));
        columns.push(name.to_string());
    }
    columns.push(crate::schema::SPATIAL_PARTITION_COLUMN.to_string());
    columns.extend(extra_columns.iter().map(|(name, _)| name.clone()));

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut values: Vec<Option<CqlValue>> = Vec::with_capacity(columns.len());
        for (index, def) in &batch_fields {
            values.push(arrow_value_to_cql(
                batch.column(*index),
                row,
                def.column_type,
                &def.name,
            )?);
        }
        values.push(Some(CqlValue::BigInt(parts[row])));
        values.extend(extra_columns.iter().map(|(_, value)| value.clone()));
        rows.push(values);
    }
    Ok(InsertData { columns, rows })
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::Data(format!("input catalog has no {name} column")))?;
    batch
        .column(index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| Error::Data(format!("column {name} must be 64-bit integer")))
}

fn f64_value(batch: &RecordBatch, name: &str, row: usize) -> Result<f64> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::Data(format!("input catalog has no {name} column")))?;
    let column = batch.column(index);
    if let Some(array) = column.as_any().downcast_ref::<Float64Array>() {
        return Ok(array.value(row));
    }
    if let Some(array) = column.as_any().downcast_ref::<Float32Array>() {
        return Ok(array.value(row) as f64);
    }
    Err(Error::Data(format!(
        "column {name} must be floating point"
    )))
}

/// Convert one cell to its wire value. Nulls and non-finite floats become
/// NULL; datetimes become epoch milliseconds. Numeric datetime columns are
/// interpreted as seconds since the epoch.
fn arrow_value_to_cql(
    column: &dyn Array,
    row: usize,
    column_type: ColumnType,
    name: &str,
) -> Result<Option<CqlValue>> {
    if column.is_null(row) {
        return Ok(None);
    }
    let any = column.as_any();
    let value = match column_type {
        ColumnType::Double => {
            let v = if let Some(a) = any.downcast_ref::<Float64Array>() {
                a.value(row)
            } else if let Some(a) = any.downcast_ref::<Float32Array>() {
                a.value(row) as f64
            } else {
                return mismatch(name, column_type);
            };
            if !v.is_finite() {
                return Ok(None);
            }
            CqlValue::Double(v)
        }
        ColumnType::Float => {
            let v = if let Some(a) = any.downcast_ref::<Float32Array>() {
                a.value(row)
            } else if let Some(a) = any.downcast_ref::<Float64Array>() {
                a.value(row) as f32
            } else {
                return mismatch(name, column_type);
            };
            if !v.is_finite() {
                return Ok(None);
            }
            CqlValue::Float(v)
        }
        ColumnType::BigInt => {
            let Some(a) = any.downcast_ref::<Int64Array>() else {
                return mismatch(name, column_type);
            };
            CqlValue::BigInt(a.value(row))
        }
        ColumnType::Int | ColumnType::TinyInt => {
            let v = if let Some(a) = any.downcast_ref::<Int32Array>() {
                a.value(row)
            } else if let Some(a) = any.downcast_ref::<Int8Array>() {
                a.value(row) as i32
            } else if let Some(a) = any.downcast_ref::<Int64Array>() {
                i32::try_from(a.value(row))
                    .map_err(|_| Error::Data(format!("column {name}: value out of range")))?
            } else {
                return mismatch(name, column_type);
            };
            CqlValue::Int(v)
        }
        ColumnType::Bool => {
            let Some(a) = any.downcast_ref::<BooleanArray>() else {
                return mismatch(name, column_type);
            };
            CqlValue::Boolean(a.value(row))
        }
        ColumnType::Char => {
            let Some(a) = any.downcast_ref::<StringArray>() else {
                return mismatch(name, column_type);
            };
            CqlValue::Text(a.value(row).to_string())
        }
        ColumnType::Blob => {
            let Some(a) = any.downcast_ref::<BinaryArray>() else {
                return mismatch(name, column_type);
            };
            CqlValue::Blob(a.value(row).to_vec())
        }
        ColumnType::DateTime => {
            let millis = if let Some(a) = any.downcast_ref::<TimestampMillisecondArray>() {
                a.value(row)
            } else if let Some(a) = any.downcast_ref::<TimestampMicrosecondArray>() {
                a.value(row) / 1000
            } else if let Some(a) = any.downcast_ref::<Int64Array>() {
                a.value(row) * 1000
            } else if let Some(a) = any.downcast_ref::<Float64Array>() {
                (a.value(row) * 1000.0) as i64
            } else {
                return mismatch(name, column_type);
            };
            CqlValue::Timestamp(CqlTimestamp(millis))
        }
    };
    Ok(Some(value))
}

fn mismatch(name: &str, column_type: ColumnType) -> Result<Option<CqlValue>> {
    Err(Error::Data(format!(
        "column {name} does not match schema type {column_type:?}"
    )))
}
