use std::collections::HashSet;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use futures::StreamExt;
use futures::stream;
use scylla::frame::response::result::{ColumnType as CqlColumnType, CqlValue, Row};
use tracing::{debug, error};

use crate::cassandra::cql_arrow_bridge::{empty_batch_for_table, rows_to_record_batch};
use crate::cassandra::session::ApdbSession;
use crate::error::{Error, Result};
use crate::schema::TableDef;

/// Raw result of one statement: column names and wire types plus undecoded
/// rows. Cheap to merge; conversion to a record batch happens once.
#[derive(Debug)]
pub struct RowSet {
    pub column_names: Vec<String>,
    pub column_types: Vec<CqlColumnType>,
    pub rows: Vec<Row>,
}

/// Residual predicates applied after the partition-scoped statements
/// return. The partition key is coarse (whole pixels, whole days), so exact
/// filtering must happen on rows.
#[derive(Debug, Default)]
pub struct ResidualFilters {
    /// Keep only rows whose `diaObjectId` is in the set.
    pub object_ids: Option<HashSet<i64>>,
    /// Keep only rows with `midPointTai` strictly greater than this MJD.
    pub mid_point_tai_after: Option<f64>,
}

impl ResidualFilters {
    fn is_empty(&self) -> bool {
        self.object_ids.is_none() && self.mid_point_tai_after.is_none()
    }

    /// Drop rows failing any residual predicate.
    pub fn apply(&self, rowset: &mut RowSet) -> Result<()> {
        if self.is_empty() || rowset.rows.is_empty() {
            return Ok(());
        }
        let id_column = match &self.object_ids {
            Some(_) => Some(column_index(rowset, "diaObjectId")?),
            None => None,
        };
        let tai_column = match self.mid_point_tai_after {
            Some(_) => Some(column_index(rowset, "midPointTai")?),
            None => None,
        };
        let mut failure: Option<Error> = None;
        rowset.rows.retain(|row| {
            if failure.is_some() {
                return false;
            }
            match row_passes(row, id_column, &self.object_ids, tai_column, self.mid_point_tai_after)
            {
                Ok(keep) => keep,
                Err(e) => {
                    failure = Some(e);
                    false
                }
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn column_index(rowset: &RowSet, name: &str) -> Result<usize> {
    rowset
        .column_names
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| Error::Data(format!("result set has no {name} column")))
}

fn row_passes(
    row: &Row,
    id_column: Option<usize>,
    object_ids: &Option<HashSet<i64>>,
    tai_column: Option<usize>,
    mid_point_tai_after: Option<f64>,
) -> Result<bool> {
    if let (Some(index), Some(ids)) = (id_column, object_ids) {
        match row.columns.get(index).and_then(|v| v.as_ref()) {
            Some(CqlValue::BigInt(id)) => {
                if !ids.contains(id) {
                    return Ok(false);
                }
            }
            other => {
                return Err(Error::Data(format!(
                    "diaObjectId has unexpected value {other:?}"
                )));
            }
        }
    }
    if let Some(index) = tai_column {
        let threshold = mid_point_tai_after.expect("set together with the index");
        match row.columns.get(index).and_then(|v| v.as_ref()) {
            Some(CqlValue::Double(tai)) => {
                if *tai <= threshold {
                    return Ok(false);
                }
            }
            other => {
                return Err(Error::Data(format!(
                    "midPointTai has unexpected value {other:?}"
                )));
            }
        }
    }
    Ok(true)
}

/// Merge raw result sets, enforcing identical column lists across
/// statements. `None` when there was nothing to merge.
pub fn merge_rowsets(rowsets: Vec<RowSet>) -> Result<Option<RowSet>> {
    let mut merged: Option<RowSet> = None;
    for rowset in rowsets {
        match &mut merged {
            None => merged = Some(rowset),
            Some(acc) => {
                if acc.column_names != rowset.column_names {
                    error!(
                        "different columns returned by queries: {:?} and {:?}",
                        acc.column_names, rowset.column_names
                    );
                    return Err(Error::Data(format!(
                        "different columns returned by queries: {:?} and {:?}",
                        acc.column_names, rowset.column_names
                    )));
                }
                acc.rows.extend(rowset.rows);
            }
        }
    }
    Ok(merged)
}

fn query_result_to_rowset(result: scylla::QueryResult) -> RowSet {
    let column_names = result
        .col_specs
        .iter()
        .map(|spec| spec.name.clone())
        .collect();
    let column_types = result.col_specs.iter().map(|spec| spec.typ.clone()).collect();
    RowSet {
        column_names,
        column_types,
        rows: result.rows.unwrap_or_default(),
    }
}

/// Run the planned statements at bounded concurrency and assemble one
/// result frame.
///
/// Failures do not abort the fan-out: every statement runs to completion
/// and the first error is raised afterwards, so no response stream is left
/// partially consumed. With `delay_conv` the raw rows are merged first and
/// converted once; otherwise each statement's rows convert eagerly and the
/// frames are concatenated.
pub async fn execute_read_plan(
    session: &ApdbSession,
    statements: Vec<String>,
    concurrency: usize,
    delay_conv: bool,
    filters: &ResidualFilters,
    fallback: &TableDef,
) -> Result<RecordBatch> {
    debug!("executing {} statements", statements.len());
    if statements.is_empty() {
        return Ok(empty_batch_for_table(fallback));
    }

    let outcomes: Vec<Result<RowSet>> = stream::iter(statements)
        .map(|cql| async move {
            let result = session.execute_read(&cql).await?;
            Ok(query_result_to_rowset(result))
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut rowsets = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(rowset) => rowsets.push(rowset),
            Err(e) => {
                error!("error returned by query: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    if delay_conv {
        match merge_rowsets(rowsets)? {
            Some(mut rowset) => {
                filters.apply(&mut rowset)?;
                rows_to_record_batch(&rowset.column_names, &rowset.column_types, &rowset.rows)
            }
            None => Ok(empty_batch_for_table(fallback)),
        }
    } else {
        let mut batches = Vec::with_capacity(rowsets.len());
        for mut rowset in rowsets {
            filters.apply(&mut rowset)?;
            batches.push(rows_to_record_batch(
                &rowset.column_names,
                &rowset.column_types,
                &rowset.rows,
            )?);
        }
        match batches.first() {
            None => Ok(empty_batch_for_table(fallback)),
            Some(first) => Ok(concat_batches(&first.schema(), &batches)?),
        }
    }
}
