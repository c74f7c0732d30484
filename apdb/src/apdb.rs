use std::collections::HashMap;
use std::sync::Arc;

use apdb_sphgeom::Region;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{ApdbConfig, Backend};
use crate::error::{Error, Result};
use crate::schema::{ApdbTable, TableDef};

/// The alert production database.
///
/// Reads return Arrow record batches. `get_dia_sources` and
/// `get_dia_forced_sources` return `None` when the corresponding history
/// window is configured to zero months; an empty id list returns an empty
/// batch without touching the cluster.
#[async_trait]
pub trait Apdb: Send + Sync {
    /// Definition of a logical table, if the schema defines it.
    fn table_def(&self, table: ApdbTable) -> Option<&TableDef>;

    /// Create all tables; idempotent unless `drop` is set, in which case
    /// existing tables are dropped first.
    async fn make_schema(&self, drop: bool) -> Result<()>;

    /// The latest version of every DiaObject within the region.
    async fn get_dia_objects(&self, region: &Region) -> Result<RecordBatch>;

    /// Recent DiaSource history for the region, optionally restricted to
    /// the given objects. `visit_time` is the upper end of the history
    /// window.
    async fn get_dia_sources(
        &self,
        region: &Region,
        object_ids: Option<&[i64]>,
        visit_time: DateTime<Utc>,
    ) -> Result<Option<RecordBatch>>;

    /// Recent DiaForcedSource history; an object id list is required.
    async fn get_dia_forced_sources(
        &self,
        region: &Region,
        object_ids: Option<&[i64]>,
        visit_time: DateTime<Utc>,
    ) -> Result<Option<RecordBatch>>;

    /// Atomically-keyed append of one visit's catalogs. Tables are written
    /// in the order DiaObjectLast, DiaObject, DiaSource, DiaForcedSource
    /// with no cross-table transaction; replaying a failed call is safe.
    async fn store(
        &self,
        visit_time: DateTime<Utc>,
        objects: &RecordBatch,
        sources: Option<&RecordBatch>,
        forced_sources: Option<&RecordBatch>,
    ) -> Result<()>;

    /// Full DiaObject version history for a time interval.
    async fn get_dia_objects_history(
        &self,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        region: Option<&Region>,
    ) -> Result<RecordBatch>;

    /// Full DiaSource history for a time interval.
    async fn get_dia_sources_history(
        &self,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        region: Option<&Region>,
    ) -> Result<RecordBatch>;

    /// Full DiaForcedSource history for a time interval.
    async fn get_dia_forced_sources_history(
        &self,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        region: Option<&Region>,
    ) -> Result<RecordBatch>;

    /// Re-associate sources from one object to another.
    async fn reassign_dia_sources(&self, id_map: &HashMap<i64, i64>) -> Result<()>;

    /// Number of objects that never got a source associated.
    async fn count_unassociated_objects(&self) -> Result<u64>;

    /// End-of-night maintenance hook.
    async fn daily_job(&self) -> Result<()>;
}

/// Instantiate the backend selected by the configuration.
pub async fn make_apdb(config: ApdbConfig) -> Result<Arc<dyn Apdb>> {
    match config.backend {
        Backend::Cassandra => Ok(Arc::new(
            crate::cassandra::ApdbCassandra::connect(config).await?,
        )),
        Backend::Sql => Err(Error::NotImplemented(
            "the SQL backend is not provided by this crate",
        )),
    }
}
