use std::collections::{HashMap, HashSet};

use apdb_sphgeom::Region;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::apdb::Apdb;
use crate::cassandra::cql_arrow_bridge::empty_batch_for_table;
use crate::cassandra::executor::{ResidualFilters, execute_read_plan};
use crate::cassandra::ingest::Ingester;
use crate::cassandra::partitioner::SpatialPartitioner;
use crate::cassandra::planner;
use crate::cassandra::schema::CassandraSchema;
use crate::cassandra::session::ApdbSession;
use crate::config::ApdbConfig;
use crate::error::{Error, Result};
use crate::schema::{ApdbSchema, ApdbTable, TableDef};
use crate::time::{TimePartitioner, mjd, parse_tai};

const DAYS_PER_MONTH: f64 = 30.0;

/// Cassandra implementation of the alert production database.
pub struct ApdbCassandra {
    config: ApdbConfig,
    schema: ApdbSchema,
    partitioner: SpatialPartitioner,
    time_partitioner: TimePartitioner,
    session: ApdbSession,
}

impl ApdbCassandra {
    /// Validate the configuration, load the schema and connect to the
    /// cluster. Fails when the keyspace was initialized with different
    /// partitioning parameters.
    pub async fn connect(config: ApdbConfig) -> Result<Self> {
        config.validate()?;
        let schema = ApdbSchema::load(
            &config.schema_file,
            config.extra_schema_file.as_deref(),
            &config.prefix,
            config.time_partition_tables,
        )?;
        let partitioner = SpatialPartitioner::new(&config)?;
        let time_partitioner = TimePartitioner::new(config.time_partition_days)?;
        let session = ApdbSession::connect(&config).await?;

        let apdb = Self {
            config,
            schema,
            partitioner,
            time_partitioner,
            session,
        };
        CassandraSchema::new(&apdb.session, &apdb.schema, &apdb.config)
            .check_meta()
            .await?;
        Ok(apdb)
    }

    /// Spatial WHERE expressions for a region: an explicit pixel list while
    /// it stays small, a coarse range cover beyond that.
    fn spatial_where(&self, region: &Region) -> (Vec<String>, bool) {
        let pixels = self.partitioner.pixels(region);
        if pixels.len() <= self.config.part_pix_max_ranges {
            debug!("region covers {} pixels", pixels.len());
            let exprs = planner::spatial_pixel_expressions(
                &pixels,
                self.config.query_per_spatial_part,
            );
            (exprs, false)
        } else {
            let ranges = self.partitioner.envelope(region);
            debug!(
                "region covers {} pixels, using {} ranges",
                pixels.len(),
                ranges.len()
            );
            (planner::spatial_range_expressions(&ranges), true)
        }
    }

    async fn get_sources(
        &self,
        region: &Region,
        object_ids: Option<&[i64]>,
        mjd_start: f64,
        mjd_end: f64,
        table: ApdbTable,
    ) -> Result<RecordBatch> {
        let def = self
            .schema
            .table_def(table)
            .ok_or_else(|| Error::Config(format!("no schema for table {table}")))?;

        // empty id list short-circuits to an empty result before planning
        if let Some(ids) = object_ids {
            if ids.is_empty() {
                debug!("{table}: empty object id list");
                return Ok(empty_batch_for_table(def));
            }
        }

        let (spatial, allow_filtering) = self.spatial_where(region);
        let time_parts = self.time_partitioner.partition_range(mjd_start, mjd_end);
        let tables = planner::physical_table_names(
            &self.schema.table_name(table),
            &time_parts,
            self.config.time_partition_tables,
        );
        let temporal = if self.config.time_partition_tables {
            vec![]
        } else {
            planner::temporal_expressions(&time_parts, self.config.query_per_time_part)
        };
        let statements = planner::select_statements(
            self.session.keyspace(),
            &tables,
            &spatial,
            &temporal,
            allow_filtering,
        );
        debug!("{table}: {} queries", statements.len());

        let filters = ResidualFilters {
            object_ids: object_ids.map(|ids| ids.iter().copied().collect::<HashSet<i64>>()),
            // partitions hold whole days; enforce the precise window
            mid_point_tai_after: Some(mjd_start),
        };
        execute_read_plan(
            &self.session,
            statements,
            self.config.read_concurrency,
            self.config.delay_conv,
            &filters,
            def,
        )
        .await
    }
}

#[async_trait]
impl Apdb for ApdbCassandra {
    fn table_def(&self, table: ApdbTable) -> Option<&TableDef> {
        self.schema.table_def(table)
    }

    async fn make_schema(&self, drop: bool) -> Result<()> {
        let part_range = if self.config.time_partition_tables {
            let start = self
                .time_partitioner
                .partition(parse_tai(&self.config.time_partition_start)?);
            let end = self
                .time_partitioner
                .partition(parse_tai(&self.config.time_partition_end)?);
            Some((start, end + 1))
        } else {
            None
        };
        CassandraSchema::new(&self.session, &self.schema, &self.config)
            .make_schema(drop, part_range)
            .await
    }

    async fn get_dia_objects(&self, region: &Region) -> Result<RecordBatch> {
        let def = self
            .schema
            .table_def(ApdbTable::DiaObjectLast)
            .ok_or_else(|| Error::Config("no schema for table DiaObjectLast".to_string()))?;
        let (spatial, allow_filtering) = self.spatial_where(region);
        let tables = vec![self.schema.table_name(ApdbTable::DiaObjectLast)];
        let statements = planner::select_statements(
            self.session.keyspace(),
            &tables,
            &spatial,
            &[],
            allow_filtering,
        );
        debug!("get_dia_objects: {} queries", statements.len());
        execute_read_plan(
            &self.session,
            statements,
            self.config.read_concurrency,
            self.config.delay_conv,
            &ResidualFilters::default(),
            def,
        )
        .await
    }

    async fn get_dia_sources(
        &self,
        region: &Region,
        object_ids: Option<&[i64]>,
        visit_time: DateTime<Utc>,
    ) -> Result<Option<RecordBatch>> {
        let months = self.config.read_sources_months;
        if months == 0 {
            return Ok(None);
        }
        let mjd_end = mjd(visit_time);
        let mjd_start = mjd_end - months as f64 * DAYS_PER_MONTH;
        self.get_sources(region, object_ids, mjd_start, mjd_end, ApdbTable::DiaSource)
            .await
            .map(Some)
    }

    async fn get_dia_forced_sources(
        &self,
        region: &Region,
        object_ids: Option<&[i64]>,
        visit_time: DateTime<Utc>,
    ) -> Result<Option<RecordBatch>> {
        let months = self.config.read_forced_sources_months;
        if months == 0 {
            return Ok(None);
        }
        // forced-source rows carry no usable coordinates, so the id filter
        // is the only way to produce an exact result
        if object_ids.is_none() {
            return Err(Error::NotImplemented(
                "get_dia_forced_sources requires an object id list",
            ));
        }
        let mjd_end = mjd(visit_time);
        let mjd_start = mjd_end - months as f64 * DAYS_PER_MONTH;
        self.get_sources(
            region,
            object_ids,
            mjd_start,
            mjd_end,
            ApdbTable::DiaForcedSource,
        )
        .await
        .map(Some)
    }

    async fn store(
        &self,
        visit_time: DateTime<Utc>,
        objects: &RecordBatch,
        sources: Option<&RecordBatch>,
        forced_sources: Option<&RecordBatch>,
    ) -> Result<()> {
        let ingester = Ingester {
            session: &self.session,
            schema: &self.schema,
            config: &self.config,
            partitioner: &self.partitioner,
            time_partitioner: self.time_partitioner,
        };
        ingester
            .store(visit_time, objects, sources, forced_sources)
            .await
    }

    async fn get_dia_objects_history(
        &self,
        _start_time: DateTime<Utc>,
        _end_time: Option<DateTime<Utc>>,
        _region: Option<&Region>,
    ) -> Result<RecordBatch> {
        Err(Error::NotImplemented(
            "object version history is not maintained by this backend",
        ))
    }

    async fn get_dia_sources_history(
        &self,
        _start_time: DateTime<Utc>,
        _end_time: Option<DateTime<Utc>>,
        _region: Option<&Region>,
    ) -> Result<RecordBatch> {
        Err(Error::NotImplemented(
            "source history reads are not maintained by this backend",
        ))
    }

    async fn get_dia_forced_sources_history(
        &self,
        _start_time: DateTime<Utc>,
        _end_time: Option<DateTime<Utc>>,
        _region: Option<&Region>,
    ) -> Result<RecordBatch> {
        Err(Error::NotImplemented(
            "forced-source history reads are not maintained by this backend",
        ))
    }

    async fn reassign_dia_sources(&self, _id_map: &HashMap<i64, i64>) -> Result<()> {
        Err(Error::NotImplemented(
            "source reassignment is not supported by this backend",
        ))
    }

    async fn count_unassociated_objects(&self) -> Result<u64> {
        Err(Error::NotImplemented(
            "unassociated object counting is not supported by this backend",
        ))
    }

    async fn daily_job(&self) -> Result<()> {
        Ok(())
    }
}
