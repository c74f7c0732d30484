use futures::StreamExt;
use futures::stream;
use scylla::frame::response::result::CqlValue;
use scylla::transport::errors::{DbError, QueryError};
use tracing::{debug, info};

use crate::cassandra::planner::quote_id;
use crate::cassandra::session::ApdbSession;
use crate::config::ApdbConfig;
use crate::error::{Error, Result};
use crate::schema::{ApdbSchema, ApdbTable, IndexType, TableDef, split_order};
use crate::time::PARTITION_ZERO_EPOCH_MJD;

/// Table recording the partitioning parameters the keyspace was
/// initialized with.
pub const META_TABLE: &str = "ApdbMeta";

/// DDL statements issued while creating or dropping tables run with this
/// concurrency.
const DDL_CONCURRENCY: usize = 10;

/// CREATE TABLE statement for one physical table: all catalog columns,
/// the partition + clustering key composition, and a clustering order
/// clause when any PRIMARY column asks for descending order.
pub fn create_table_cql(keyspace: &str, physical_name: &str, def: &TableDef) -> String {
    let mut column_defs: Vec<String> = def
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_id(&c.name), c.column_type.cql_name()))
        .collect();

    let mut partition = Vec::new();
    let mut clustering = Vec::new();
    let mut descending = Vec::new();
    for index in &def.indices {
        match index.index_type {
            IndexType::Partition => {
                partition = index.columns.iter().map(|c| format!("\"{c}\"")).collect();
            }
            IndexType::Primary => {
                for column in &index.columns {
                    let (name, desc) = split_order(column);
                    clustering.push(format!("\"{name}\""));
                    descending.push(desc);
                }
            }
            _ => {}
        }
    }
    let partition = if partition.len() > 1 {
        format!("({})", partition.join(", "))
    } else {
        partition.join(", ")
    };
    let mut pkey = vec![partition];
    pkey.extend(clustering.iter().cloned());
    column_defs.push(format!("PRIMARY KEY ({})", pkey.join(", ")));

    let mut cql = format!(
        "CREATE TABLE IF NOT EXISTS \"{keyspace}\".\"{physical_name}\" ({})",
        column_defs.join(", ")
    );
    if descending.iter().any(|d| *d) {
        let order: Vec<String> = clustering
            .iter()
            .zip(&descending)
            .map(|(name, desc)| format!("{name} {}", if *desc { "DESC" } else { "ASC" }))
            .collect();
        cql.push_str(&format!(" WITH CLUSTERING ORDER BY ({})", order.join(", ")));
    }
    cql
}

/// Physical schema management: renders CQL DDL from the logical catalog,
/// expands time-partitioned tables over the configured partition range and
/// guards the partitioning configuration against drift.
pub struct CassandraSchema<'a> {
    session: &'a ApdbSession,
    schema: &'a ApdbSchema,
    config: &'a ApdbConfig,
}

impl<'a> CassandraSchema<'a> {
    pub fn new(session: &'a ApdbSession, schema: &'a ApdbSchema, config: &'a ApdbConfig) -> Self {
        Self {
            session,
            schema,
            config,
        }
    }

    /// Create all tables, idempotently unless `drop` is set. Under
    /// per-table temporal partitioning `part_range` gives the half-open
    /// range of partitions to pre-create for the source tables.
    pub async fn make_schema(&self, drop: bool, part_range: Option<(i64, i64)>) -> Result<()> {
        for table in ApdbTable::ALL {
            let def = self
                .schema
                .table_def(table)
                .ok_or_else(|| Error::Config(format!("no schema for table {table}")))?;
            let base = self.schema.table_name(table);

            let mut table_names = vec![base.clone()];
            if let Some((lo, hi)) = part_range {
                if table.is_time_partitioned() {
                    table_names = (lo..hi).map(|part| format!("{base}_{part}")).collect();
                }
            }
            debug!("making {} physical tables for {table}", table_names.len());

            if drop {
                let drops: Vec<String> = table_names
                    .iter()
                    .map(|name| {
                        format!(
                            "DROP TABLE IF EXISTS \"{}\".\"{name}\"",
                            self.session.keyspace()
                        )
                    })
                    .collect();
                self.run_ddl(drops).await?;
            }

            let creates: Vec<String> = table_names
                .iter()
                .map(|name| create_table_cql(self.session.keyspace(), name, def))
                .collect();
            self.run_ddl(creates).await?;
        }

        self.make_meta_table().await?;
        info!("database schema created in keyspace {}", self.session.keyspace());
        Ok(())
    }

    /// Issue DDL statements concurrently, each awaited individually.
    async fn run_ddl(&self, statements: Vec<String>) -> Result<()> {
        let results: Vec<Result<()>> = stream::iter(statements)
            .map(|cql| async move { self.session.execute_ddl(&cql).await })
            .buffer_unordered(DDL_CONCURRENCY)
            .collect()
            .await;
        results.into_iter().collect()
    }

    /// Create the metadata table and record the partitioning parameters.
    async fn make_meta_table(&self) -> Result<()> {
        let table = self.schema.prefixed_name(META_TABLE);
        let cql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\".\"{}\" (\
             meta_id INT, \
             part_pixelization TEXT, \
             part_pix_level INT, \
             time_partition_tables BOOLEAN, \
             time_partition_days INT, \
             partition_zero_epoch_mjd DOUBLE, \
             PRIMARY KEY (meta_id))",
            self.session.keyspace(),
            table
        );
        self.session.execute_ddl(&cql).await?;

        let insert = format!(
            "INSERT INTO \"{}\".\"{}\" (meta_id, part_pixelization, part_pix_level, \
             time_partition_tables, time_partition_days, partition_zero_epoch_mjd) \
             VALUES (0, ?, ?, ?, ?, ?)",
            self.session.keyspace(),
            table
        );
        self.session
            .execute_write(
                &insert,
                vec![
                    Some(CqlValue::Text(self.config.part_pixelization.clone())),
                    Some(CqlValue::Int(self.config.part_pix_level as i32)),
                    Some(CqlValue::Boolean(self.config.time_partition_tables)),
                    Some(CqlValue::Int(self.config.time_partition_days as i32)),
                    Some(CqlValue::Double(PARTITION_ZERO_EPOCH_MJD)),
                ],
            )
            .await
    }

    /// Compare the recorded partitioning parameters with the current
    /// configuration; a missing metadata table means a fresh keyspace.
    pub async fn check_meta(&self) -> Result<()> {
        let table = self.schema.prefixed_name(META_TABLE);
        let cql = format!(
            "SELECT part_pixelization, part_pix_level, time_partition_tables, \
             time_partition_days FROM \"{}\".\"{}\" WHERE meta_id = 0",
            self.session.keyspace(),
            table
        );
        let result = match self.session.execute_read(&cql).await {
            Ok(result) => result,
            // an unconfigured table means a fresh keyspace
            Err(Error::Query(QueryError::DbError(DbError::Invalid, message))) => {
                debug!("no metadata table yet ({message}), skipping configuration check");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let Some(row) = result.rows.and_then(|mut rows| rows.pop()) else {
            return Ok(());
        };

        let recorded_pixelization = match row.columns.first().and_then(|v| v.as_ref()) {
            Some(CqlValue::Text(s)) => s.clone(),
            _ => return Ok(()),
        };
        let recorded_level = match row.columns.get(1).and_then(|v| v.as_ref()) {
            Some(CqlValue::Int(v)) => *v,
            _ => return Ok(()),
        };
        let recorded_per_table = match row.columns.get(2).and_then(|v| v.as_ref()) {
            Some(CqlValue::Boolean(v)) => *v,
            _ => return Ok(()),
        };
        let recorded_days = match row.columns.get(3).and_then(|v| v.as_ref()) {
            Some(CqlValue::Int(v)) => *v,
            _ => return Ok(()),
        };

        if recorded_pixelization != self.config.part_pixelization
            || recorded_level != self.config.part_pix_level as i32
            || recorded_per_table != self.config.time_partition_tables
            || recorded_days != self.config.time_partition_days as i32
        {
            return Err(Error::Config(format!(
                "configured partitioning (pixelization={}/{}, per_table={}, days={}) disagrees \
                 with the database ({recorded_pixelization}/{recorded_level}, \
                 per_table={recorded_per_table}, days={recorded_days})",
                self.config.part_pixelization,
                self.config.part_pix_level,
                self.config.time_partition_tables,
                self.config.time_partition_days,
            )));
        }
        Ok(())
    }
}
