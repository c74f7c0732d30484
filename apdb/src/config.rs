use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::time::parse_tai;

/// Storage backend selected by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cassandra,
    /// Relational reference backend; recognized but not provided by this
    /// crate.
    Sql,
}

/// Configuration for the database engine.
///
/// All options have defaults suitable for a single-node development
/// cluster. `time_partition_days` and the partition-zero epoch must never
/// change once a keyspace has been initialized; the engine records them in
/// the keyspace and refuses to start when they drift.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApdbConfig {
    pub backend: Backend,
    /// Contact points tried for cluster discovery.
    pub contact_points: Vec<String>,
    /// Internal IP addresses of `contact_points`, for deployments where
    /// nodes advertise addresses that are not routable from the client.
    pub private_ips: Vec<String>,
    /// Keyspace holding all tables; must already exist.
    pub keyspace: String,
    /// Prefix added to every table name.
    pub prefix: String,
    /// Consistency level name for read statements (e.g. QUORUM, ONE).
    pub read_consistency: String,
    /// Consistency level name for write statements.
    pub write_consistency: String,
    /// Timeout for read statements, seconds.
    pub read_timeout: f64,
    /// Timeout for write statements, seconds.
    pub write_timeout: f64,
    /// Number of in-flight statements during a fan-out read.
    pub read_concurrency: usize,
    /// Sky pixelization used for spatial partitioning: htm, q3c or mq3c.
    pub part_pixelization: String,
    /// Pixelization subdivision level.
    pub part_pix_level: u32,
    /// Maximum number of pixel ranges in a coarse envelope; also the pixel
    /// count above which reads switch from IN-lists to range predicates.
    pub part_pix_max_ranges: usize,
    /// Names of the coordinate columns in the DiaObject catalog.
    pub ra_dec_columns: Vec<String>,
    /// Store each temporal partition of the source tables in its own
    /// physical table instead of an in-row partition-key column.
    pub time_partition_tables: bool,
    /// Temporal partition width in days. Must not change after the
    /// database is initialized.
    pub time_partition_days: u32,
    /// First pre-created temporal partition, `yyyy-mm-ddThh:mm:ss` in TAI.
    /// Only used when `time_partition_tables` is set.
    pub time_partition_start: String,
    /// Last pre-created temporal partition, `yyyy-mm-ddThh:mm:ss` in TAI.
    pub time_partition_end: String,
    /// Emit one statement per temporal partition instead of one IN-list.
    /// Only used when `time_partition_tables` is not set.
    pub query_per_time_part: bool,
    /// Emit one statement per spatial partition instead of one IN-list.
    pub query_per_spatial_part: bool,
    /// Merge raw result rows across statements before building the result
    /// frame; cheaper when many partitions respond.
    pub delay_conv: bool,
    /// Cache and reuse prepared INSERT statements.
    pub prepared_statements: bool,
    /// Months of DiaSource history returned by reads; 0 disables source
    /// reads entirely.
    pub read_sources_months: i32,
    /// Months of DiaForcedSource history returned by reads; 0 disables.
    pub read_forced_sources_months: i32,
    /// YAML file with the table schemas.
    pub schema_file: PathBuf,
    /// Optional YAML file with extra columns merged into the schemas.
    pub extra_schema_file: Option<PathBuf>,
}

impl Default for ApdbConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Cassandra,
            contact_points: vec!["127.0.0.1".to_string()],
            private_ips: vec![],
            keyspace: "apdb".to_string(),
            prefix: String::new(),
            read_consistency: "QUORUM".to_string(),
            write_consistency: "QUORUM".to_string(),
            read_timeout: 120.0,
            write_timeout: 10.0,
            read_concurrency: 500,
            part_pixelization: "mq3c".to_string(),
            part_pix_level: 10,
            part_pix_max_ranges: 64,
            ra_dec_columns: vec!["ra".to_string(), "decl".to_string()],
            time_partition_tables: true,
            time_partition_days: 30,
            time_partition_start: "2018-12-01T00:00:00".to_string(),
            time_partition_end: "2030-01-01T00:00:00".to_string(),
            query_per_time_part: false,
            query_per_spatial_part: false,
            delay_conv: true,
            prepared_statements: true,
            read_sources_months: 12,
            read_forced_sources_months: 12,
            schema_file: PathBuf::from("schemas/apdb-schema.yaml"),
            extra_schema_file: None,
        }
    }
}

impl ApdbConfig {
    /// Check option values and combinations that would otherwise fail at
    /// first use.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.part_pixelization.as_str(), "htm" | "q3c" | "mq3c") {
            return Err(Error::Config(format!(
                "unknown pixelization: {}",
                self.part_pixelization
            )));
        }
        if self.ra_dec_columns.len() != 2 {
            return Err(Error::Config(format!(
                "ra_dec_columns must name exactly two columns, got {:?}",
                self.ra_dec_columns
            )));
        }
        if self.time_partition_days == 0 {
            return Err(Error::Config(
                "time_partition_days must be positive".to_string(),
            ));
        }
        if self.read_concurrency == 0 {
            return Err(Error::Config(
                "read_concurrency must be positive".to_string(),
            ));
        }
        if self.contact_points.is_empty() {
            return Err(Error::Config(
                "at least one contact point is required".to_string(),
            ));
        }
        if !self.private_ips.is_empty() && self.private_ips.len() != self.contact_points.len() {
            return Err(Error::Config(
                "private_ips must match contact_points one-to-one".to_string(),
            ));
        }
        if self.time_partition_tables {
            let start = parse_tai(&self.time_partition_start)?;
            let end = parse_tai(&self.time_partition_end)?;
            if start >= end {
                return Err(Error::Config(format!(
                    "time partition range is empty: {} .. {}",
                    self.time_partition_start, self.time_partition_end
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ApdbConfig::default().validate().unwrap();
    }

    #[test]
    fn test_unknown_pixelization_rejected() {
        let config = ApdbConfig {
            part_pixelization: "healpix".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_partition_range_rejected() {
        let config = ApdbConfig {
            time_partition_start: "2030-01-01T00:00:00".to_string(),
            time_partition_end: "2018-12-01T00:00:00".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mismatched_private_ips_rejected() {
        let config = ApdbConfig {
            contact_points: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            private_ips: vec!["192.168.0.1".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let config: ApdbConfig =
            serde_yaml::from_str("keyspace: apdb_test\nread_consistency: ONE\n").unwrap();
        assert_eq!(config.keyspace, "apdb_test");
        assert_eq!(config.read_consistency, "ONE");
        assert_eq!(config.read_concurrency, 500);
    }
}
