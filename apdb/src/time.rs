use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// MJD of 1970-01-01T00:00:00 TAI, the zero point of temporal partitioning.
/// Changing this would silently shift every stored row into the wrong
/// partition, so it is a compile-time constant and is recorded in the
/// keyspace metadata.
pub const PARTITION_ZERO_EPOCH_MJD: f64 = 40587.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Modified Julian Date for a timestamp.
///
/// Visit timestamps are carried in TAI throughout the engine; the chrono
/// type is used as a plain linear time scale and no leap-second offset is
/// applied anywhere.
pub fn mjd(time: DateTime<Utc>) -> f64 {
    PARTITION_ZERO_EPOCH_MJD + time.timestamp_millis() as f64 / MILLIS_PER_DAY
}

/// Parse a `yyyy-mm-ddThh:mm:ss` TAI datetime.
pub fn parse_tai(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::Config(format!("cannot parse TAI datetime {value:?}: {e}")))?;
    Ok(naive.and_utc())
}

/// Maps timestamps to integer temporal partitions of a fixed width in days.
#[derive(Debug, Clone, Copy)]
pub struct TimePartitioner {
    days: u32,
}

impl TimePartitioner {
    pub fn new(days: u32) -> Result<Self> {
        if days == 0 {
            return Err(Error::Config(
                "time_partition_days must be positive".to_string(),
            ));
        }
        Ok(Self { days })
    }

    pub fn partition(&self, time: DateTime<Utc>) -> i64 {
        self.partition_mjd(mjd(time))
    }

    pub fn partition_mjd(&self, mjd: f64) -> i64 {
        let days_since_epoch = (mjd - PARTITION_ZERO_EPOCH_MJD).floor() as i64;
        days_since_epoch.div_euclid(self.days as i64)
    }

    /// All partitions intersecting the inclusive MJD interval.
    pub fn partition_range(&self, mjd_start: f64, mjd_end: f64) -> Vec<i64> {
        let first = self.partition_mjd(mjd_start);
        let last = self.partition_mjd(mjd_end);
        (first..=last).collect()
    }
}
