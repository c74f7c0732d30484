use apdb_sphgeom::{
    HtmPixelization, LonLat, Mq3cPixelization, Pixelization, Q3cPixelization, Region, UnitVector3d,
};
use tracing::debug;

use crate::config::ApdbConfig;
use crate::error::{Error, Result};

/// Granularity used when expanding a region to individual pixels; fine
/// enough that the envelope is exact for any realistic visit region.
const PIXEL_EXPANSION_RANGES: usize = 1_000_000;

/// Computes spatial partition indices for directions and regions under the
/// configured pixelization scheme and level.
#[derive(Debug)]
pub struct SpatialPartitioner {
    pixelization: Box<dyn Pixelization>,
    max_ranges: usize,
}

impl SpatialPartitioner {
    pub fn new(config: &ApdbConfig) -> Result<Self> {
        let level = config.part_pix_level;
        let pixelization: Box<dyn Pixelization> = match config.part_pixelization.as_str() {
            "htm" => Box::new(HtmPixelization::new(level)?),
            "q3c" => Box::new(Q3cPixelization::new(level)?),
            "mq3c" => Box::new(Mq3cPixelization::new(level)?),
            other => {
                return Err(Error::Config(format!("unknown pixelization: {other}")));
            }
        };
        Ok(Self {
            pixelization,
            max_ranges: config.part_pix_max_ranges,
        })
    }

    /// Partition index of a single direction.
    pub fn pixel(&self, direction: &UnitVector3d) -> i64 {
        self.pixelization.index(direction) as i64
    }

    /// Partition index for equatorial coordinates in degrees.
    pub fn pixel_for_ra_dec(&self, ra: f64, dec: f64) -> i64 {
        self.pixel(&UnitVector3d::from_lonlat(&LonLat::from_degrees(ra, dec)))
    }

    /// Every pixel index whose cell intersects the region.
    pub fn pixels(&self, region: &Region) -> Vec<i64> {
        let ranges = self.pixelization.envelope(region, PIXEL_EXPANSION_RANGES);
        let mut indices = Vec::new();
        for (lower, upper) in ranges {
            indices.extend((lower..upper).map(|p| p as i64));
        }
        indices
    }

    /// Coarse envelope of the region as half-open index ranges, at most
    /// `part_pix_max_ranges` of them.
    pub fn envelope(&self, region: &Region) -> Vec<(i64, i64)> {
        let ranges = self.pixelization.envelope(region, self.max_ranges);
        debug!("envelope of {} ranges", ranges.len());
        ranges
            .into_iter()
            .map(|(lo, hi)| (lo as i64, hi as i64))
            .collect()
    }
}
