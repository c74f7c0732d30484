use std::fmt;

use crate::region::Region;
use crate::vector::UnitVector3d;

/// A hierarchical decomposition of the unit sphere into integer-indexed
/// cells at a fixed level.
pub trait Pixelization: fmt::Debug + Send + Sync {
    /// Subdivision level this instance was constructed with.
    fn level(&self) -> u32;

    /// Index of the cell containing `v`.
    fn index(&self, v: &UnitVector3d) -> u64;

    /// A set of half-open index ranges `[lo, hi)` whose cells cover
    /// `region` completely. At most `max_ranges` ranges are returned; the
    /// result is coarsened (never shrunk) to honor the cap, so it may cover
    /// indices outside the region but never misses one inside.
    fn envelope(&self, region: &Region, max_ranges: usize) -> Vec<(u64, u64)>;
}

/// Sort ranges and merge overlapping or adjacent ones.
pub(crate) fn normalize_ranges(mut ranges: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Reduce a normalized range set to at most `max_ranges` entries by
/// repeatedly filling the smallest gap between neighboring ranges. The
/// result covers a superset of the input.
pub(crate) fn simplify_ranges(ranges: &mut Vec<(u64, u64)>, max_ranges: usize) {
    let max_ranges = max_ranges.max(1);
    while ranges.len() > max_ranges {
        let mut best = 1;
        let mut best_gap = u64::MAX;
        for i in 1..ranges.len() {
            let gap = ranges[i].0 - ranges[i - 1].1;
            if gap < best_gap {
                best_gap = gap;
                best = i;
            }
        }
        ranges[best - 1].1 = ranges[best].1;
        ranges.remove(best);
    }
}
