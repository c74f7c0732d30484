use std::fmt::Write;

use tracing::debug;

use crate::schema::{SPATIAL_PARTITION_COLUMN, TIME_PARTITION_COLUMN};

/// Quote an identifier for CQL; names that are not all-lowercase must be
/// quoted to preserve case.
pub fn quote_id(name: &str) -> String {
    if name.chars().all(|c| !c.is_ascii_uppercase()) {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

/// Spatial WHERE expressions for an explicit pixel list: one expression per
/// pixel, or a single IN-list.
pub fn spatial_pixel_expressions(pixels: &[i64], per_partition: bool) -> Vec<String> {
    if pixels.is_empty() {
        return vec![];
    }
    if per_partition {
        pixels
            .iter()
            .map(|p| format!("\"{SPATIAL_PARTITION_COLUMN}\" = {p}"))
            .collect()
    } else {
        let mut list = String::new();
        for (i, p) in pixels.iter().enumerate() {
            if i > 0 {
                list.push(',');
            }
            let _ = write!(list, "{p}");
        }
        vec![format!("\"{SPATIAL_PARTITION_COLUMN}\" IN ({list})")]
    }
}

/// Spatial WHERE expressions for a coarse envelope, one per half-open
/// range. Range predicates cannot be served from the partition index alone,
/// so these statements carry ALLOW FILTERING.
pub fn spatial_range_expressions(ranges: &[(i64, i64)]) -> Vec<String> {
    ranges
        .iter()
        .map(|&(lower, upper)| {
            let upper = upper - 1;
            if lower == upper {
                format!("\"{SPATIAL_PARTITION_COLUMN}\" = {lower}")
            } else {
                format!(
                    "\"{SPATIAL_PARTITION_COLUMN}\" >= {lower} AND \"{SPATIAL_PARTITION_COLUMN}\" <= {upper}"
                )
            }
        })
        .collect()
}

/// Temporal WHERE expressions for in-row time partitioning: one expression
/// per partition, or a single IN-list. Empty under per-table partitioning.
pub fn temporal_expressions(time_parts: &[i64], per_partition: bool) -> Vec<String> {
    if time_parts.is_empty() {
        return vec![];
    }
    if per_partition {
        time_parts
            .iter()
            .map(|p| format!("\"{TIME_PARTITION_COLUMN}\" = {p}"))
            .collect()
    } else {
        let list = time_parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        vec![format!("\"{TIME_PARTITION_COLUMN}\" IN ({list})")]
    }
}

/// Physical table names targeted by a read: the per-partition family under
/// per-table mode, otherwise the base table itself.
pub fn physical_table_names(base: &str, time_parts: &[i64], per_table: bool) -> Vec<String> {
    if per_table {
        time_parts.iter().map(|p| format!("{base}_{p}")).collect()
    } else {
        vec![base.to_string()]
    }
}

/// Cross product `{table} x {spatial} x {temporal}`: one SELECT per
/// combination, each restricted to a single partition (or partition range).
/// An empty spatial set yields an empty plan.
pub fn select_statements(
    keyspace: &str,
    tables: &[String],
    spatial: &[String],
    temporal: &[String],
    allow_filtering: bool,
) -> Vec<String> {
    let suffix = if allow_filtering {
        " ALLOW FILTERING"
    } else {
        ""
    };
    let mut statements = Vec::with_capacity(tables.len() * spatial.len() * temporal.len().max(1));
    for table in tables {
        let prefix = format!("SELECT * from \"{keyspace}\".\"{table}\" WHERE ");
        for spatial_where in spatial {
            if temporal.is_empty() {
                statements.push(format!("{prefix}{spatial_where}{suffix}"));
            } else {
                for temporal_where in temporal {
                    statements.push(format!(
                        "{prefix}{spatial_where} AND {temporal_where}{suffix}"
                    ));
                }
            }
        }
    }
    debug!("planned {} statements", statements.len());
    statements
}
