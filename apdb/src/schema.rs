use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Name of the derived spatial partition column.
pub const SPATIAL_PARTITION_COLUMN: &str = "apdb_part";
/// Name of the derived temporal partition column (in-row partitioning only).
pub const TIME_PARTITION_COLUMN: &str = "apdb_time_part";

/// The logical tables managed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApdbTable {
    DiaObject,
    DiaObjectLast,
    DiaSource,
    DiaForcedSource,
}

impl ApdbTable {
    pub const ALL: [ApdbTable; 4] = [
        ApdbTable::DiaObject,
        ApdbTable::DiaObjectLast,
        ApdbTable::DiaSource,
        ApdbTable::DiaForcedSource,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ApdbTable::DiaObject => "DiaObject",
            ApdbTable::DiaObjectLast => "DiaObjectLast",
            ApdbTable::DiaSource => "DiaSource",
            ApdbTable::DiaForcedSource => "DiaForcedSource",
        }
    }

    fn from_name(name: &str) -> Option<ApdbTable> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Tables whose rows rotate across temporal partitions.
    pub fn is_time_partitioned(&self) -> bool {
        matches!(self, ApdbTable::DiaSource | ApdbTable::DiaForcedSource)
    }
}

impl fmt::Display for ApdbTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column types understood by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "DOUBLE")]
    Double,
    #[serde(rename = "FLOAT")]
    Float,
    #[serde(rename = "DATETIME")]
    DateTime,
    #[serde(rename = "BIGINT")]
    BigInt,
    #[serde(rename = "INT", alias = "INTEGER")]
    Int,
    #[serde(rename = "TINYINT")]
    TinyInt,
    #[serde(rename = "BLOB")]
    Blob,
    #[serde(rename = "CHAR")]
    Char,
    #[serde(rename = "BOOL")]
    Bool,
}

impl ColumnType {
    /// CQL type this column is stored as.
    pub fn cql_name(&self) -> &'static str {
        match self {
            ColumnType::Double => "DOUBLE",
            ColumnType::Float => "FLOAT",
            ColumnType::DateTime => "TIMESTAMP",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Int | ColumnType::TinyInt => "INT",
            ColumnType::Blob => "BLOB",
            ColumnType::Char => "TEXT",
            ColumnType::Bool => "BOOLEAN",
        }
    }
}

/// A single column definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: Option<bool>,
    #[serde(default)]
    pub default: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub ucd: Option<String>,
}

/// Kinds of index entries attached to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IndexType {
    #[serde(rename = "PRIMARY")]
    Primary,
    #[serde(rename = "PARTITION")]
    Partition,
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "INDEX")]
    Index,
}

/// An index definition; PARTITION and PRIMARY entries define the physical
/// primary key.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub columns: Vec<String>,
}

/// A complete logical table definition.
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub indices: Vec<IndexDef>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A PRIMARY index column may carry a ` DESC` suffix selecting descending
/// clustering order.
pub fn split_order(column: &str) -> (&str, bool) {
    match column.strip_suffix(" DESC") {
        Some(name) => (name.trim_end(), true),
        None => (column, false),
    }
}

#[derive(Debug, Deserialize)]
struct RawTable {
    table: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    columns: Vec<ColumnDef>,
    #[serde(default)]
    indices: Vec<IndexDef>,
}

/// The logical schema catalog: typed columns and key composition for every
/// table, loaded from YAML. Immutable after construction.
#[derive(Debug, Clone)]
pub struct ApdbSchema {
    tables: HashMap<ApdbTable, TableDef>,
    prefix: String,
}

impl ApdbSchema {
    /// Load table definitions from `schema_file`, merging column overrides
    /// and additions from `extra_schema_file` when given. With
    /// `time_partition_tables` unset the temporal partition column is added
    /// to the partition key of the time-partitioned tables.
    pub fn load(
        schema_file: &Path,
        extra_schema_file: Option<&Path>,
        prefix: &str,
        time_partition_tables: bool,
    ) -> Result<Self> {
        debug!("reading schema file {}", schema_file.display());
        let mut raw = read_schema_documents(schema_file)?;
        if let Some(extra) = extra_schema_file {
            debug!("reading extra schema file {}", extra.display());
            let extras = read_schema_documents(extra)?;
            merge_extra_tables(&mut raw, extras)?;
        }

        let mut tables = HashMap::new();
        for table in raw {
            let Some(kind) = ApdbTable::from_name(&table.table) else {
                debug!("ignoring unknown table {}", table.table);
                continue;
            };
            let mut def = TableDef {
                name: table.table,
                description: table.description,
                columns: apply_default_values(table.columns),
                indices: table.indices,
            };
            validate_keys(&def)?;
            if !time_partition_tables && kind != ApdbTable::DiaObjectLast {
                add_time_partition_column(&mut def);
            }
            tables.insert(kind, def);
        }

        for table in ApdbTable::ALL {
            if !tables.contains_key(&table) {
                return Err(Error::Config(format!(
                    "schema file {} does not define table {table}",
                    schema_file.display()
                )));
            }
        }

        Ok(Self {
            tables,
            prefix: prefix.to_string(),
        })
    }

    /// Definition of a logical table.
    pub fn table_def(&self, table: ApdbTable) -> Option<&TableDef> {
        self.tables.get(&table)
    }

    fn require(&self, table: ApdbTable) -> Result<&TableDef> {
        self.tables
            .get(&table)
            .ok_or_else(|| Error::Config(format!("no schema for table {table}")))
    }

    /// Map of column name to definition for a table.
    pub fn column_map(&self, table: ApdbTable) -> Result<HashMap<&str, &ColumnDef>> {
        let def = self.require(table)?;
        Ok(def.columns.iter().map(|c| (c.name.as_str(), c)).collect())
    }

    /// Columns forming the partition key, in key order.
    pub fn partition_columns(&self, table: ApdbTable) -> Result<Vec<String>> {
        let def = self.require(table)?;
        let index = def
            .indices
            .iter()
            .find(|i| i.index_type == IndexType::Partition)
            .expect("validated at load");
        Ok(index.columns.clone())
    }

    /// Columns forming the clustering key, in key order and with any
    /// ordering suffix stripped.
    pub fn clustering_columns(&self, table: ApdbTable) -> Result<Vec<String>> {
        let def = self.require(table)?;
        let index = def
            .indices
            .iter()
            .find(|i| i.index_type == IndexType::Primary)
            .expect("validated at load");
        Ok(index
            .columns
            .iter()
            .map(|c| split_order(c).0.to_string())
            .collect())
    }

    /// Physical base name of a table, with the configured prefix applied.
    pub fn table_name(&self, table: ApdbTable) -> String {
        format!("{}{}", self.prefix, table.name())
    }

    /// Physical name of an arbitrary (non-catalog) table.
    pub fn prefixed_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

fn read_schema_documents(path: &Path) -> Result<Vec<RawTable>> {
    let text = std::fs::read_to_string(path)?;
    let mut tables = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&text) {
        tables.push(RawTable::deserialize(document)?);
    }
    debug!("read {} tables from {}", tables.len(), path.display());
    Ok(tables)
}

/// Merge extra schema documents into the base set: extra columns override
/// same-named base columns, new columns are appended, and whole tables
/// unknown to the base set are added. Index overrides are not supported.
fn merge_extra_tables(base: &mut Vec<RawTable>, extras: Vec<RawTable>) -> Result<()> {
    let mut extras: HashMap<String, RawTable> =
        extras.into_iter().map(|t| (t.table.clone(), t)).collect();
    for table in base.iter_mut() {
        let Some(extra) = extras.remove(&table.table) else {
            continue;
        };
        if !extra.indices.is_empty() {
            return Err(Error::Config(format!(
                "extra schema for table {} defines indices, merging them is not supported",
                table.table
            )));
        }
        let mut extra_columns: HashMap<String, ColumnDef> = extra
            .columns
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();
        for column in table.columns.iter_mut() {
            if let Some(replacement) = extra_columns.remove(&column.name) {
                *column = replacement;
            }
        }
        let mut appended: Vec<ColumnDef> = extra_columns.into_values().collect();
        appended.sort_by(|a, b| a.name.cmp(&b.name));
        table.columns.extend(appended);
    }
    base.extend(extras.into_values());
    Ok(())
}

/// Columns other than BLOB and DATETIME default to zero unless the schema
/// says otherwise.
fn apply_default_values(mut columns: Vec<ColumnDef>) -> Vec<ColumnDef> {
    for column in columns.iter_mut() {
        if column.default.is_none()
            && !matches!(column.column_type, ColumnType::Blob | ColumnType::DateTime)
        {
            column.default = Some(0.0);
        }
    }
    columns
}

/// Every table needs exactly one PARTITION and one PRIMARY index, and the
/// key columns must exist.
fn validate_keys(def: &TableDef) -> Result<()> {
    for index_type in [IndexType::Partition, IndexType::Primary] {
        let matching: Vec<_> = def
            .indices
            .iter()
            .filter(|i| i.index_type == index_type)
            .collect();
        if matching.len() != 1 {
            return Err(Error::Config(format!(
                "table {} must have exactly one {index_type:?} index, found {}",
                def.name,
                matching.len()
            )));
        }
        for column in &matching[0].columns {
            let (name, _) = split_order(column);
            if def.column(name).is_none() {
                return Err(Error::Config(format!(
                    "index column {name} is not defined in table {}",
                    def.name
                )));
            }
        }
    }
    Ok(())
}

/// In in-row mode the temporal partition id is a regular column and part of
/// the partition key.
fn add_time_partition_column(def: &mut TableDef) {
    if def.column(TIME_PARTITION_COLUMN).is_none() {
        def.columns.push(ColumnDef {
            name: TIME_PARTITION_COLUMN.to_string(),
            column_type: ColumnType::BigInt,
            nullable: Some(false),
            default: Some(0.0),
            description: Some("Temporal partition index.".to_string()),
            unit: None,
            ucd: None,
        });
    }
    for index in def.indices.iter_mut() {
        if index.index_type == IndexType::Partition
            && !index.columns.iter().any(|c| c == TIME_PARTITION_COLUMN)
        {
            index.columns.push(TIME_PARTITION_COLUMN.to_string());
        }
    }
}
