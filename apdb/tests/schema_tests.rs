use std::io::Write;
use std::path::{Path, PathBuf};

use apdb::schema::{SPATIAL_PARTITION_COLUMN, TIME_PARTITION_COLUMN, split_order};
use apdb::{ApdbSchema, ApdbTable, ColumnType, Error};

fn schema_file() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas/apdb-schema.yaml")
}

fn load_default(time_partition_tables: bool) -> ApdbSchema {
    ApdbSchema::load(&schema_file(), None, "", time_partition_tables).unwrap()
}

#[test]
fn test_load_all_tables() {
    let schema = load_default(true);
    for table in ApdbTable::ALL {
        assert!(schema.table_def(table).is_some(), "missing {table}");
    }
}

#[test]
fn test_column_typing() {
    let schema = load_default(true);
    let def = schema.table_def(ApdbTable::DiaSource).unwrap();
    assert_eq!(def.column("midPointTai").unwrap().column_type, ColumnType::Double);
    assert_eq!(def.column("psFlux").unwrap().column_type, ColumnType::Float);
    assert_eq!(def.column("diaSourceId").unwrap().column_type, ColumnType::BigInt);
    assert_eq!(def.column("filterName").unwrap().column_type, ColumnType::Char);
    assert!(def.column("noSuchColumn").is_none());
}

#[test]
fn test_key_columns() {
    let schema = load_default(true);
    assert_eq!(
        schema.partition_columns(ApdbTable::DiaObjectLast).unwrap(),
        vec![SPATIAL_PARTITION_COLUMN.to_string()]
    );
    assert_eq!(
        schema.clustering_columns(ApdbTable::DiaObjectLast).unwrap(),
        vec!["diaObjectId".to_string()]
    );
    // the DESC suffix is stripped from clustering column names
    assert_eq!(
        schema.clustering_columns(ApdbTable::DiaObject).unwrap(),
        vec!["diaObjectId".to_string(), "validityStart".to_string()]
    );
}

#[test]
fn test_in_row_time_partitioning_extends_keys() {
    let schema = load_default(false);
    for table in [ApdbTable::DiaObject, ApdbTable::DiaSource, ApdbTable::DiaForcedSource] {
        assert_eq!(
            schema.partition_columns(table).unwrap(),
            vec![
                SPATIAL_PARTITION_COLUMN.to_string(),
                TIME_PARTITION_COLUMN.to_string()
            ],
            "table {table}"
        );
        assert!(
            schema
                .table_def(table)
                .unwrap()
                .column(TIME_PARTITION_COLUMN)
                .is_some()
        );
    }
    // the latest-version table never partitions by time
    assert_eq!(
        schema.partition_columns(ApdbTable::DiaObjectLast).unwrap(),
        vec![SPATIAL_PARTITION_COLUMN.to_string()]
    );
}

#[test]
fn test_table_name_prefix() {
    let schema = ApdbSchema::load(&schema_file(), None, "test_", true).unwrap();
    assert_eq!(schema.table_name(ApdbTable::DiaSource), "test_DiaSource");
    assert_eq!(schema.prefixed_name("ApdbMeta"), "test_ApdbMeta");
}

#[test]
fn test_split_order() {
    assert_eq!(split_order("validityStart DESC"), ("validityStart", true));
    assert_eq!(split_order("diaObjectId"), ("diaObjectId", false));
}

#[test]
fn test_default_values_applied() {
    let schema = load_default(true);
    let def = schema.table_def(ApdbTable::DiaObject).unwrap();
    // numeric columns default to zero, BLOB/DATETIME stay unset
    assert_eq!(def.column("nDiaSources").unwrap().default, Some(0.0));
    assert_eq!(def.column("validityStart").unwrap().default, None);
}

#[test]
fn test_extra_schema_merge() {
    let mut extra = tempfile::NamedTempFile::new().unwrap();
    write!(
        extra,
        r#"---
table: DiaObject
columns:
- name: pixelScale
  type: FLOAT
  nullable: true
- name: nDiaSources
  type: BIGINT
  nullable: false
"#
    )
    .unwrap();
    let schema = ApdbSchema::load(&schema_file(), Some(extra.path()), "", true).unwrap();
    let def = schema.table_def(ApdbTable::DiaObject).unwrap();
    // new column appended, existing column overridden in place
    assert_eq!(def.column("pixelScale").unwrap().column_type, ColumnType::Float);
    assert_eq!(def.column("nDiaSources").unwrap().column_type, ColumnType::BigInt);
}

#[test]
fn test_extra_schema_with_indices_rejected() {
    let mut extra = tempfile::NamedTempFile::new().unwrap();
    write!(
        extra,
        r#"---
table: DiaObject
columns:
- name: extraCol
  type: FLOAT
indices:
- name: IDX_extra
  type: INDEX
  columns:
  - extraCol
"#
    )
    .unwrap();
    let result = ApdbSchema::load(&schema_file(), Some(extra.path()), "", true);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_missing_partition_index_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"---
table: DiaObject
columns:
- name: diaObjectId
  type: BIGINT
indices:
- name: PK
  type: PRIMARY
  columns:
  - diaObjectId
"#
    )
    .unwrap();
    let result = ApdbSchema::load(file.path(), None, "", true);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unknown_index_column_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"---
table: DiaObject
columns:
- name: diaObjectId
  type: BIGINT
indices:
- name: PK
  type: PRIMARY
  columns:
  - noSuchColumn
- name: PART
  type: PARTITION
  columns:
  - diaObjectId
"#
    )
    .unwrap();
    let result = ApdbSchema::load(file.path(), None, "", true);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_incomplete_schema_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"---
table: DiaObject
columns:
- name: diaObjectId
  type: BIGINT
- name: apdb_part
  type: BIGINT
indices:
- name: PK
  type: PRIMARY
  columns:
  - diaObjectId
- name: PART
  type: PARTITION
  columns:
  - apdb_part
"#
    )
    .unwrap();
    // DiaSource and friends are missing entirely
    let result = ApdbSchema::load(file.path(), None, "", true);
    assert!(matches!(result, Err(Error::Config(_))));
}
