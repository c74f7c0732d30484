use std::path::Path;
use std::sync::Arc;

use apdb::cassandra::SpatialPartitioner;
use apdb::cassandra::ingest::{
    build_insert_data, check_required_columns, forced_source_partitions, object_partitions,
    source_partitions,
};
use apdb::{ApdbConfig, ApdbSchema, ApdbTable, Error};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use scylla::frame::response::result::CqlValue;

fn partitioner() -> SpatialPartitioner {
    SpatialPartitioner::new(&ApdbConfig::default()).unwrap()
}

fn schema() -> ApdbSchema {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas/apdb-schema.yaml");
    ApdbSchema::load(&path, None, "", true).unwrap()
}

fn object_batch(ids: &[i64], ra: &[f64], dec: &[f64]) -> RecordBatch {
    RecordBatch::try_from_iter(vec![
        (
            "diaObjectId",
            Arc::new(Int64Array::from(ids.to_vec())) as ArrayRef,
        ),
        ("ra", Arc::new(Float64Array::from(ra.to_vec())) as ArrayRef),
        (
            "decl",
            Arc::new(Float64Array::from(dec.to_vec())) as ArrayRef,
        ),
    ])
    .unwrap()
}

#[test]
fn test_object_partitions() {
    let partitioner = partitioner();
    let batch = object_batch(&[1, 2, 3], &[10.0, 10.1, 200.0], &[-5.0, -5.05, 40.0]);
    let (parts, id_map) = object_partitions(&batch, &partitioner, "ra", "decl").unwrap();

    assert_eq!(parts.len(), 3);
    for (i, (ra, dec)) in [(10.0, -5.0), (10.1, -5.05), (200.0, 40.0)].iter().enumerate() {
        assert_eq!(parts[i], partitioner.pixel_for_ra_dec(*ra, *dec));
    }
    assert_eq!(id_map[&1], parts[0]);
    assert_eq!(id_map[&3], parts[2]);
}

#[test]
fn test_object_partitions_missing_id_column() {
    let partitioner = partitioner();
    let batch = RecordBatch::try_from_iter(vec![(
        "ra",
        Arc::new(Float64Array::from(vec![1.0])) as ArrayRef,
    )])
    .unwrap();
    let result = object_partitions(&batch, &partitioner, "ra", "decl");
    assert!(matches!(result, Err(Error::Data(_))));
}

#[test]
fn test_source_partitions_copied_from_objects() {
    let partitioner = partitioner();
    let objects = object_batch(&[1, 2], &[10.0, 11.0], &[-5.0, -6.0]);
    let (_, id_map) = object_partitions(&objects, &partitioner, "ra", "decl").unwrap();

    let sources = object_batch(&[2, 1, 2], &[10.0, 11.0, 12.0], &[-5.0, -6.0, -7.0]);
    let parts = source_partitions(&sources, &id_map, &partitioner, "ra", "decl").unwrap();
    // the partition comes from the referenced object, not the source coords
    assert_eq!(parts, vec![id_map[&2], id_map[&1], id_map[&2]]);
}

#[test]
fn test_solar_system_source_uses_own_coordinates() {
    let partitioner = partitioner();
    let objects = object_batch(&[1], &[10.0], &[-5.0]);
    let (_, id_map) = object_partitions(&objects, &partitioner, "ra", "decl").unwrap();

    let sources = object_batch(&[0], &[250.0], &[30.0]);
    let parts = source_partitions(&sources, &id_map, &partitioner, "ra", "decl").unwrap();
    assert_eq!(parts, vec![partitioner.pixel_for_ra_dec(250.0, 30.0)]);
}

#[test]
fn test_source_with_unknown_object_rejected() {
    let partitioner = partitioner();
    let objects = object_batch(&[1], &[10.0], &[-5.0]);
    let (_, id_map) = object_partitions(&objects, &partitioner, "ra", "decl").unwrap();

    let sources = object_batch(&[42], &[10.0], &[-5.0]);
    let result = source_partitions(&sources, &id_map, &partitioner, "ra", "decl");
    assert!(matches!(result, Err(Error::Data(_))));
}

#[test]
fn test_forced_source_partitions() {
    let partitioner = partitioner();
    let objects = object_batch(&[7, 8], &[120.0, 121.0], &[15.0, 16.0]);
    let (_, id_map) = object_partitions(&objects, &partitioner, "ra", "decl").unwrap();

    let forced = RecordBatch::try_from_iter(vec![(
        "diaObjectId",
        Arc::new(Int64Array::from(vec![8, 7])) as ArrayRef,
    )])
    .unwrap();
    let parts = forced_source_partitions(&forced, &id_map).unwrap();
    assert_eq!(parts, vec![id_map[&8], id_map[&7]]);

    let unknown = RecordBatch::try_from_iter(vec![(
        "diaObjectId",
        Arc::new(Int64Array::from(vec![0])) as ArrayRef,
    )])
    .unwrap();
    // forced sources have no coordinate fallback, id 0 is unknown too
    assert!(matches!(
        forced_source_partitions(&unknown, &id_map),
        Err(Error::Data(_))
    ));
}

#[test]
fn test_build_insert_data() {
    let schema = schema();
    let column_map = schema.column_map(ApdbTable::DiaObjectLast).unwrap();

    let batch = RecordBatch::try_from_iter(vec![
        (
            "diaObjectId",
            Arc::new(Int64Array::from(vec![11, 12])) as ArrayRef,
        ),
        (
            "ra",
            Arc::new(Float64Array::from(vec![10.0, f64::NAN])) as ArrayRef,
        ),
        (
            "notInSchema",
            Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
        ),
    ])
    .unwrap();
    let extras = vec![(
        "lastNonForcedSource".to_string(),
        Some(CqlValue::Timestamp(scylla::frame::value::CqlTimestamp(
            1_000,
        ))),
    )];
    let data = build_insert_data(&batch, &column_map, &[100, 200], &extras).unwrap();

    // unknown input columns are dropped; derived and extra columns appended
    assert_eq!(
        data.columns,
        vec![
            "diaObjectId".to_string(),
            "ra".to_string(),
            "apdb_part".to_string(),
            "lastNonForcedSource".to_string()
        ]
    );
    assert_eq!(data.rows.len(), 2);
    assert_eq!(data.rows[0][0], Some(CqlValue::BigInt(11)));
    assert_eq!(data.rows[0][1], Some(CqlValue::Double(10.0)));
    assert_eq!(data.rows[0][2], Some(CqlValue::BigInt(100)));
    // non-finite floats are stored as NULL
    assert_eq!(data.rows[1][1], None);
    assert_eq!(data.rows[1][2], Some(CqlValue::BigInt(200)));
}

#[test]
fn test_build_insert_data_overrides_input_partition() {
    let schema = schema();
    let column_map = schema.column_map(ApdbTable::DiaObjectLast).unwrap();

    // an apdb_part column in the input is ignored in favor of the derived one
    let batch = RecordBatch::try_from_iter(vec![
        (
            "diaObjectId",
            Arc::new(Int64Array::from(vec![1])) as ArrayRef,
        ),
        (
            "apdb_part",
            Arc::new(Int64Array::from(vec![999])) as ArrayRef,
        ),
    ])
    .unwrap();
    let data = build_insert_data(&batch, &column_map, &[5], &[]).unwrap();
    assert_eq!(
        data.columns,
        vec!["diaObjectId".to_string(), "apdb_part".to_string()]
    );
    assert_eq!(data.rows[0][1], Some(CqlValue::BigInt(5)));
}

#[test]
fn test_check_required_columns() {
    let columns = vec![
        "diaObjectId".to_string(),
        "apdb_part".to_string(),
        "ra".to_string(),
    ];
    let required = vec!["apdb_part".to_string(), "diaObjectId".to_string()];
    check_required_columns(&columns, &required).unwrap();

    let missing = vec!["apdb_part".to_string(), "validityStart".to_string()];
    assert!(matches!(
        check_required_columns(&columns, &missing),
        Err(Error::Data(_))
    ));
}
