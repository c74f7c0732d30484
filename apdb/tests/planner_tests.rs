use apdb::cassandra::planner::{
    physical_table_names, quote_id, select_statements, spatial_pixel_expressions,
    spatial_range_expressions, temporal_expressions,
};

#[test]
fn test_quote_id() {
    assert_eq!(quote_id("flags"), "flags");
    assert_eq!(quote_id("diaObjectId"), "\"diaObjectId\"");
    assert_eq!(quote_id("apdb_part"), "apdb_part");
}

#[test]
fn test_spatial_in_list() {
    let exprs = spatial_pixel_expressions(&[3, 5, 9], false);
    assert_eq!(exprs, vec!["\"apdb_part\" IN (3,5,9)".to_string()]);
}

#[test]
fn test_spatial_per_partition() {
    let exprs = spatial_pixel_expressions(&[3, 5], true);
    assert_eq!(
        exprs,
        vec![
            "\"apdb_part\" = 3".to_string(),
            "\"apdb_part\" = 5".to_string()
        ]
    );
}

#[test]
fn test_spatial_empty_pixel_set() {
    assert!(spatial_pixel_expressions(&[], false).is_empty());
    assert!(spatial_pixel_expressions(&[], true).is_empty());
}

#[test]
fn test_spatial_ranges() {
    let exprs = spatial_range_expressions(&[(10, 11), (20, 25)]);
    assert_eq!(
        exprs,
        vec![
            "\"apdb_part\" = 10".to_string(),
            "\"apdb_part\" >= 20 AND \"apdb_part\" <= 24".to_string()
        ]
    );
}

#[test]
fn test_temporal_in_list() {
    let exprs = temporal_expressions(&[620, 621], false);
    assert_eq!(exprs, vec!["\"apdb_time_part\" IN (620,621)".to_string()]);
}

#[test]
fn test_temporal_per_partition() {
    let exprs = temporal_expressions(&[620, 621], true);
    assert_eq!(
        exprs,
        vec![
            "\"apdb_time_part\" = 620".to_string(),
            "\"apdb_time_part\" = 621".to_string()
        ]
    );
}

#[test]
fn test_physical_table_names() {
    assert_eq!(
        physical_table_names("DiaSource", &[607, 608], true),
        vec!["DiaSource_607".to_string(), "DiaSource_608".to_string()]
    );
    assert_eq!(
        physical_table_names("DiaSource", &[607, 608], false),
        vec!["DiaSource".to_string()]
    );
}

#[test]
fn test_select_cross_product() {
    let tables = vec!["DiaSource_607".to_string(), "DiaSource_608".to_string()];
    let spatial = vec![
        "\"apdb_part\" = 1".to_string(),
        "\"apdb_part\" = 2".to_string(),
    ];
    let temporal: Vec<String> = vec![];
    let statements = select_statements("apdb", &tables, &spatial, &temporal, false);
    assert_eq!(statements.len(), 4);
    assert_eq!(
        statements[0],
        "SELECT * from \"apdb\".\"DiaSource_607\" WHERE \"apdb_part\" = 1"
    );
    assert_eq!(
        statements[3],
        "SELECT * from \"apdb\".\"DiaSource_608\" WHERE \"apdb_part\" = 2"
    );
}

#[test]
fn test_select_with_temporal_predicates() {
    let tables = vec!["DiaSource".to_string()];
    let spatial = vec!["\"apdb_part\" IN (1,2)".to_string()];
    let temporal = vec!["\"apdb_time_part\" IN (620,621)".to_string()];
    let statements = select_statements("apdb", &tables, &spatial, &temporal, false);
    assert_eq!(
        statements,
        vec![
            "SELECT * from \"apdb\".\"DiaSource\" WHERE \"apdb_part\" IN (1,2) \
             AND \"apdb_time_part\" IN (620,621)"
                .to_string()
        ]
    );
}

#[test]
fn test_select_allow_filtering() {
    let tables = vec!["DiaObjectLast".to_string()];
    let spatial = vec!["\"apdb_part\" >= 5 AND \"apdb_part\" <= 9".to_string()];
    let statements = select_statements("apdb", &tables, &spatial, &[], true);
    assert_eq!(
        statements,
        vec![
            "SELECT * from \"apdb\".\"DiaObjectLast\" WHERE \
             \"apdb_part\" >= 5 AND \"apdb_part\" <= 9 ALLOW FILTERING"
                .to_string()
        ]
    );
}

#[test]
fn test_empty_spatial_set_yields_empty_plan() {
    let tables = vec!["DiaSource_607".to_string()];
    let statements = select_statements("apdb", &tables, &[], &[], false);
    assert!(statements.is_empty());
}
