use std::f64::consts::FRAC_PI_2;

use apdb_sphgeom::{CellRelation, Circle, Region, UnitVector3d};

#[test]
fn test_circle_contains() {
    let center = UnitVector3d::new(1.0, 0.0, 0.0).unwrap();
    let circle = Circle::new(center, 0.1).unwrap();

    assert!(circle.contains(&center));
    let near = UnitVector3d::new(1.0, 0.05, 0.0).unwrap();
    assert!(circle.contains(&near));
    let far = UnitVector3d::new(0.0, 1.0, 0.0).unwrap();
    assert!(!circle.contains(&far));
}

#[test]
fn test_circle_rejects_bad_radius() {
    let center = UnitVector3d::new(1.0, 0.0, 0.0).unwrap();
    assert!(Circle::new(center, -0.5).is_err());
    assert!(Circle::new(center, 4.0).is_err());
    assert!(Circle::new(center, f64::NAN).is_err());
}

#[test]
fn test_angle_to() {
    let x = UnitVector3d::new(1.0, 0.0, 0.0).unwrap();
    let y = UnitVector3d::new(0.0, 1.0, 0.0).unwrap();
    assert!((x.angle_to(&y) - FRAC_PI_2).abs() < 1e-12);
    assert!(x.angle_to(&x).abs() < 1e-12);
}

fn octant_polygon() -> Vec<UnitVector3d> {
    vec![
        UnitVector3d::new(1.0, 0.0, 0.0).unwrap(),
        UnitVector3d::new(0.0, 1.0, 0.0).unwrap(),
        UnitVector3d::new(0.0, 0.0, 1.0).unwrap(),
    ]
}

#[test]
fn test_relate_polygon_disjoint() {
    let center = UnitVector3d::new(-1.0, -1.0, -1.0).unwrap();
    let circle = Circle::new(center, 0.2).unwrap();
    assert_eq!(
        Region::from(circle).relate_polygon(&octant_polygon()),
        CellRelation::Disjoint
    );
}

#[test]
fn test_relate_polygon_inside() {
    // a cap large enough to hold the whole first octant
    let center = UnitVector3d::new(1.0, 1.0, 1.0).unwrap();
    let circle = Circle::new(center, 1.3).unwrap();
    assert_eq!(
        Region::from(circle).relate_polygon(&octant_polygon()),
        CellRelation::Inside
    );
}

#[test]
fn test_relate_polygon_intersects_on_vertex() {
    let center = UnitVector3d::new(1.0, 0.0, 0.0).unwrap();
    let circle = Circle::new(center, 0.2).unwrap();
    assert_eq!(
        Region::from(circle).relate_polygon(&octant_polygon()),
        CellRelation::Intersects
    );
}

#[test]
fn test_relate_polygon_intersects_through_edge() {
    // cap centered just outside the octant edge between +x and +y, with no
    // polygon vertex inside the cap
    let center = UnitVector3d::new(1.0, 1.0, -0.1).unwrap();
    let circle = Circle::new(center, 0.15).unwrap();
    assert_eq!(
        Region::from(circle).relate_polygon(&octant_polygon()),
        CellRelation::Intersects
    );
}

#[test]
fn test_relate_polygon_cap_inside_polygon() {
    // small cap strictly inside the octant: no vertices contained, but the
    // cap center is
    let center = UnitVector3d::new(1.0, 1.0, 1.0).unwrap();
    let circle = Circle::new(center, 0.05).unwrap();
    assert_eq!(
        Region::from(circle).relate_polygon(&octant_polygon()),
        CellRelation::Intersects
    );
}

#[test]
fn test_zero_vector_rejected() {
    assert!(UnitVector3d::new(0.0, 0.0, 0.0).is_err());
}
