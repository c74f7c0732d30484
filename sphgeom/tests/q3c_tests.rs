use apdb_sphgeom::{
    Circle, LonLat, Mq3cPixelization, Pixelization, Q3cPixelization, Region, UnitVector3d,
};

fn pixelizations(level: u32) -> Vec<Box<dyn Pixelization>> {
    vec![
        Box::new(Q3cPixelization::new(level).unwrap()),
        Box::new(Mq3cPixelization::new(level).unwrap()),
    ]
}

#[test]
fn test_level_validation() {
    assert!(Q3cPixelization::new(30).is_ok());
    assert!(Q3cPixelization::new(31).is_err());
    assert!(Mq3cPixelization::new(31).is_err());
}

#[test]
fn test_index_range() {
    let level = 10;
    for pix in pixelizations(level) {
        let hi = 6u64 << (2 * level);
        for lon in [0.0, 60.0, 150.0, 222.0, 355.0] {
            for lat in [-88.0, -30.0, 0.0, 42.0, 89.5] {
                let v = UnitVector3d::from_lonlat(&LonLat::from_degrees(lon, lat));
                assert!(pix.index(&v) < hi);
            }
        }
    }
}

#[test]
fn test_polar_faces() {
    for pix in pixelizations(4) {
        let north = UnitVector3d::new(0.0, 0.0, 1.0).unwrap();
        let south = UnitVector3d::new(0.0, 0.0, -1.0).unwrap();
        assert_eq!(pix.index(&north) >> 8, 0);
        assert_eq!(pix.index(&south) >> 8, 5);
    }
}

#[test]
fn test_child_indices_refine_parent() {
    let coarse = Mq3cPixelization::new(7).unwrap();
    let fine = Mq3cPixelization::new(8).unwrap();
    for lon in [5.0, 91.0, 184.0, 273.0] {
        for lat in [-60.0, -10.0, 20.0, 75.0] {
            let v = UnitVector3d::from_lonlat(&LonLat::from_degrees(lon, lat));
            assert_eq!(fine.index(&v) >> 2, coarse.index(&v));
        }
    }
}

#[test]
fn test_envelope_covers_region() {
    for pix in pixelizations(10) {
        let center = UnitVector3d::new(1.0, 1.0, -1.0).unwrap();
        let radius = 0.025;
        let region = Region::from(Circle::new(center, radius).unwrap());
        let ranges = pix.envelope(&region, 1_000_000);
        assert!(!ranges.is_empty());

        let steps = 32;
        for i in 0..steps {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / steps as f64;
            for r in [0.2, 0.5, 0.85] {
                let offset = radius * r;
                let v = UnitVector3d::new(
                    center.x() + offset * theta.cos(),
                    center.y() + offset * theta.sin(),
                    center.z() + offset * (theta * 2.0).cos() * 0.4,
                )
                .unwrap();
                let idx = pix.index(&v);
                assert!(
                    ranges.iter().any(|&(lo, hi)| idx >= lo && idx < hi),
                    "pixel {idx} not covered"
                );
            }
        }
    }
}

#[test]
fn test_envelope_near_face_corner() {
    // a cap straddling several faces near the +x/+y/+z corner
    for pix in pixelizations(8) {
        let center = UnitVector3d::new(1.0, 1.0, 1.0).unwrap();
        let region = Region::from(Circle::new(center, 0.05).unwrap());
        let ranges = pix.envelope(&region, 1_000_000);
        let idx = pix.index(&center);
        assert!(ranges.iter().any(|&(lo, hi)| idx >= lo && idx < hi));
    }
}

#[test]
fn test_envelope_honors_range_cap() {
    for pix in pixelizations(11) {
        let center = UnitVector3d::new(0.6, -0.7, 0.2).unwrap();
        let region = Region::from(Circle::new(center, 0.08).unwrap());
        let capped = pix.envelope(&region, 8);
        assert!(capped.len() <= 8);
        let idx = pix.index(&center);
        assert!(capped.iter().any(|&(lo, hi)| idx >= lo && idx < hi));
    }
}
