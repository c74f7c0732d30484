use apdb::cassandra::SpatialPartitioner;
use apdb::{ApdbConfig, Error};
use apdb_sphgeom::{
    Circle, HtmPixelization, LonLat, Mq3cPixelization, Pixelization, Region, UnitVector3d,
};

fn config_with(pixelization: &str, level: u32) -> ApdbConfig {
    ApdbConfig {
        part_pixelization: pixelization.to_string(),
        part_pix_level: level,
        ..Default::default()
    }
}

#[test]
fn test_unknown_pixelization_is_fatal() {
    let result = SpatialPartitioner::new(&config_with("healpix", 10));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_pixel_matches_backing_scheme() {
    let direction = UnitVector3d::from_lonlat(&LonLat::from_degrees(123.4, -21.7));

    let partitioner = SpatialPartitioner::new(&config_with("htm", 11)).unwrap();
    let htm = HtmPixelization::new(11).unwrap();
    assert_eq!(partitioner.pixel(&direction), htm.index(&direction) as i64);

    let partitioner = SpatialPartitioner::new(&config_with("mq3c", 10)).unwrap();
    let mq3c = Mq3cPixelization::new(10).unwrap();
    assert_eq!(partitioner.pixel(&direction), mq3c.index(&direction) as i64);
}

#[test]
fn test_pixel_for_ra_dec() {
    let partitioner = SpatialPartitioner::new(&config_with("q3c", 10)).unwrap();
    let direction = UnitVector3d::from_lonlat(&LonLat::from_degrees(45.0, 45.0));
    assert_eq!(
        partitioner.pixel_for_ra_dec(45.0, 45.0),
        partitioner.pixel(&direction)
    );
}

#[test]
fn test_pixels_cover_region() {
    let partitioner = SpatialPartitioner::new(&config_with("mq3c", 10)).unwrap();
    let center = UnitVector3d::new(1.0, 1.0, -1.0).unwrap();
    let region = Region::from(Circle::new(center, 0.025).unwrap());

    let pixels = partitioner.pixels(&region);
    assert!(!pixels.is_empty());
    // every pixel id is unique and the center's own pixel is in the set
    let center_pixel = partitioner.pixel(&center);
    assert!(pixels.contains(&center_pixel));
    let mut sorted = pixels.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), pixels.len());
}

#[test]
fn test_envelope_respects_configured_cap() {
    let config = ApdbConfig {
        part_pix_max_ranges: 8,
        ..config_with("htm", 12)
    };
    let partitioner = SpatialPartitioner::new(&config).unwrap();
    let center = UnitVector3d::new(0.1, -0.9, 0.4).unwrap();
    let region = Region::from(Circle::new(center, 0.05).unwrap());

    let ranges = partitioner.envelope(&region);
    assert!(!ranges.is_empty());
    assert!(ranges.len() <= 8);
    let center_pixel = partitioner.pixel(&center);
    assert!(
        ranges
            .iter()
            .any(|&(lo, hi)| center_pixel >= lo && center_pixel < hi)
    );
}
