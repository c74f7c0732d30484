//! sphgeom : spherical geometry primitives and hierarchical sky pixelization
//!
//! The unit sphere is decomposed into integer-indexed cells at a fixed
//! subdivision level. Three decomposition schemes are provided: HTM
//! (hierarchical triangular mesh), Q3C (quadrilateralized spherical cube)
//! and MQ3C (Q3C with an angular warp that evens out cell areas). All three
//! are hierarchical in base 4, so a cell at a coarse level owns a contiguous
//! index range at any finer level.

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

pub mod htm;
pub mod pixelization;
pub mod q3c;
pub mod region;
pub mod vector;

pub use htm::HtmPixelization;
pub use pixelization::Pixelization;
pub use q3c::{Mq3cPixelization, Q3cPixelization};
pub use region::{CellRelation, Circle, Region};
pub use vector::{LonLat, UnitVector3d, Vector3d};

/// Errors raised by geometry and pixelization constructors.
#[derive(Debug, thiserror::Error)]
pub enum SphgeomError {
    #[error("pixelization level {level} is outside the supported range 0..={max}")]
    InvalidLevel { level: u32, max: u32 },
    #[error("cannot normalize a zero-length vector")]
    ZeroVector,
    #[error("circle radius {0} is outside the valid range [0, pi]")]
    InvalidRadius(f64),
}
