use std::f64::consts::{FRAC_PI_2, PI};

use crate::SphgeomError;
use crate::vector::UnitVector3d;

/// Relation of a convex spherical polygon (a pixelization cell) to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRelation {
    /// The cell lies entirely within the region.
    Inside,
    /// The cell and the region overlap but the cell is not contained.
    Intersects,
    /// The cell and the region do not overlap.
    Disjoint,
}

/// A spherical cap: all directions within `radius` radians of `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    center: UnitVector3d,
    radius: f64,
}

impl Circle {
    pub fn new(center: UnitVector3d, radius: f64) -> Result<Self, SphgeomError> {
        if !(0.0..=PI).contains(&radius) || !radius.is_finite() {
            return Err(SphgeomError::InvalidRadius(radius));
        }
        Ok(Self { center, radius })
    }

    pub fn center(&self) -> &UnitVector3d {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn contains(&self, v: &UnitVector3d) -> bool {
        self.center.angle_to(v) <= self.radius
    }

    /// Classify a convex spherical polygon given by its vertices (in either
    /// winding order) against this cap. The result may be conservative:
    /// `Intersects` is allowed where `Inside` would hold, never the reverse.
    pub fn relate_polygon(&self, verts: &[UnitVector3d]) -> CellRelation {
        let inside = verts.iter().filter(|v| self.contains(v)).count();
        if inside == verts.len() {
            // A cap narrower than a hemisphere is convex, so the geodesic
            // hull of contained vertices is contained as well.
            if self.radius < FRAC_PI_2 {
                return CellRelation::Inside;
            }
            return CellRelation::Intersects;
        }
        if inside > 0 {
            return CellRelation::Intersects;
        }
        if convex_polygon_contains(verts, &self.center) {
            return CellRelation::Intersects;
        }
        for i in 0..verts.len() {
            let a = &verts[i];
            let b = &verts[(i + 1) % verts.len()];
            if self.intersects_edge(a, b) {
                return CellRelation::Intersects;
            }
        }
        CellRelation::Disjoint
    }

    /// True when the great-circle arc from `a` to `b` passes within `radius`
    /// of the cap center. Endpoints are assumed to have been tested already.
    fn intersects_edge(&self, a: &UnitVector3d, b: &UnitVector3d) -> bool {
        let n = a.cross(b);
        let len = n.norm();
        if len == 0.0 {
            return false;
        }
        let n = n.scaled(1.0 / len);
        let c = self.center.as_vector();
        // The closest point of the full great circle must fall between the
        // arc endpoints; n x a and b x n are the edge tangents at a and b.
        if c.dot(&n.cross(a.as_vector())) >= 0.0 && c.dot(&b.as_vector().cross(&n)) >= 0.0 {
            let sin_dist = c.dot(&n).abs().min(1.0);
            return sin_dist.asin() <= self.radius;
        }
        false
    }
}

/// A spherical region usable for spatial queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Circle(Circle),
}

impl Region {
    pub fn contains(&self, v: &UnitVector3d) -> bool {
        match self {
            Region::Circle(c) => c.contains(v),
        }
    }

    pub fn relate_polygon(&self, verts: &[UnitVector3d]) -> CellRelation {
        match self {
            Region::Circle(c) => c.relate_polygon(verts),
        }
    }
}

impl From<Circle> for Region {
    fn from(c: Circle) -> Self {
        Region::Circle(c)
    }
}

/// Point-in-polygon test for a convex spherical polygon; tolerates both
/// winding orders by requiring a consistent sign over all edges.
fn convex_polygon_contains(verts: &[UnitVector3d], p: &UnitVector3d) -> bool {
    let mut sign = 0i8;
    for i in 0..verts.len() {
        let a = &verts[i];
        let b = &verts[(i + 1) % verts.len()];
        let s = a.cross(b).dot(p.as_vector());
        if s > 0.0 {
            if sign < 0 {
                return false;
            }
            sign = 1;
        } else if s < 0.0 {
            if sign > 0 {
                return false;
            }
            sign = -1;
        }
    }
    true
}
