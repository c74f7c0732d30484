use std::f64::consts::FRAC_PI_4;

use crate::SphgeomError;
use crate::pixelization::{Pixelization, normalize_ranges, simplify_ranges};
use crate::region::{CellRelation, Region};
use crate::vector::{UnitVector3d, Vector3d};

/// Highest supported cube subdivision level. A level-L index needs
/// `3 + 2*L` bits (face number plus two bits per subdivision).
pub const MAX_LEVEL: u32 = 30;

/// One cube face: outward normal and the two in-face axes. A face point is
/// `normal + u * u_axis + v * v_axis` with `u, v` in `[-1, 1]`, projected
/// onto the sphere by normalization.
struct Face {
    normal: Vector3d,
    u_axis: Vector3d,
    v_axis: Vector3d,
}

// Face 0 looks at +z, faces 1..=4 ring the equator starting at +x, face 5
// looks at -z. Axes are chosen right-handed so projections are consistent.
const FACES: [Face; 6] = [
    Face {
        normal: Vector3d::new(0.0, 0.0, 1.0),
        u_axis: Vector3d::new(1.0, 0.0, 0.0),
        v_axis: Vector3d::new(0.0, 1.0, 0.0),
    },
    Face {
        normal: Vector3d::new(1.0, 0.0, 0.0),
        u_axis: Vector3d::new(0.0, 1.0, 0.0),
        v_axis: Vector3d::new(0.0, 0.0, 1.0),
    },
    Face {
        normal: Vector3d::new(0.0, 1.0, 0.0),
        u_axis: Vector3d::new(-1.0, 0.0, 0.0),
        v_axis: Vector3d::new(0.0, 0.0, 1.0),
    },
    Face {
        normal: Vector3d::new(-1.0, 0.0, 0.0),
        u_axis: Vector3d::new(0.0, -1.0, 0.0),
        v_axis: Vector3d::new(0.0, 0.0, 1.0),
    },
    Face {
        normal: Vector3d::new(0.0, -1.0, 0.0),
        u_axis: Vector3d::new(1.0, 0.0, 0.0),
        v_axis: Vector3d::new(0.0, 0.0, 1.0),
    },
    Face {
        normal: Vector3d::new(0.0, 0.0, -1.0),
        u_axis: Vector3d::new(1.0, 0.0, 0.0),
        v_axis: Vector3d::new(0.0, -1.0, 0.0),
    },
];

/// Pick the face whose normal is closest to `v` and project onto it.
/// Returns `(face, u, v)` with face coordinates in `[-1, 1]`.
fn face_coords(v: &UnitVector3d) -> (usize, f64, f64) {
    let p = v.as_vector();
    let mut face = 0;
    let mut best = f64::MIN;
    for (i, f) in FACES.iter().enumerate() {
        let d = p.dot(&f.normal);
        if d > best {
            best = d;
            face = i;
        }
    }
    let f = &FACES[face];
    let w = p.dot(&f.normal);
    (face, p.dot(&f.u_axis) / w, p.dot(&f.v_axis) / w)
}

fn face_point(face: &Face, u: f64, v: f64) -> UnitVector3d {
    face.normal
        .sum(&face.u_axis.scaled(u))
        .sum(&face.v_axis.scaled(v))
        .normalized()
        .expect("face points are never at the origin")
}

/// Interleave the bits of `i` (even positions) and `j` (odd positions).
fn morton(mut i: u64, mut j: u64) -> u64 {
    let mut out = 0u64;
    let mut bit = 0;
    while i != 0 || j != 0 {
        out |= (i & 1) << bit | (j & 1) << (bit + 1);
        i >>= 1;
        j >>= 1;
        bit += 2;
    }
    out
}

/// The grid warp distinguishing plain Q3C from MQ3C: grid coordinates are
/// `warp(u)` and cell corners go back through `unwarp`.
trait Warp {
    fn warp(u: f64) -> f64;
    fn unwarp(w: f64) -> f64;
}

/// Gnomonic (linear) grid.
struct Flat;

impl Warp for Flat {
    fn warp(u: f64) -> f64 {
        u
    }

    fn unwarp(w: f64) -> f64 {
        w
    }
}

/// Angular warp that evens out cell areas toward the face edges.
struct Angular;

impl Warp for Angular {
    fn warp(u: f64) -> f64 {
        u.atan() / FRAC_PI_4
    }

    fn unwarp(w: f64) -> f64 {
        (w * FRAC_PI_4).tan()
    }
}

fn cube_index<W: Warp>(level: u32, v: &UnitVector3d) -> u64 {
    let (face, u, w) = face_coords(v);
    let n = 1u64 << level;
    let grid = |c: f64| -> u64 {
        let g = (W::warp(c) + 1.0) / 2.0 * n as f64;
        (g.floor() as i64).clamp(0, n as i64 - 1) as u64
    };
    (face as u64) << (2 * level) | morton(grid(u), grid(w))
}

fn cube_envelope<W: Warp>(
    level: u32,
    region: &Region,
    max_ranges: usize,
) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    for face in 0..6u64 {
        visit::<W>(level, face, 0, -1.0, 1.0, -1.0, 1.0, region, &mut ranges);
    }
    let mut ranges = normalize_ranges(ranges);
    simplify_ranges(&mut ranges, max_ranges);
    ranges
}

/// Recursively classify the cell covering `[w_lo, w_hi] x [v_lo, v_hi]` in
/// warped face coordinates. Cell boundaries are lines on the cube face, so
/// their projections are great-circle arcs and the corner polygon is exact.
#[allow(clippy::too_many_arguments)]
fn visit<W: Warp>(
    level: u32,
    index: u64,
    depth: u32,
    w_lo: f64,
    w_hi: f64,
    v_lo: f64,
    v_hi: f64,
    region: &Region,
    out: &mut Vec<(u64, u64)>,
) {
    let face = &FACES[(index >> (2 * depth)) as usize];
    let corners = [
        face_point(face, W::unwarp(w_lo), W::unwarp(v_lo)),
        face_point(face, W::unwarp(w_hi), W::unwarp(v_lo)),
        face_point(face, W::unwarp(w_hi), W::unwarp(v_hi)),
        face_point(face, W::unwarp(w_lo), W::unwarp(v_hi)),
    ];
    match region.relate_polygon(&corners) {
        CellRelation::Disjoint => {}
        CellRelation::Inside => {
            let shift = 2 * (level - depth);
            out.push((index << shift, (index + 1) << shift));
        }
        CellRelation::Intersects => {
            if depth == level {
                out.push((index, index + 1));
                return;
            }
            let w_mid = (w_lo + w_hi) / 2.0;
            let v_mid = (v_lo + v_hi) / 2.0;
            let quads = [
                (0u64, w_lo, w_mid, v_lo, v_mid),
                (1, w_mid, w_hi, v_lo, v_mid),
                (2, w_lo, w_mid, v_mid, v_hi),
                (3, w_mid, w_hi, v_mid, v_hi),
            ];
            for (child, a, b, c, d) in quads {
                visit::<W>(level, index << 2 | child, depth + 1, a, b, c, d, region, out);
            }
        }
    }
}

fn check_level(level: u32) -> Result<(), SphgeomError> {
    if level > MAX_LEVEL {
        return Err(SphgeomError::InvalidLevel {
            level,
            max: MAX_LEVEL,
        });
    }
    Ok(())
}

/// Quadrilateralized spherical cube with a gnomonic grid.
#[derive(Debug, Clone)]
pub struct Q3cPixelization {
    level: u32,
}

impl Q3cPixelization {
    pub fn new(level: u32) -> Result<Self, SphgeomError> {
        check_level(level)?;
        Ok(Self { level })
    }
}

impl Pixelization for Q3cPixelization {
    fn level(&self) -> u32 {
        self.level
    }

    fn index(&self, v: &UnitVector3d) -> u64 {
        cube_index::<Flat>(self.level, v)
    }

    fn envelope(&self, region: &Region, max_ranges: usize) -> Vec<(u64, u64)> {
        cube_envelope::<Flat>(self.level, region, max_ranges)
    }
}

/// Spherical cube with the area-evening angular warp.
#[derive(Debug, Clone)]
pub struct Mq3cPixelization {
    level: u32,
}

impl Mq3cPixelization {
    pub fn new(level: u32) -> Result<Self, SphgeomError> {
        check_level(level)?;
        Ok(Self { level })
    }
}

impl Pixelization for Mq3cPixelization {
    fn level(&self) -> u32 {
        self.level
    }

    fn index(&self, v: &UnitVector3d) -> u64 {
        cube_index::<Angular>(self.level, v)
    }

    fn envelope(&self, region: &Region, max_ranges: usize) -> Vec<(u64, u64)> {
        cube_envelope::<Angular>(self.level, region, max_ranges)
    }
}
