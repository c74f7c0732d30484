use crate::SphgeomError;
use crate::pixelization::{Pixelization, normalize_ranges, simplify_ranges};
use crate::region::{CellRelation, Region};
use crate::vector::{UnitVector3d, Vector3d};

/// Highest supported HTM subdivision level. Level-L indices occupy
/// `4 + 2*L` bits, so 24 keeps them comfortably inside an `i64` column.
pub const MAX_LEVEL: u32 = 24;

/// Hierarchical triangular mesh: eight spherical root triangles, each
/// recursively split into four children at the edge midpoints. The root
/// triangles carry indices 8..=15 and every subdivision appends two bits.
#[derive(Debug, Clone)]
pub struct HtmPixelization {
    level: u32,
}

// Vertices of the root octahedron.
const V: [Vector3d; 6] = [
    Vector3d::new(0.0, 0.0, 1.0),
    Vector3d::new(1.0, 0.0, 0.0),
    Vector3d::new(0.0, 1.0, 0.0),
    Vector3d::new(-1.0, 0.0, 0.0),
    Vector3d::new(0.0, -1.0, 0.0),
    Vector3d::new(0.0, 0.0, -1.0),
];

// Root triangles S0..S3, N0..N3 in index order 8..=15, wound so that the
// edge normals point into the triangle.
const ROOTS: [[usize; 3]; 8] = [
    [1, 5, 2],
    [2, 5, 3],
    [3, 5, 4],
    [4, 5, 1],
    [1, 0, 4],
    [4, 0, 3],
    [3, 0, 2],
    [2, 0, 1],
];

type Triangle = [UnitVector3d; 3];

fn root_triangle(i: usize) -> Triangle {
    let [a, b, c] = ROOTS[i];
    // The octahedron vertices are exact unit vectors.
    [
        V[a].normalized().expect("unit vertex"),
        V[b].normalized().expect("unit vertex"),
        V[c].normalized().expect("unit vertex"),
    ]
}

fn triangle_contains(tri: &Triangle, v: &UnitVector3d) -> bool {
    tri[0].cross(&tri[1]).dot(v.as_vector()) >= 0.0
        && tri[1].cross(&tri[2]).dot(v.as_vector()) >= 0.0
        && tri[2].cross(&tri[0]).dot(v.as_vector()) >= 0.0
}

fn children(tri: &Triangle) -> [Triangle; 4] {
    let w0 = tri[1].midpoint(&tri[2]).expect("non-antipodal edge");
    let w1 = tri[2].midpoint(&tri[0]).expect("non-antipodal edge");
    let w2 = tri[0].midpoint(&tri[1]).expect("non-antipodal edge");
    [
        [tri[0], w2, w1],
        [tri[1], w0, w2],
        [tri[2], w1, w0],
        [w0, w1, w2],
    ]
}

impl HtmPixelization {
    pub fn new(level: u32) -> Result<Self, SphgeomError> {
        if level > MAX_LEVEL {
            return Err(SphgeomError::InvalidLevel {
                level,
                max: MAX_LEVEL,
            });
        }
        Ok(Self { level })
    }

    fn visit(&self, tri: &Triangle, index: u64, depth: u32, region: &Region, out: &mut Vec<(u64, u64)>) {
        match region.relate_polygon(tri) {
            CellRelation::Disjoint => {}
            CellRelation::Inside => {
                let shift = 2 * (self.level - depth);
                out.push((index << shift, (index + 1) << shift));
            }
            CellRelation::Intersects => {
                if depth == self.level {
                    out.push((index, index + 1));
                } else {
                    for (i, child) in children(tri).iter().enumerate() {
                        self.visit(child, index << 2 | i as u64, depth + 1, region, out);
                    }
                }
            }
        }
    }
}

impl Pixelization for HtmPixelization {
    fn level(&self) -> u32 {
        self.level
    }

    fn index(&self, v: &UnitVector3d) -> u64 {
        // A direction on a shared edge belongs to the first triangle that
        // reports containment; the fallback guards against rounding noise.
        let root = (0..8)
            .find(|&i| triangle_contains(&root_triangle(i), v))
            .unwrap_or(7);
        let mut tri = root_triangle(root);
        let mut index = root as u64 + 8;
        for _ in 0..self.level {
            let kids = children(&tri);
            let child = (0..3)
                .find(|&i| triangle_contains(&kids[i], v))
                .unwrap_or(3);
            index = index << 2 | child as u64;
            tri = kids[child];
        }
        index
    }

    fn envelope(&self, region: &Region, max_ranges: usize) -> Vec<(u64, u64)> {
        let mut ranges = Vec::new();
        for i in 0..8 {
            self.visit(&root_triangle(i), i as u64 + 8, 0, region, &mut ranges);
        }
        let mut ranges = normalize_ranges(ranges);
        simplify_ranges(&mut ranges, max_ranges);
        ranges
    }
}
