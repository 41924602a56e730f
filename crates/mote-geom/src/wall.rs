//! Walls (triangles) and their precomputed local frames.

use mote_core::{
    distinguishable, distinguishable_vec3, ObjectId, RegionIndex, SpeciesId, Vec2, Vec3,
    VertexIndex, WallIndex, EPS,
};
use smallvec::SmallVec;

use crate::edge::EdgeTransform;
use crate::grid::SurfaceGrid;

/// Geometric constants of one triangle.
///
/// The local frame has its origin at the first vertex, `unit_u` along the
/// first edge and `unit_v` completing a right-handed basis with `normal`.
/// In this frame the corners are `(0, 0)`, `(uv_vert1_u, 0)` and
/// `uv_vert2`, with `uv_vert2.v > 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallFrame {
    /// First in-plane axis.
    pub unit_u: Vec3,
    /// Second in-plane axis.
    pub unit_v: Vec3,
    /// Front-facing normal.
    pub normal: Vec3,
    /// Triangle area.
    pub area: f64,
    /// Signed distance of the plane from the origin along `normal`.
    pub distance_to_origin: f64,
    /// Position of the first vertex.
    pub vert0: Vec3,
    /// `u` coordinate of the second vertex (its `v` is zero).
    pub uv_vert1_u: f64,
    /// Local coordinates of the third vertex.
    pub uv_vert2: Vec2,
}

impl WallFrame {
    /// Area of the triangle with the given corners.
    pub fn area_of(v: &[Vec3; 3]) -> f64 {
        0.5 * (v[1] - v[0]).cross(v[2] - v[0]).length()
    }

    /// Compute the frame, or `None` when the triangle is degenerate
    /// (coincident corners or an area indistinguishable from zero).
    pub fn compute(v: &[Vec3; 3]) -> Option<Self> {
        let coincident = !distinguishable_vec3(v[0], v[1], EPS)
            || !distinguishable_vec3(v[1], v[2], EPS)
            || !distinguishable_vec3(v[2], v[0], EPS);
        let area = Self::area_of(v);
        if coincident || !distinguishable(area, 0.0, EPS) {
            return None;
        }

        let f1 = v[1] - v[0];
        let f2 = v[2] - v[0];
        let unit_u = f1.normalized();
        let normal = unit_u.cross(f2).normalized();
        let unit_v = normal.cross(unit_u);

        Some(Self {
            unit_u,
            unit_v,
            normal,
            area,
            distance_to_origin: v[0].dot(normal),
            vert0: v[0],
            uv_vert1_u: f1.dot(unit_u),
            uv_vert2: Vec2::new(f2.dot(unit_u), f2.dot(unit_v)),
        })
    }

    /// Local coordinates of a point (projected onto the plane).
    #[inline]
    pub fn xyz_to_uv(&self, p: Vec3) -> Vec2 {
        let d = p - self.vert0;
        Vec2::new(d.dot(self.unit_u), d.dot(self.unit_v))
    }

    /// World position of local coordinates.
    #[inline]
    pub fn uv_to_xyz(&self, uv: Vec2) -> Vec3 {
        self.vert0 + self.unit_u * uv.u + self.unit_v * uv.v
    }

    /// The three corners in local coordinates.
    pub fn uv_corners(&self) -> [Vec2; 3] {
        [Vec2::ZERO, Vec2::new(self.uv_vert1_u, 0.0), self.uv_vert2]
    }

    /// Whether local coordinates fall inside the triangle, with a
    /// tolerance relative to the triangle's size.
    pub fn contains_uv(&self, uv: Vec2) -> bool {
        let tol = -EPS * self.uv_vert1_u.max(self.uv_vert2.length());
        let c = self.uv_corners();
        (0..3).all(|i| {
            let a = c[i];
            let b = c[(i + 1) % 3];
            (b - a).perp_dot(uv - a) >= tol
        })
    }

    /// Intersect the segment `origin + t * disp`, `t` in `[0, 1]`, with
    /// the triangle.
    pub fn intersect_segment(&self, origin: Vec3, disp: Vec3) -> Option<SegmentHit> {
        let dp = self.normal.dot(disp);
        if !distinguishable(dp, 0.0, EPS) {
            return None;
        }
        let dv = self.distance_to_origin - self.normal.dot(origin);
        let t = dv / dp;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        let point = origin + disp * t;
        if !self.contains_uv(self.xyz_to_uv(point)) {
            return None;
        }
        Some(SegmentHit {
            t,
            point,
            from_front: dp < 0.0,
        })
    }

    /// Find where a 2-D displacement from `start` first leaves the
    /// triangle: the edge index and the fraction of `disp` travelled.
    ///
    /// Returns `None` when the end point is still inside.
    pub fn exit_edge(&self, start: Vec2, disp: Vec2) -> Option<(usize, f64)> {
        let c = self.uv_corners();
        let mut best: Option<(usize, f64)> = None;
        for i in 0..3 {
            let a = c[i];
            let e = c[(i + 1) % 3] - a;
            let rate = e.perp_dot(disp);
            if rate >= 0.0 {
                continue;
            }
            let f0 = e.perp_dot(start - a);
            let t = (-f0 / rate).max(0.0);
            if t < 1.0 && best.is_none_or(|(_, bt)| t < bt) {
                best = Some((i, t));
            }
        }
        best
    }

    /// Reflect a 2-D direction across edge `edge`.
    pub fn reflect_across_edge(&self, edge: usize, d: Vec2) -> Vec2 {
        let c = self.uv_corners();
        let e = (c[(edge + 1) % 3] - c[edge]).normalized();
        let along = e * d.dot(e);
        along * 2.0 - d
    }
}

/// Result of a segment/triangle intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentHit {
    /// Fraction of the displacement at the hit.
    pub t: f64,
    /// Hit position.
    pub point: Vec3,
    /// Whether the segment approached from the side the normal points to.
    pub from_front: bool,
}

/// A triangle of the simulated geometry.
#[derive(Clone, Debug)]
pub struct Wall {
    /// Corner vertices, counter-clockwise seen from the front.
    pub vertices: [VertexIndex; 3],
    /// Owning object.
    pub object: ObjectId,
    /// Triangle index within the owning object's mesh.
    pub polygon: u32,
    /// Precomputed frame. Recomputed when a vertex moves.
    pub frame: WallFrame,
    /// Neighbor across each edge; edge `i` joins corners `i` and `i+1`.
    pub neighbors: [Option<WallIndex>; 3],
    /// Transform from this wall's frame onto each neighbor's frame.
    pub edges: [Option<EdgeTransform>; 3],
    /// Regions this wall belongs to.
    pub regions: SmallVec<[RegionIndex; 4]>,
    /// Surface class inherited from the wall's regions.
    pub surface_class: Option<SpeciesId>,
    /// Whether crossings of this wall are reported to output hooks.
    pub report_hits: bool,
    /// Tiles for surface molecules, created on first use.
    pub grid: Option<SurfaceGrid>,
}

impl Wall {
    /// Whether any edge lacks a neighbor.
    pub fn has_boundary_edge(&self) -> bool {
        self.neighbors.iter().any(Option::is_none)
    }

    /// The edge (0..3) shared with `other`, if any.
    pub fn edge_towards(&self, other: WallIndex) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(other))
    }
}
