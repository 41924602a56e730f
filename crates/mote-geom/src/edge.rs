//! Rigid 2-D transforms between the frames of adjacent walls.
//!
//! Unfolding wall `b` into the plane of wall `f` about their shared edge
//! turns a walk across the edge into a straight line. The transform stores
//! the rotation and translation that take `f`'s local coordinates to `b`'s.

use mote_core::{Vec2, Vec3, WallIndex};

use crate::wall::WallFrame;

/// Maps local coordinates of one wall onto the frame of its neighbor
/// across a shared edge.
///
/// `p_b = [[cos, sin], [-sin, cos]] * p_f + translate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeTransform {
    /// Cosine of the in-plane rotation.
    pub cos_theta: f64,
    /// Sine of the in-plane rotation.
    pub sin_theta: f64,
    /// Translation applied after rotation.
    pub translate: Vec2,
    /// The wall on the other side.
    pub neighbor: WallIndex,
    /// The same edge's index within the neighbor.
    pub neighbor_edge: u8,
}

impl EdgeTransform {
    /// Compute the transform across the edge from `shared[0]` to
    /// `shared[1]`, both lying on walls `f` and `b`.
    ///
    /// Returns `None` if the shared corners coincide.
    pub fn compute(
        f: &WallFrame,
        b: &WallFrame,
        shared: [Vec3; 2],
        neighbor: WallIndex,
        neighbor_edge: u8,
    ) -> Option<Self> {
        let o_f = f.xyz_to_uv(shared[0]);
        let o_b = b.xyz_to_uv(shared[0]);
        let run_f = f.xyz_to_uv(shared[1]) - o_f;
        let run_b = b.xyz_to_uv(shared[1]) - o_b;
        if run_f.length() == 0.0 || run_b.length() == 0.0 {
            return None;
        }
        let ehat_f = run_f.normalized();
        let ehat_b = run_b.normalized();
        let fhat_f = Vec2::new(-ehat_f.v, ehat_f.u);
        let fhat_b = Vec2::new(-ehat_b.v, ehat_b.u);

        let cos_theta = ehat_f.u * ehat_b.u + fhat_f.u * fhat_b.u;
        let sin_theta = ehat_f.v * ehat_b.u + fhat_f.v * fhat_b.u;

        let mut t = Self {
            cos_theta,
            sin_theta,
            translate: Vec2::ZERO,
            neighbor,
            neighbor_edge,
        };
        t.translate = o_b - t.rotate(o_f);
        Some(t)
    }

    /// Apply the rotation only (for displacements).
    #[inline]
    pub fn rotate(&self, d: Vec2) -> Vec2 {
        Vec2::new(
            self.cos_theta * d.u + self.sin_theta * d.v,
            -self.sin_theta * d.u + self.cos_theta * d.v,
        )
    }

    /// Apply the full transform (for positions).
    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        self.rotate(p) + self.translate
    }
}
