//! Affine transforms applied to geometry objects during instantiation.

use mote_core::Vec3;

/// An affine map `p -> linear * p + translation`.
///
/// Object trees compose transforms from the root down, so a child is
/// first placed by its own transform and then by each ancestor's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Row-major 3x3 linear part.
    pub linear: [[f64; 3]; 3],
    /// Translation applied after the linear part.
    pub translation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        linear: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        translation: Vec3::ZERO,
    };

    /// Pure translation.
    pub fn translate(t: Vec3) -> Self {
        Self {
            translation: t,
            ..Self::IDENTITY
        }
    }

    /// Axis-aligned scaling about the origin.
    pub fn scale(s: Vec3) -> Self {
        Self {
            linear: [[s.x, 0.0, 0.0], [0.0, s.y, 0.0], [0.0, 0.0, s.z]],
            translation: Vec3::ZERO,
        }
    }

    /// Rotation by `degrees` about `axis` (right-handed, Rodrigues form).
    pub fn rotate(axis: Vec3, degrees: f64) -> Self {
        let a = axis.normalized();
        let (s, c) = degrees.to_radians().sin_cos();
        let t = 1.0 - c;
        Self {
            linear: [
                [t * a.x * a.x + c, t * a.x * a.y - s * a.z, t * a.x * a.z + s * a.y],
                [t * a.x * a.y + s * a.z, t * a.y * a.y + c, t * a.y * a.z - s * a.x],
                [t * a.x * a.z - s * a.y, t * a.y * a.z + s * a.x, t * a.z * a.z + c],
            ],
            translation: Vec3::ZERO,
        }
    }

    /// Apply the linear part only.
    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.linear;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Apply the full affine map to a point.
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.apply_vector(p) + self.translation
    }

    /// `self` followed by `outer`.
    pub fn then(&self, outer: &Transform) -> Transform {
        let a = &outer.linear;
        let b = &self.linear;
        let mut linear = [[0.0; 3]; 3];
        for (i, row) in linear.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
            }
        }
        Transform {
            linear,
            translation: outer.apply_point(self.translation),
        }
    }
}
