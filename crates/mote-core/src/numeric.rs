//! Epsilon-tolerant comparisons.
//!
//! Positions span many orders of magnitude, so "distinguishable" scales
//! the tolerance by the magnitude of the operands instead of using an
//! absolute epsilon.

use crate::vec::{Vec2, Vec3};

/// `|a - b| < eps`.
#[inline]
pub fn cmp_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

/// `a <= b` up to `eps`.
#[inline]
pub fn cmp_le(a: f64, b: f64, eps: f64) -> bool {
    a < b + eps
}

/// `a >= b` up to `eps`.
#[inline]
pub fn cmp_ge(a: f64, b: f64, eps: f64) -> bool {
    a + eps > b
}

/// Whether `a` and `b` differ by more than `eps` relative to the larger
/// magnitude, with magnitudes below one treated as one.
pub fn distinguishable(a: f64, b: f64, eps: f64) -> bool {
    let c = (a - b).abs();
    let scale = a.abs().max(1.0).max(b.abs());
    c > eps * scale
}

/// Vector form of [`distinguishable`]: compares the largest coordinate
/// difference against the largest coordinate magnitude.
pub fn distinguishable_vec2(a: Vec2, b: Vec2, eps: f64) -> bool {
    let c = a.u.abs().max(a.v.abs()).max(b.u.abs()).max(b.v.abs()).max(eps);
    let cc = (a.u - b.u).abs().max((a.v - b.v).abs());
    c * eps < cc
}

/// 3-D form of [`distinguishable_vec2`].
pub fn distinguishable_vec3(a: Vec3, b: Vec3, eps: f64) -> bool {
    let c = a.max_abs().max(b.max_abs()).max(eps);
    let cc = (a - b).max_abs();
    c * eps < cc
}
