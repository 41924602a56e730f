//! Encounter test between a moving molecule and a stationary one.

use mote_core::{distinguishable, Vec3, EPS};

/// Whether a molecule moving from `start` by `disp` passes within
/// `radius` of `target`.
///
/// Returns the fraction of `disp` at the point of closest approach. Only
/// targets whose closest approach lies on the segment count, so a target
/// behind the start or beyond the end is missed.
pub fn encounter(start: Vec3, disp: Vec3, target: Vec3, radius: f64) -> Option<f64> {
    let len2 = disp.length_squared();
    if len2 <= 0.0 {
        return None;
    }
    let rel = target - start;
    let d = rel.dot(disp);
    let behind = d < 0.0 && distinguishable(d, 0.0, EPS);
    let beyond = d > len2 && distinguishable(d, len2, EPS);
    if behind || beyond {
        return None;
    }
    let perp2 = rel.length_squared() - d * d / len2;
    let r2 = radius * radius;
    if perp2 > r2 && distinguishable(perp2, r2, EPS) {
        return None;
    }
    Some((d / len2).clamp(0.0, 1.0))
}
