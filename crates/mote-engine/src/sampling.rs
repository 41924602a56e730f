//! Random sampling helpers over the world's single RNG stream.

use mote_core::Vec3;
use rand::Rng;

/// Standard normal sample via the Box-Muller transform.
pub(crate) fn box_muller<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Uniform in `(0, 1]`, safe to take the logarithm of.
pub(crate) fn unit_open<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    1.0 - rng.random::<f64>()
}

/// Isotropic Gaussian displacement with per-axis deviation `sigma`.
pub(crate) fn gaussian_step<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> Vec3 {
    Vec3::new(
        sigma * box_muller(rng),
        sigma * box_muller(rng),
        sigma * box_muller(rng),
    )
}

fn scale_by(v: Vec3, s: Vec3) -> Vec3 {
    Vec3::new(v.x * s.x, v.y * s.y, v.z * s.z)
}

/// Uniform point inside the ellipsoid with the given center and diameters.
pub(crate) fn point_in_ellipsoid<R: Rng + ?Sized>(rng: &mut R, center: Vec3, diameter: Vec3) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return center + scale_by(p, diameter * 0.5);
        }
    }
}

/// Point on the ellipsoid surface; uniform when the ellipsoid is a sphere.
pub(crate) fn point_on_ellipsoid<R: Rng + ?Sized>(rng: &mut R, center: Vec3, diameter: Vec3) -> Vec3 {
    let dir = loop {
        let v = gaussian_step(rng, 1.0);
        if v.length_squared() > 1e-24 {
            break v.normalized();
        }
    };
    center + scale_by(dir, diameter * 0.5)
}
