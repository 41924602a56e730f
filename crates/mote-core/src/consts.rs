//! Numeric and physical constants.

/// Relative tolerance used by the geometric predicates.
pub const EPS: f64 = 1e-12;

/// Square root of [`EPS`], used where a looser tolerance is needed
/// (e.g. nudging a point off a wall after a collision).
pub const SQRT_EPS: f64 = 1e-6;

/// A length larger than any simulated geometry.
pub const GIGANTIC: f64 = 1e140;

/// Sentinel time for "never": release intervals and train durations
/// default to this value.
pub const TIME_FOREVER: f64 = f64::MAX;

/// Avogadro's number, per mole.
pub const AVOGADRO: f64 = 6.022_141_79e23;

/// Litres per cubic micrometre.
pub const LITRES_PER_CUBIC_UM: f64 = 1e-15;

/// Scale applied to the interaction radius when sizing neighbor
/// searches, so encounters on a subvolume face are never missed.
pub const RX_RADIUS_MULTIPLIER: f64 = 1.2;
