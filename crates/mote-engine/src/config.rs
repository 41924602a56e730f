//! Simulation configuration and its validation.
//!
//! [`SimConfig`] is a plain struct with defaults matching a typical
//! cellular model (1 µs steps, 10 000 tiles per µm²). [`SimConfig::validate`]
//! runs numbered structural checks and returns the first failure.

use std::time::Duration;

use mote_core::{Aabb, NotifyLevel};
use thiserror::Error;

// ── NotifyConfig ───────────────────────────────────────────────────

/// How loudly the engine reports recoverable model problems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Near-zero-area triangles. Default: `Warn` (removed with a log line).
    pub degenerate_polygons: NotifyLevel,
    /// Reaction classes whose total probability exceeds 1. Default: `Error`.
    pub high_reaction_probability: NotifyLevel,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            degenerate_polygons: NotifyLevel::Warn,
            high_reaction_probability: NotifyLevel::Error,
        }
    }
}

// ── SubvolumeLayout ────────────────────────────────────────────────

/// How the partition bounding box is divided into subvolumes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubvolumeLayout {
    /// A fixed number of divisions along x, y and z.
    PerAxis([u32; 3]),
    /// Divisions chosen so cells are close to this edge length.
    EdgeLength(f64),
}

impl Default for SubvolumeLayout {
    fn default() -> Self {
        Self::PerAxis([4, 4, 4])
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`SimConfig::validate`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `time_step` is NaN, infinite, zero or negative.
    #[error("time_step must be finite and positive, got {value}")]
    InvalidTimeStep {
        /// The rejected value.
        value: f64,
    },
    /// `length_unit` is NaN, infinite, zero or negative.
    #[error("length_unit must be finite and positive, got {value}")]
    InvalidLengthUnit {
        /// The rejected value.
        value: f64,
    },
    /// `rx_radius_3d` was given but is not finite and positive.
    #[error("rx_radius_3d must be finite and positive, got {value}")]
    InvalidInteractionRadius {
        /// The rejected value.
        value: f64,
    },
    /// `bucket_interval` was given but is not finite and positive.
    #[error("bucket_interval must be finite and positive, got {value}")]
    InvalidBucketInterval {
        /// The rejected value.
        value: f64,
    },
    /// A per-axis division count is zero, or an edge length is not positive.
    #[error("invalid subvolume layout: {reason}")]
    InvalidLayout {
        /// Which part of the layout is wrong.
        reason: String,
    },
    /// `partition_margin` is negative or not finite.
    #[error("partition_margin must be finite and non-negative, got {value}")]
    InvalidMargin {
        /// The rejected value.
        value: f64,
    },
    /// Explicit partition bounds are empty or not finite.
    #[error("partition_bounds must be finite with positive extent")]
    InvalidBounds,
    /// `max_edge_crossings` or `max_reflections` is zero.
    #[error("{name} must be at least 1")]
    ZeroBound {
        /// The offending field.
        name: &'static str,
    },
    /// `output_period` was given but is not finite and positive.
    #[error("output_period must be finite and positive, got {value}")]
    InvalidOutputPeriod {
        /// The rejected value.
        value: f64,
    },
}

// ── SimConfig ──────────────────────────────────────────────────────

/// Everything needed to set up a run besides the model itself.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Fixed maximum timestep in seconds. Default: 1e-6.
    pub time_step: f64,
    /// Micrometres per internal length unit. Default: 0.01.
    pub length_unit: f64,
    /// Volume interaction radius in internal units. `None` derives
    /// `1/sqrt(pi)`, the radius of a disk of one tile's area.
    pub rx_radius_3d: Option<f64>,
    /// Calendar bucket width in seconds. `None` uses `time_step`.
    pub bucket_interval: Option<f64>,
    /// Subvolume layout.
    pub partition: SubvolumeLayout,
    /// Padding added around the geometry bounding box. Default: 1.0.
    pub partition_margin: f64,
    /// Explicit partition bounds, overriding the geometry-derived box.
    pub partition_bounds: Option<Aabb>,
    /// Seed for the single random stream.
    pub seed: u64,
    /// Severity policies.
    pub notifications: NotifyConfig,
    /// Bound on edge crossings per surface step. Default: 64.
    pub max_edge_crossings: u32,
    /// Bound on wall reflections per volume step. Default: 64.
    pub max_reflections: u32,
    /// Iterations between molecule store compactions. 0 disables. Default: 500.
    pub defragmentation_period: u64,
    /// Simulated seconds between periodic output events.
    pub output_period: Option<f64>,
    /// Place surface molecules uniformly inside their tile rather than
    /// at its center. Default: true.
    pub randomize_surface_positions: bool,
    /// Tile rings searched when placing surface products. Default: 1.
    pub vacancy_search_radius: u32,
    /// Wall-clock budget, checked between iterations.
    pub wall_clock_budget: Option<Duration>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_step: 1e-6,
            length_unit: 0.01,
            rx_radius_3d: None,
            bucket_interval: None,
            partition: SubvolumeLayout::default(),
            partition_margin: 1.0,
            partition_bounds: None,
            seed: 0,
            notifications: NotifyConfig::default(),
            max_edge_crossings: 64,
            max_reflections: 64,
            defragmentation_period: 500,
            output_period: None,
            randomize_surface_positions: true,
            vacancy_search_radius: 1,
            wall_clock_budget: None,
        }
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl SimConfig {
    /// Check structural invariants. Returns the first failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Timestep.
        if !positive(self.time_step) {
            return Err(ConfigError::InvalidTimeStep {
                value: self.time_step,
            });
        }
        // 2. Length unit.
        if !positive(self.length_unit) {
            return Err(ConfigError::InvalidLengthUnit {
                value: self.length_unit,
            });
        }
        // 3. Interaction radius.
        if let Some(r) = self.rx_radius_3d.filter(|&r| !positive(r)) {
            return Err(ConfigError::InvalidInteractionRadius { value: r });
        }
        // 4. Bucket width.
        if let Some(b) = self.bucket_interval.filter(|&b| !positive(b)) {
            return Err(ConfigError::InvalidBucketInterval { value: b });
        }
        // 5. Layout.
        match self.partition {
            SubvolumeLayout::PerAxis(d) => {
                if let Some(axis) = d.iter().position(|&n| n == 0) {
                    return Err(ConfigError::InvalidLayout {
                        reason: format!("axis {axis} has zero divisions"),
                    });
                }
            }
            SubvolumeLayout::EdgeLength(e) => {
                if !positive(e) {
                    return Err(ConfigError::InvalidLayout {
                        reason: format!("edge length must be finite and positive, got {e}"),
                    });
                }
            }
        }
        // 6. Margin.
        if !(self.partition_margin.is_finite() && self.partition_margin >= 0.0) {
            return Err(ConfigError::InvalidMargin {
                value: self.partition_margin,
            });
        }
        // 7. Explicit bounds.
        if let Some(b) = &self.partition_bounds {
            let e = b.extent();
            if !(b.min.is_finite() && b.max.is_finite()) || e.x <= 0.0 || e.y <= 0.0 || e.z <= 0.0 {
                return Err(ConfigError::InvalidBounds);
            }
        }
        // 8. Loop bounds.
        if self.max_edge_crossings == 0 {
            return Err(ConfigError::ZeroBound {
                name: "max_edge_crossings",
            });
        }
        if self.max_reflections == 0 {
            return Err(ConfigError::ZeroBound {
                name: "max_reflections",
            });
        }
        // 9. Output period.
        if let Some(p) = self.output_period.filter(|&p| !positive(p)) {
            return Err(ConfigError::InvalidOutputPeriod { value: p });
        }
        Ok(())
    }

    /// The interaction radius in internal units.
    pub fn rx_radius(&self) -> f64 {
        self.rx_radius_3d
            .unwrap_or(1.0 / std::f64::consts::PI.sqrt())
    }

    /// The calendar bucket width in seconds.
    pub fn bucket_width(&self) -> f64 {
        self.bucket_interval.unwrap_or(self.time_step)
    }
}
