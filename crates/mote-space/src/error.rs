//! Error types for partition construction and lookup.

use mote_core::Vec3;
use thiserror::Error;

/// Errors raised by [`Partition`](crate::Partition).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PartitionError {
    /// A point lies outside the partitioned box.
    #[error("point ({}, {}, {}) lies outside the simulation box", point.x, point.y, point.z)]
    OutsideBounds {
        /// The offending point.
        point: Vec3,
    },
    /// The box has zero or negative extent, or non-finite corners.
    #[error("simulation box is empty or not finite")]
    EmptyBounds,
    /// An axis was given zero divisions.
    #[error("axis {axis} has zero divisions")]
    ZeroDivisions {
        /// 0 = x, 1 = y, 2 = z.
        axis: usize,
    },
    /// A requested subvolume edge length is not positive and finite.
    #[error("subvolume edge length must be finite and positive, got {value}")]
    InvalidEdgeLength {
        /// The invalid value.
        value: f64,
    },
    /// The lattice would exceed `u32::MAX` subvolumes.
    #[error("{count} subvolumes exceed the index range")]
    TooManySubvolumes {
        /// The requested count.
        count: u64,
    },
}
