//! Axis-aligned spatial partition for the Mote simulator.
//!
//! The simulation box is cut into a regular lattice of [`Subvolume`]s.
//! Each subvolume owns the ids of the volume molecules inside it and the
//! walls whose bounds overlap it, and links to up to six face neighbors.
//! The lattice is fixed at build time; only membership changes during a
//! run.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod error;
pub mod partition;

pub use direction::Direction;
pub use error::PartitionError;
pub use partition::{Partition, Subvolume};
