//! Event-driven Monte Carlo reaction-diffusion engine.
//!
//! A [`World`] owns every piece of mutable simulation state: the
//! [`Calendar`] of pending events, the [`MoleculeStore`], the spatial
//! partition, the geometry (with its surface grids), the species and
//! reaction tables, release programs and counters. It is built from a
//! [`Model`] and a [`SimConfig`], then advanced with
//! [`World::run_iterations`] or [`World::run_until`].
//!
//! Each iteration pops events in time order. A diffusion event moves one
//! molecule: the displacement is traced through subvolumes against walls
//! and nearby molecules, the earliest interaction is resolved by the
//! reaction engine, and the molecule is rescheduled. Release events inject
//! molecules according to their pattern. All randomness comes from one
//! seeded ChaCha8 stream, and every ordering decision has a fixed
//! tie-break, so a run is reproducible bit for bit.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod collide;
pub mod config;
pub mod counter;
mod diffuse;
pub mod error;
pub mod hooks;
mod lifecycle;
pub mod metrics;
pub mod model;
pub mod molecule;
mod outcome;
pub mod reaction;
pub mod release;
mod sampling;
pub mod snapshot;
pub mod species;
mod surface;
pub mod world;

pub use calendar::{Calendar, EventKind, ScheduledEvent};
pub use config::{ConfigError, NotifyConfig, SimConfig, SubvolumeLayout};
pub use counter::Counters;
pub use error::{ModelError, RunError};
pub use hooks::{IterationReport, NullHooks, OutputHooks, ReactionReport, WallHit};
pub use metrics::SimulationStats;
pub use model::Model;
pub use molecule::{Molecule, MoleculeFlags, MoleculeStore, Placement};
pub use reaction::{
    Pathway, PathwayDef, PathwayKind, ReactantSpec, ReactionClass, ReactionKind, ReactionTable,
};
pub use release::{ReleasePattern, ReleaseProgram, ReleaseQuantity, ReleaseShape, ReleaseState};
pub use snapshot::Snapshot;
pub use species::{Permeability, Species, SpeciesDef, SpeciesKind, SpeciesTable};
pub use world::{RunSummary, StepOutcome, World};
