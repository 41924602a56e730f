//! Callbacks for the output and checkpoint collaborators.
//!
//! The engine reports through an [`OutputHooks`] implementation passed to
//! the run functions. Every method has an empty default, so a driver only
//! implements what it serializes. [`NullHooks`] ignores everything.

use mote_core::{MoleculeId, ObjectId, PathwayIndex, Vec3, WallIndex};
use smallvec::SmallVec;

use crate::counter::Counters;
use crate::metrics::SimulationStats;
use crate::molecule::MoleculeStore;
use crate::snapshot::Snapshot;

/// A volume molecule hitting a wall of a region that reports hits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallHit {
    /// Where the molecule hit the wall.
    pub position: Vec3,
    /// The molecule.
    pub molecule: MoleculeId,
    /// Geometry object owning the wall.
    pub object: ObjectId,
    /// The wall.
    pub wall: WallIndex,
    /// Simulated time of the hit.
    pub time: f64,
}

/// A fired reaction.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionReport {
    /// The pathway that fired.
    pub pathway: PathwayIndex,
    /// Simulated time.
    pub time: f64,
    /// Where it happened.
    pub position: Vec3,
    /// Reactant ids.
    pub reactants: SmallVec<[MoleculeId; 3]>,
    /// Product ids, including reactants kept as products.
    pub products: SmallVec<[MoleculeId; 4]>,
}

/// Read-only view of the world at an iteration or output boundary.
#[derive(Clone, Copy, Debug)]
pub struct IterationReport<'a> {
    /// Completed iterations.
    pub iteration: u64,
    /// Simulated time.
    pub time: f64,
    /// All live molecules.
    pub molecules: &'a MoleculeStore,
    /// Current counters.
    pub counters: &'a Counters,
    /// Cumulative statistics.
    pub stats: &'a SimulationStats,
}

/// Receiver of engine reports.
pub trait OutputHooks {
    /// Called after every completed iteration.
    fn on_iteration(&mut self, _report: &IterationReport<'_>) {}

    /// Called for each wall hit in a region with hit reporting.
    fn on_wall_hit(&mut self, _hit: &WallHit) {}

    /// Called at every periodic output event.
    fn on_periodic_output(&mut self, _report: &IterationReport<'_>) {}

    /// Called for each fired reaction.
    fn on_reaction(&mut self, _reaction: &ReactionReport) {}

    /// Called once, before a fatal resource error is returned, with the
    /// last consistent state.
    fn emergency_checkpoint(&mut self, _snapshot: &Snapshot) {}
}

/// Hooks that ignore every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHooks;

impl OutputHooks for NullHooks {}
