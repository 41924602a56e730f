//! Cumulative run statistics.
//!
//! [`SimulationStats`] counts the geometric and stochastic work done by
//! the engine. Counters only ever grow; they are part of checkpoints so a
//! restored run reports the same totals as an uninterrupted one.

/// Cumulative counters for a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Completed iterations.
    pub iterations: u64,
    /// Calendar events popped (stale ones included).
    pub events_processed: u64,
    /// Stale calendar events discarded.
    pub stale_events: u64,
    /// Diffusion steps taken by volume and surface molecules.
    pub diffusion_steps: u64,
    /// Subvolumes examined while tracing rays.
    pub ray_voxel_tests: u64,
    /// Ray/wall intersection tests.
    pub ray_polygon_tests: u64,
    /// Ray/wall intersections found.
    pub ray_polygon_colls: u64,
    /// Surface molecules that crossed onto another wall.
    pub mol_moves_between_walls: u64,
    /// Molecule/molecule encounters tested for reaction.
    pub mol_collision_tests: u64,
    /// Reactions fired, all kinds.
    pub reactions_fired: u64,
    /// Molecules created by releases.
    pub molecules_released: u64,
    /// Volume steps cut short by the reflection bound.
    pub reflection_limit_hits: u64,
    /// Surface walks cut short by the edge-crossing bound.
    pub edge_crossing_limit_hits: u64,
    /// Reaction draws where one class, scaled by its tile area or
    /// neighbor count, exceeded probability one.
    pub probability_overflows: u64,
}
