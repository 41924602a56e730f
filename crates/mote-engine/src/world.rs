//! The simulation world and its run loop.
//!
//! [`World`] owns all mutable state. Built from a [`Model`] and a
//! [`SimConfig`], it advances with [`run_iterations`](World::run_iterations),
//! [`run_until`](World::run_until) or one event at a time with
//! [`step_event`](World::step_event). Every state change happens through
//! `&mut self`, so the engine is single-threaded and reproducible.
//!
//! # Iterations
//!
//! Iteration `i` covers simulated time `[i * dt, (i + 1) * dt)`. Diffusion
//! events sit on iteration boundaries; unimolecular, release and output
//! events may fall anywhere. An iteration ends when the next event is at
//! or beyond its end, at which point hooks see a consistent state.
//!
//! # Failure
//!
//! A [`ResourceError`](mote_core::ResourceError) during a run hands the
//! last state to [`OutputHooks::emergency_checkpoint`] before the error is
//! returned.

use std::time::Instant;

use mote_core::{
    Orientation, RegionIndex, ReleaseIndex, SpeciesId, Vec3, VertexIndex, WallIndex,
};
use mote_geom::{GeometryStore, VertexMove};
use mote_space::{Partition, PartitionError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::calendar::{Calendar, EventKind, ScheduledEvent};
use crate::config::{SimConfig, SubvolumeLayout};
use crate::counter::Counters;
use crate::error::{ModelError, RunError};
use crate::hooks::{IterationReport, OutputHooks};
use crate::metrics::SimulationStats;
use crate::model::Model;
use crate::molecule::{MoleculeStore, Placement};
use crate::reaction::ReactionTable;
use crate::release::{ActiveRelease, ReleaseState};
use crate::snapshot::Snapshot;
use crate::species::SpeciesTable;

// ── Results ─────────────────────────────────────────────────────

/// What happened to a molecule during one movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The molecule moved (possibly zero distance) and still exists.
    Moved,
    /// The molecule took part in a reaction.
    Reacted,
    /// An absorptive wall destroyed the molecule.
    Absorbed,
}

/// Summary of a call to [`World::run_iterations`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Iterations completed by this call.
    pub iterations: u64,
    /// Simulated time at return.
    pub time: f64,
    /// Whether the run stopped early on the wall-clock budget.
    pub budget_exhausted: bool,
}

// ── World ───────────────────────────────────────────────────────

/// All state of one simulation.
pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) species: SpeciesTable,
    pub(crate) reactions: ReactionTable,
    pub(crate) geometry: GeometryStore,
    pub(crate) partition: Partition,
    pub(crate) molecules: MoleculeStore,
    pub(crate) calendar: Calendar,
    pub(crate) releases: Vec<ActiveRelease>,
    pub(crate) release_states: Vec<ReleaseState>,
    pub(crate) counters: Counters,
    pub(crate) stats: SimulationStats,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) time: f64,
    pub(crate) iteration: u64,
    pub(crate) rx_radius: f64,
    pub(crate) counts_volume_regions: bool,
}

impl World {
    /// Build a world from a model.
    ///
    /// Validates the configuration, builds the species and reaction
    /// tables, instantiates geometry, partitions space and schedules the
    /// first firing of every release program.
    pub fn new(model: &Model, config: SimConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let mut species = SpeciesTable::build(&model.species, config.time_step, config.length_unit)?;
        let geometry =
            GeometryStore::build(&model.geometry, config.notifications.degenerate_polygons)?;
        for region in geometry.regions() {
            if let Some(class) = region.surface_class {
                let s = species.get(class).ok_or_else(|| ModelError::UnknownSpecies {
                    context: format!("region '{}'", region.name),
                    species: class,
                })?;
                if !s.is_surface_class() {
                    return Err(ModelError::InvalidSpeciesUse {
                        context: format!("region '{}'", region.name),
                        name: s.name.clone(),
                        reason: "only surface classes can be assigned to regions",
                    });
                }
            }
        }
        let reactions = ReactionTable::build(&model.pathways, &mut species, &config)?;

        let bounds = config
            .partition_bounds
            .unwrap_or_else(|| geometry.bounding_box().expanded(config.partition_margin));
        if bounds.is_empty() {
            return Err(ModelError::Partition(PartitionError::EmptyBounds));
        }
        let mut partition = match config.partition {
            SubvolumeLayout::PerAxis(d) => Partition::new(bounds, d)?,
            SubvolumeLayout::EdgeLength(e) => Partition::with_edge_length(bounds, e)?,
        };
        partition.assign_walls(&geometry);

        let counts_volume_regions = geometry.regions().iter().any(|r| r.counted && r.closed);
        let counters = Counters::new(species.len(), reactions.pathway_count());
        let mut world = Self {
            calendar: Calendar::new(config.bucket_width()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            rx_radius: config.rx_radius(),
            config,
            species,
            reactions,
            geometry,
            partition,
            molecules: MoleculeStore::new(),
            releases: Vec::with_capacity(model.releases.len()),
            release_states: Vec::with_capacity(model.releases.len()),
            counters,
            stats: SimulationStats::default(),
            time: 0.0,
            iteration: 0,
            counts_volume_regions,
        };

        let mut programs = model.releases.clone();
        for site in world.geometry.release_sites() {
            let Some(p) = programs.get_mut(site.release.index()) else {
                return Err(ModelError::InvalidRelease {
                    release: site.path.clone(),
                    reason: format!("release site refers to missing program {}", site.release),
                });
            };
            *p = p.clone().transformed(&site.transform);
        }
        for (i, program) in programs.into_iter().enumerate() {
            let active = world.activate_release(program)?;
            let state = active.program.pattern.start();
            if !state.exhausted {
                world
                    .calendar
                    .schedule(EventKind::Release(ReleaseIndex(i as u32)), state.next_time)?;
            }
            world.releases.push(active);
            world.release_states.push(state);
        }
        if let Some(period) = world.config.output_period {
            world.calendar.schedule(EventKind::PeriodicOutput, period)?;
        }

        log::info!(
            "world built: {} species, {} reaction classes, {} walls, {} subvolumes, {} releases",
            world.species.len(),
            world.reactions.class_count(),
            world.geometry.walls().len(),
            world.partition.len(),
            world.releases.len()
        );
        Ok(world)
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Run configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Completed iterations.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Live molecules.
    pub fn molecules(&self) -> &MoleculeStore {
        &self.molecules
    }

    /// Current counters.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Geometry, including surface grids.
    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    /// Spatial partition.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Species table.
    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    /// Reaction table.
    pub fn reactions(&self) -> &ReactionTable {
        &self.reactions
    }

    /// Pending events.
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Progress of every release program.
    pub fn release_states(&self) -> &[ReleaseState] {
        &self.release_states
    }

    /// Interaction radius in internal units.
    pub fn rx_radius(&self) -> f64 {
        self.rx_radius
    }

    /// World position of a molecule.
    pub fn molecule_position(&self, id: mote_core::MoleculeId) -> Option<Vec3> {
        let m = self.molecules.get(id)?;
        Some(match m.placement {
            Placement::Volume { position, .. } => position,
            Placement::Surface { wall, uv, .. } => self.geometry.wall(wall).frame.uv_to_xyz(uv),
        })
    }

    /// Number of live molecules of a species.
    pub fn count(&self, species: SpeciesId) -> i64 {
        self.counters.species_count(species)
    }

    /// Number of molecules of a species in a counted region.
    pub fn region_count(&self, region: RegionIndex, species: SpeciesId) -> i64 {
        self.counters.region_count(region, species)
    }

    /// Read-only view for hooks and drivers.
    pub fn report(&self) -> IterationReport<'_> {
        IterationReport {
            iteration: self.iteration,
            time: self.time,
            molecules: &self.molecules,
            counters: &self.counters,
            stats: &self.stats,
        }
    }

    // ── Timing ──────────────────────────────────────────────────

    /// Start time of iteration `k`.
    pub(crate) fn step_time(&self, k: u64) -> f64 {
        k as f64 * self.config.time_step
    }

    /// The first iteration boundary at or after `t`.
    pub(crate) fn next_grid_time(&self, t: f64) -> f64 {
        let k = (t / self.config.time_step - 1e-9).ceil().max(0.0);
        self.step_time(k as u64)
    }

    // ── Run loop ────────────────────────────────────────────────

    /// Run `n` iterations, or fewer if the wall-clock budget runs out.
    pub fn run_iterations(
        &mut self,
        n: u64,
        hooks: &mut dyn OutputHooks,
    ) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        log::info!("running {n} iterations from t={}", self.time);
        for _ in 0..n {
            let end = self.step_time(self.iteration + 1);
            if let Err(e) = self.process_until(end, hooks) {
                return Err(self.fail(e, hooks));
            }
            self.finish_iteration(hooks);
            summary.iterations += 1;
            if let Some(budget) = self.config.wall_clock_budget {
                if started.elapsed() >= budget {
                    log::info!(
                        "wall-clock budget of {budget:?} reached at iteration {}",
                        self.iteration
                    );
                    summary.budget_exhausted = true;
                    break;
                }
            }
        }
        summary.time = self.time;
        log::info!(
            "run finished at iteration {} (t={}), {} molecules",
            self.iteration,
            self.time,
            self.molecules.len()
        );
        Ok(summary)
    }

    /// Run whole iterations until simulated time reaches `time`.
    pub fn run_until(&mut self, time: f64, hooks: &mut dyn OutputHooks) -> Result<RunSummary, RunError> {
        let remaining = (time - self.time) / self.config.time_step;
        let n = if remaining > 0.0 {
            (remaining - 1e-9).ceil() as u64
        } else {
            0
        };
        self.run_iterations(n, hooks)
    }

    /// Process the next pending event, finishing iterations up to it.
    ///
    /// Returns the processed event, or `None` when the calendar is empty.
    pub fn step_event(
        &mut self,
        hooks: &mut dyn OutputHooks,
    ) -> Result<Option<ScheduledEvent>, RunError> {
        let next = match self.calendar.peek_time() {
            Ok(t) => t,
            Err(e) => return Err(self.fail(e.into(), hooks)),
        };
        let Some(t) = next else {
            return Ok(None);
        };
        while t >= self.step_time(self.iteration + 1) {
            self.finish_iteration(hooks);
        }
        let event = match self.calendar.pop_next() {
            Ok(e) => e,
            Err(e) => return Err(self.fail(e.into(), hooks)),
        };
        if let Some(ev) = event {
            self.time = ev.time;
            if let Err(e) = self.dispatch(ev, hooks) {
                return Err(self.fail(e, hooks));
            }
        }
        Ok(event)
    }

    fn process_until(&mut self, end: f64, hooks: &mut dyn OutputHooks) -> Result<(), RunError> {
        while let Some(t) = self.calendar.peek_time()? {
            if t >= end {
                break;
            }
            let Some(ev) = self.calendar.pop_next()? else {
                break;
            };
            self.time = ev.time;
            self.dispatch(ev, hooks)?;
        }
        Ok(())
    }

    fn finish_iteration(&mut self, hooks: &mut dyn OutputHooks) {
        self.iteration += 1;
        self.time = self.step_time(self.iteration);
        self.stats.iterations += 1;
        hooks.on_iteration(&self.report());
        log::trace!(
            "iteration {} done: {} molecules, {} pending events",
            self.iteration,
            self.molecules.len(),
            self.calendar.len()
        );
        let period = self.config.defragmentation_period;
        if period > 0 && self.iteration % period == 0 {
            let freed = self.molecules.defragment();
            if freed > 0 {
                log::debug!("defragmented molecule store, {freed} slots reclaimed");
            }
        }
    }

    fn fail(&mut self, error: RunError, hooks: &mut dyn OutputHooks) -> RunError {
        if matches!(error, RunError::ResourceExhausted(_)) {
            log::error!("{error}; writing emergency checkpoint");
            hooks.emergency_checkpoint(&self.snapshot());
        }
        error
    }

    fn dispatch(&mut self, ev: ScheduledEvent, hooks: &mut dyn OutputHooks) -> Result<(), RunError> {
        self.stats.events_processed += 1;
        match ev.kind {
            EventKind::Diffuse(id) => self.step_molecule(id, ev.time, hooks),
            EventKind::Unimolecular(id) => self.fire_unimolecular(id, ev.time, hooks),
            EventKind::Release(r) => self.fire_release(r),
            EventKind::PeriodicOutput => {
                hooks.on_periodic_output(&self.report());
                if let Some(period) = self.config.output_period {
                    self.calendar.schedule(EventKind::PeriodicOutput, ev.time + period)?;
                }
                Ok(())
            }
        }
    }

    // ── Snapshot and restore ────────────────────────────────────

    /// Capture the full dynamic state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            iteration: self.iteration,
            molecules: self.molecules.iter_by_id().cloned().collect(),
            next_molecule_id: self.molecules.next_id(),
            events: self.calendar.events(),
            next_event_seq: self.calendar.next_seq(),
            releases: self.release_states.clone(),
            counters: self.counters.clone(),
            stats: self.stats.clone(),
            rng: self.rng.clone(),
            vertices: self.geometry.vertices().to_vec(),
        }
    }

    /// Hash of the dynamic state, equal for worlds that will evolve
    /// identically.
    pub fn state_hash(&self) -> u64 {
        self.snapshot().state_hash()
    }

    /// Replace the dynamic state with a snapshot taken from a world built
    /// from the same model and configuration.
    pub fn restore(&mut self, snap: &Snapshot) -> Result<(), RunError> {
        let mismatch = |reason: String| RunError::SnapshotMismatch { reason };
        if snap.releases.len() != self.release_states.len() {
            return Err(mismatch(format!(
                "{} release programs, world has {}",
                snap.releases.len(),
                self.release_states.len()
            )));
        }
        if snap.vertices.len() != self.geometry.vertices().len() {
            return Err(mismatch(format!(
                "{} vertices, world has {}",
                snap.vertices.len(),
                self.geometry.vertices().len()
            )));
        }
        if snap.counters.species_totals().len() != self.species.len()
            || snap.counters.reaction_totals().len() != self.reactions.pathway_count()
        {
            return Err(mismatch("counter layout differs".to_string()));
        }

        let moves: Vec<VertexMove> = snap
            .vertices
            .iter()
            .zip(self.geometry.vertices())
            .enumerate()
            .filter(|(_, (want, have))| want.to_bits() != have.to_bits())
            .map(|(i, (want, have))| VertexMove {
                vertex: VertexIndex(i as u32),
                displacement: *want - *have,
            })
            .collect();
        if !moves.is_empty() {
            self.geometry.move_vertices(&moves)?;
            self.partition.assign_walls(&self.geometry);
        }

        self.partition.clear_molecules();
        for w in 0..self.geometry.walls().len() {
            if let Some(grid) = self.geometry.wall_mut(WallIndex(w as u32)).grid.as_mut() {
                grid.clear_all();
            }
        }
        self.molecules.restore(&snap.molecules, snap.next_molecule_id)?;
        for m in &snap.molecules {
            match m.placement {
                Placement::Volume { subvolume, .. } => {
                    if subvolume.index() >= self.partition.len() {
                        return Err(mismatch(format!("molecule {} in unknown subvolume", m.id)));
                    }
                    self.partition.insert_molecule(subvolume, m.id);
                }
                Placement::Surface { wall, tile, .. } => {
                    if wall.index() >= self.geometry.walls().len() {
                        return Err(mismatch(format!("molecule {} on unknown wall", m.id)));
                    }
                    self.geometry
                        .ensure_grid(wall)?
                        .place(tile, m.id)
                        .map_err(|e| mismatch(format!("molecule {}: {e}", m.id)))?;
                }
            }
        }
        self.calendar.restore(&snap.events, snap.next_event_seq)?;
        self.release_states = snap.releases.clone();
        self.counters = snap.counters.clone();
        self.stats = snap.stats.clone();
        self.rng = snap.rng.clone();
        self.time = snap.time;
        self.iteration = snap.iteration;
        log::info!(
            "restored state at iteration {} with {} molecules",
            self.iteration,
            self.molecules.len()
        );
        Ok(())
    }

    // ── Dynamic geometry ────────────────────────────────────────

    /// Move geometry vertices between iterations.
    ///
    /// Surface molecules whose tiles vanish are moved to the vacant tile
    /// nearest their old position on the same wall, or destroyed if the
    /// wall is full. Remaining surface molecules on moved walls snap to
    /// their tile's position in the new frame.
    pub fn move_vertices(&mut self, moves: &[VertexMove]) -> Result<(), RunError> {
        let moved = self.geometry.move_vertices(moves)?;
        self.partition.assign_walls(&self.geometry);

        for (wall, id) in moved.displaced {
            let Some(m) = self.molecules.get(id) else { continue };
            let Placement::Surface { uv, orientation, .. } = m.placement else {
                continue;
            };
            let grid = self.geometry.ensure_grid(wall)?;
            let wanted = grid.uv_to_tile(uv);
            let tile = if grid.occupant(wanted).is_none() {
                Some(wanted)
            } else {
                grid.vacant_tiles().next()
            };
            match tile {
                Some(tile) => {
                    grid.place(tile, id)?;
                    let uv = grid.tile_center(tile);
                    if let Some(m) = self.molecules.get_mut(id) {
                        m.placement = Placement::Surface {
                            wall,
                            tile,
                            uv,
                            orientation,
                        };
                    }
                }
                None => {
                    log::warn!("no room left on wall {wall} for molecule {id}; removing it");
                    // The grid no longer holds it, so only the store and
                    // counters need updating.
                    if let Some(m) = self.molecules.remove(id) {
                        let regions = self.surface_regions(wall);
                        self.counters.destroyed(m.species, &regions);
                    }
                }
            }
        }

        for &w in &moved.walls {
            let occupants: Vec<_> = match self.geometry.wall(w).grid.as_ref() {
                Some(grid) => grid.occupants().map(|(t, id)| (t, id, grid.tile_center(t))).collect(),
                None => continue,
            };
            for (tile, id, uv) in occupants {
                if let Some(m) = self.molecules.get_mut(id) {
                    if let Placement::Surface { orientation, .. } = m.placement {
                        m.placement = Placement::Surface {
                            wall: w,
                            tile,
                            uv,
                            orientation,
                        };
                    }
                }
            }
        }
        log::debug!("moved {} vertices, {} walls changed", moves.len(), moved.walls.len());
        Ok(())
    }

    /// Pick a random facing.
    pub(crate) fn random_orientation(&mut self) -> Orientation {
        use rand::Rng;
        if self.rng.random::<bool>() {
            Orientation::Up
        } else {
            Orientation::Down
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("time", &self.time)
            .field("iteration", &self.iteration)
            .field("molecules", &self.molecules.len())
            .field("pending_events", &self.calendar.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NullHooks;
    use crate::release::{ReleasePattern, ReleaseProgram};
    use crate::species::SpeciesDef;
    use mote_core::{Aabb, MoleculeId};
    use mote_geom::{BoxSpec, ObjectNode};

    fn open_config() -> SimConfig {
        SimConfig {
            partition_bounds: Some(Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))),
            partition: SubvolumeLayout::PerAxis([2, 2, 2]),
            ..SimConfig::default()
        }
    }

    fn one_species() -> Model {
        let mut m = Model::new();
        m.add_species(SpeciesDef::volume("A", 1.0));
        m
    }

    #[test]
    fn empty_geometry_without_bounds_fails() {
        let err = World::new(&one_species(), SimConfig::default()).unwrap_err();
        assert_eq!(err, ModelError::Partition(PartitionError::EmptyBounds));
    }

    #[test]
    fn bounds_come_from_geometry_plus_margin() {
        let mut m = one_species();
        m.add_object(ObjectNode::cuboid(
            "box",
            BoxSpec::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)),
        ));
        let w = World::new(&m, SimConfig::default()).unwrap();
        let b = w.partition().bounds();
        assert_eq!(b.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(b.max, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn grid_times_are_iteration_multiples() {
        let w = World::new(&one_species(), open_config()).unwrap();
        let dt = w.config().time_step;
        assert_eq!(w.next_grid_time(0.0), 0.0);
        assert_eq!(w.next_grid_time(3.0 * dt), w.step_time(3));
        assert_eq!(w.next_grid_time(3.5 * dt), w.step_time(4));
    }

    #[test]
    fn release_fires_and_is_counted() {
        let mut m = one_species();
        m.add_release(ReleaseProgram::point("r", SpeciesId(0), Vec3::ZERO, 5));
        let mut w = World::new(&m, open_config()).unwrap();
        w.run_iterations(1, &mut NullHooks).unwrap();
        assert_eq!(w.count(SpeciesId(0)), 5);
        assert_eq!(w.molecules().len(), 5);
        assert_eq!(w.stats().molecules_released, 5);
        assert!(w.release_states()[0].exhausted);
    }

    #[test]
    fn release_outside_domain_is_rejected() {
        let mut m = one_species();
        m.add_release(ReleaseProgram::point("r", SpeciesId(0), Vec3::new(5.0, 0.0, 0.0), 1));
        let err = World::new(&m, open_config()).unwrap_err();
        assert!(matches!(err, ModelError::ReleaseOutsideDomain { .. }));
    }

    #[test]
    fn run_until_rounds_up_to_whole_iterations() {
        let mut w = World::new(&one_species(), open_config()).unwrap();
        let dt = w.config().time_step;
        let s = w.run_until(2.5 * dt, &mut NullHooks).unwrap();
        assert_eq!(s.iterations, 3);
        assert_eq!(w.iteration(), 3);
    }

    #[test]
    fn step_event_walks_the_calendar() {
        let mut m = one_species();
        let pattern = ReleasePattern {
            delay: 2.5e-6,
            ..ReleasePattern::default()
        };
        m.add_release(ReleaseProgram::point("r", SpeciesId(0), Vec3::ZERO, 1).with_pattern(pattern));
        let mut w = World::new(&m, open_config()).unwrap();
        let ev = w.step_event(&mut NullHooks).unwrap().unwrap();
        assert_eq!(ev.kind, EventKind::Release(ReleaseIndex(0)));
        assert_eq!(w.iteration(), 2);
        assert_eq!(w.time(), 2.5e-6);
        assert_eq!(w.molecules().len(), 1);
    }

    #[test]
    fn removed_molecule_leaves_a_stale_event() {
        let mut w = World::new(&one_species(), open_config()).unwrap();
        let id = w.add_volume_molecule(SpeciesId(0), Vec3::ZERO).unwrap();
        assert_eq!(id, MoleculeId(0));
        assert!(w.remove_molecule(id));
        w.run_iterations(1, &mut NullHooks).unwrap();
        assert_eq!(w.stats().stale_events, 1);
        assert_eq!(w.count(SpeciesId(0)), 0);
    }

    #[test]
    fn restore_rejects_foreign_snapshot() {
        let mut a = one_species();
        a.add_release(ReleaseProgram::point("r", SpeciesId(0), Vec3::ZERO, 1));
        let wa = World::new(&a, open_config()).unwrap();
        let mut wb = World::new(&one_species(), open_config()).unwrap();
        assert!(matches!(
            wb.restore(&wa.snapshot()),
            Err(RunError::SnapshotMismatch { .. })
        ));
    }
}
