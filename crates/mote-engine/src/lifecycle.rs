//! Molecule creation, destruction and scheduling.

use mote_core::{MoleculeId, Orientation, RegionIndex, SpeciesId, SubvolumeIndex, TileIndex, Vec3, WallIndex};
use mote_geom::GeometryError;
use smallvec::SmallVec;

use crate::calendar::EventKind;
use crate::error::RunError;
use crate::molecule::{Molecule, MoleculeFlags, Placement};
use crate::sampling::unit_open;
use crate::world::World;

impl World {
    // ── Public API ──────────────────────────────────────────────

    /// Add a volume molecule at `position`. It takes its first step at
    /// the next iteration boundary.
    pub fn add_volume_molecule(&mut self, species: SpeciesId, position: Vec3) -> Result<MoleculeId, RunError> {
        let s = self
            .species
            .get(species)
            .ok_or(RunError::UnknownSpecies { species })?;
        if !s.is_volume() {
            return Err(RunError::WrongSpeciesKind {
                species,
                reason: "expected a volume species",
            });
        }
        let first = self.next_grid_time(self.time);
        self.spawn_volume(species, position, None, first)
    }

    /// Add a surface molecule on a specific tile.
    pub fn add_surface_molecule(
        &mut self,
        species: SpeciesId,
        wall: WallIndex,
        tile: TileIndex,
        orientation: Orientation,
    ) -> Result<MoleculeId, RunError> {
        let s = self
            .species
            .get(species)
            .ok_or(RunError::UnknownSpecies { species })?;
        if !s.is_surface() {
            return Err(RunError::WrongSpeciesKind {
                species,
                reason: "expected a surface species",
            });
        }
        if wall.index() >= self.geometry.walls().len() {
            return Err(GeometryError::UnknownWall { wall }.into());
        }
        let first = self.next_grid_time(self.time);
        self.spawn_surface(species, wall, tile, orientation, first)
    }

    /// Remove a molecule. Its pending events are discarded when they come
    /// due. Returns `false` if it did not exist.
    pub fn remove_molecule(&mut self, id: MoleculeId) -> bool {
        self.destroy(id).is_some()
    }

    // ── Creation ────────────────────────────────────────────────

    pub(crate) fn spawn_volume(
        &mut self,
        species: SpeciesId,
        position: Vec3,
        hint: Option<SubvolumeIndex>,
        first_step: f64,
    ) -> Result<MoleculeId, RunError> {
        let subvolume = self.partition.locate(position, hint)?;
        let id = self.molecules.insert(
            species,
            Placement::Volume {
                position,
                subvolume,
            },
            self.time,
        )?;
        self.partition.insert_molecule(subvolume, id);
        let regions = self.volume_regions(position);
        self.counters.created(species, &regions);
        self.schedule_new(id, first_step)?;
        Ok(id)
    }

    pub(crate) fn spawn_surface(
        &mut self,
        species: SpeciesId,
        wall: WallIndex,
        tile: TileIndex,
        orientation: Orientation,
        first_step: f64,
    ) -> Result<MoleculeId, RunError> {
        let randomize = self.config.randomize_surface_positions;
        let grid = self.geometry.ensure_grid(wall)?;
        if tile.0 >= grid.tile_count() || grid.occupant(tile).is_some() {
            return Err(RunError::TileUnavailable {
                wall: wall.0,
                tile: tile.0,
            });
        }
        let uv = grid.tile_to_position(tile, randomize.then_some(&mut self.rng));
        let id = self.molecules.insert(
            species,
            Placement::Surface {
                wall,
                tile,
                uv,
                orientation,
            },
            self.time,
        )?;
        self.geometry.ensure_grid(wall)?.place(tile, id)?;
        let regions = self.surface_regions(wall);
        self.counters.created(species, &regions);
        self.schedule_new(id, first_step)?;
        Ok(id)
    }

    // ── Destruction ─────────────────────────────────────────────

    /// Remove a molecule from the store, its container and the counters.
    pub(crate) fn destroy(&mut self, id: MoleculeId) -> Option<Molecule> {
        let m = self.molecules.remove(id)?;
        match m.placement {
            Placement::Volume {
                position,
                subvolume,
            } => {
                let removed = self.partition.remove_molecule(subvolume, id);
                debug_assert!(removed, "molecule {id} missing from subvolume {subvolume}");
                let regions = self.volume_regions(position);
                self.counters.destroyed(m.species, &regions);
            }
            Placement::Surface { wall, tile, .. } => {
                if let Some(grid) = self.geometry.wall_mut(wall).grid.as_mut() {
                    let cleared = grid.clear(tile);
                    debug_assert_eq!(cleared, Some(id));
                }
                let regions = self.surface_regions(wall);
                self.counters.destroyed(m.species, &regions);
            }
        }
        Some(m)
    }

    // ── Regions ─────────────────────────────────────────────────

    /// Counted closed regions containing a volume position.
    pub(crate) fn volume_regions(&self, p: Vec3) -> SmallVec<[RegionIndex; 4]> {
        if !self.counts_volume_regions {
            return SmallVec::new();
        }
        self.geometry.regions_enclosing(p)
    }

    /// Counted regions a wall belongs to.
    pub(crate) fn surface_regions(&self, wall: WallIndex) -> SmallVec<[RegionIndex; 4]> {
        self.geometry
            .wall(wall)
            .regions
            .iter()
            .copied()
            .filter(|&r| self.geometry.region(r).counted)
            .collect()
    }

    // ── Scheduling ──────────────────────────────────────────────

    /// Whether molecules of `species` need diffusion events at all.
    pub(crate) fn needs_steps(&self, species: SpeciesId) -> bool {
        let Some(s) = self.species.get(species) else {
            return false;
        };
        s.diffuses() || (s.is_surface() && !self.reactions.surface_partners(species).is_empty())
    }

    fn schedule_new(&mut self, id: MoleculeId, first_step: f64) -> Result<(), RunError> {
        self.schedule_step(id, first_step)?;
        self.schedule_unimolecular(id)
    }

    /// Enqueue the next diffusion event of a molecule.
    pub(crate) fn schedule_step(&mut self, id: MoleculeId, at: f64) -> Result<(), RunError> {
        let Some(species) = self.molecules.get(id).map(|m| m.species) else {
            return Ok(());
        };
        if !self.needs_steps(species) {
            return Ok(());
        }
        self.calendar.schedule(EventKind::Diffuse(id), at)?;
        if let Some(m) = self.molecules.get_mut(id) {
            m.flags.insert(MoleculeFlags::SCHEDULED);
            m.next_time = at;
        }
        Ok(())
    }

    /// Draw and enqueue the unimolecular firing time of a molecule.
    pub(crate) fn schedule_unimolecular(&mut self, id: MoleculeId) -> Result<(), RunError> {
        let Some(species) = self.molecules.get(id).map(|m| m.species) else {
            return Ok(());
        };
        let Some(class) = self.reactions.unimolecular(species) else {
            return Ok(());
        };
        let delay = self.reactions.class(class).firing_delay(unit_open(&mut self.rng));
        if !delay.is_finite() {
            return Ok(());
        }
        let at = self.time + delay;
        self.calendar.schedule(EventKind::Unimolecular(id), at)?;
        if let Some(m) = self.molecules.get_mut(id) {
            m.unimol_time = Some(at);
        }
        Ok(())
    }

    /// Handle a diffusion event.
    pub(crate) fn step_molecule(
        &mut self,
        id: MoleculeId,
        at: f64,
        hooks: &mut dyn crate::hooks::OutputHooks,
    ) -> Result<(), RunError> {
        let current = self.molecules.get_mut(id).filter(|m| {
            m.flags.contains(MoleculeFlags::SCHEDULED) && m.next_time.to_bits() == at.to_bits()
        });
        let Some(m) = current else {
            self.stats.stale_events += 1;
            return Ok(());
        };
        m.flags.remove(MoleculeFlags::SCHEDULED);
        m.flags.remove(MoleculeFlags::NEWLY_CREATED);
        let volume = m.placement.is_volume();

        if volume {
            self.diffuse_volume(id, hooks)?;
        } else {
            self.diffuse_surface(id, hooks)?;
        }

        let rescheduled = self
            .molecules
            .get(id)
            .is_some_and(|m| m.flags.contains(MoleculeFlags::SCHEDULED));
        if self.molecules.contains(id) && !rescheduled {
            let k = (at / self.config.time_step).round() as u64;
            let next = self.step_time(k + 1);
            self.schedule_step(id, next)?;
        }
        Ok(())
    }
}
