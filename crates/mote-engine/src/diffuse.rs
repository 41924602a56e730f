//! Volume diffusion: tracing one displacement through the partition.
//!
//! A step is traced segment by segment. Each segment runs until the
//! nearest wall, the domain boundary or the end of the displacement,
//! walking subvolumes with
//! [`Partition::exit_face`](mote_space::Partition::exit_face). Before the segment is
//! committed, molecules within the interaction radius of its path are
//! tested in order of approach. A wall hit is offered to the reaction
//! engine first, then resolved by the permeability of its surface class.

use mote_core::{MoleculeId, Orientation, SpeciesId, SubvolumeIndex, Vec3, WallIndex};
use mote_geom::SegmentHit;
use smallvec::SmallVec;

use crate::collide::encounter;
use crate::error::RunError;
use crate::hooks::{OutputHooks, WallHit};
use crate::molecule::Placement;
use crate::outcome::ReactionSite;
use crate::reaction::{Candidate, ReactionKind};
use crate::sampling::gaussian_step;
use crate::species::Permeability;
use crate::world::{StepOutcome, World};

/// What ends a segment before its full length.
#[derive(Clone, Copy, Debug)]
enum Obstacle {
    Wall(WallIndex, SegmentHit),
    Boundary { axis: usize, t: f64 },
}

impl Obstacle {
    fn t(&self) -> f64 {
        match self {
            Self::Wall(_, hit) => hit.t,
            Self::Boundary { t, .. } => *t,
        }
    }
}

/// The molecule being traced.
#[derive(Clone, Copy, Debug)]
struct Mover {
    id: MoleculeId,
    species: SpeciesId,
}

impl World {
    /// Draw a displacement for a volume molecule and trace it.
    pub(crate) fn diffuse_volume(
        &mut self,
        id: MoleculeId,
        hooks: &mut dyn OutputHooks,
    ) -> Result<StepOutcome, RunError> {
        let species = self
            .molecules
            .get(id)
            .map(|m| m.species)
            .ok_or(RunError::NoSuchMolecule {
                molecule: id,
                expected: "volume",
            })?;
        let sigma = self.species.get(species).map_or(0.0, |s| s.step_sigma);
        if sigma <= 0.0 {
            return Ok(StepOutcome::Moved);
        }
        let disp = gaussian_step(&mut self.rng, sigma);
        self.stats.diffusion_steps += 1;
        self.trace_volume(id, disp, hooks)
    }

    /// Move a volume molecule by an explicit displacement, with the same
    /// wall, boundary and reaction handling as a diffusion step.
    pub fn move_volume_molecule(
        &mut self,
        id: MoleculeId,
        displacement: Vec3,
        hooks: &mut dyn OutputHooks,
    ) -> Result<StepOutcome, RunError> {
        self.trace_volume(id, displacement, hooks)
    }

    pub(crate) fn trace_volume(
        &mut self,
        id: MoleculeId,
        disp: Vec3,
        hooks: &mut dyn OutputHooks,
    ) -> Result<StepOutcome, RunError> {
        let not_volume = || RunError::NoSuchMolecule {
            molecule: id,
            expected: "volume",
        };
        let m = self.molecules.get(id).ok_or_else(not_volume)?;
        let Placement::Volume {
            position,
            subvolume: home,
        } = m.placement
        else {
            return Err(not_volume());
        };
        let mover = Mover {
            id,
            species: m.species,
        };
        let partners: SmallVec<[SpeciesId; 4]> =
            self.reactions.volume_partners(mover.species).into();
        let dt = self.config.time_step;
        let start_time = self.time;
        let total = disp.length().max(f64::MIN_POSITIVE);

        let mut pos = position;
        let mut sv = home;
        let mut remaining = disp;
        let mut travelled = 0.0;
        let mut last_wall: Option<WallIndex> = None;
        let mut bounces = 0u32;

        loop {
            let obstacle = self.first_obstacle(pos, remaining, sv, last_wall);
            let limit = obstacle.as_ref().map_or(1.0, Obstacle::t);
            let seg_len = remaining.length();

            if !partners.is_empty() {
                let when = |t: f64| start_time + dt * (travelled + t * seg_len) / total;
                if let Some(outcome) =
                    self.test_encounters(mover, pos, remaining, limit, &partners, when, hooks)?
                {
                    return Ok(outcome);
                }
            }

            let Some(obstacle) = obstacle else {
                pos = pos + remaining;
                break;
            };
            travelled += obstacle.t() * seg_len;
            let hit_time = start_time + dt * travelled / total;
            let rest = remaining * (1.0 - obstacle.t());

            match obstacle {
                Obstacle::Boundary { axis, t } => {
                    pos = pos + remaining * t;
                    remaining = reflect_axis(rest, axis);
                    last_wall = None;
                }
                Obstacle::Wall(w, hit) => {
                    self.stats.ray_polygon_colls += 1;
                    pos = hit.point;
                    if let Some(outcome) = self.hit_wall(mover, w, &hit, hit_time, hooks)? {
                        return Ok(outcome);
                    }
                    let perm = match self.geometry.wall(w).surface_class {
                        Some(class) => self
                            .species
                            .get(class)
                            .map_or(Permeability::Reflective, |c| c.permeability(mover.species)),
                        None => Permeability::Reflective,
                    };
                    match perm {
                        Permeability::Reflective => {
                            let n = self.geometry.wall(w).frame.normal;
                            remaining = rest - n * (2.0 * rest.dot(n));
                        }
                        Permeability::Transparent => {
                            remaining = rest;
                            self.count_crossing(mover.species, w, hit.from_front);
                        }
                        Permeability::Absorptive => {
                            self.destroy(id);
                            return Ok(StepOutcome::Absorbed);
                        }
                    }
                    last_wall = Some(w);
                }
            }
            // Boundary and wall hit points may overshoot the domain by an ulp.
            pos = self.partition.bounds().clamp(pos);
            sv = self.partition.locate(pos, Some(sv))?;
            bounces += 1;
            if bounces >= self.config.max_reflections {
                self.stats.reflection_limit_hits += 1;
                log::debug!(
                    "molecule {id} stopped after {bounces} reflections in one step"
                );
                break;
            }
        }

        pos = self.partition.bounds().clamp(pos);
        let target = self.partition.locate(pos, Some(sv))?;
        if let Some(m) = self.molecules.get_mut(id) {
            m.placement = Placement::Volume {
                position: pos,
                subvolume: target,
            };
        }
        if target != home {
            self.partition.transfer(id, home, target);
        }
        Ok(StepOutcome::Moved)
    }

    /// The nearest wall or boundary along `disp` from `pos`.
    ///
    /// Walls are tested subvolume by subvolume; the walk stops as soon as
    /// the best hit lies before the current subvolume's exit. Equal hit
    /// fractions go to the lower wall index.
    fn first_obstacle(
        &mut self,
        pos: Vec3,
        disp: Vec3,
        start: SubvolumeIndex,
        exclude: Option<WallIndex>,
    ) -> Option<Obstacle> {
        let mut sv = start;
        let mut best: Option<(WallIndex, SegmentHit)> = None;
        loop {
            self.stats.ray_voxel_tests += 1;
            for &w in self.partition.subvolume(sv).walls() {
                if Some(w) == exclude {
                    continue;
                }
                self.stats.ray_polygon_tests += 1;
                let Some(hit) = self.geometry.wall(w).frame.intersect_segment(pos, disp) else {
                    continue;
                };
                let better = best.is_none_or(|(bw, bh)| hit.t < bh.t || (hit.t == bh.t && w < bw));
                if better {
                    best = Some((w, hit));
                }
            }
            let Some((dir, t_exit)) = self.partition.exit_face(sv, pos, disp) else {
                break;
            };
            if best.is_some_and(|(_, h)| h.t <= t_exit) {
                break;
            }
            match self.partition.traverse(sv, dir) {
                Some(next) => sv = next,
                None => {
                    return Some(Obstacle::Boundary {
                        axis: dir.axis(),
                        t: t_exit,
                    })
                }
            }
        }
        best.map(|(w, hit)| Obstacle::Wall(w, hit))
    }

    /// Test molecules near the segment `pos + t * disp`, `t <= limit`, in
    /// order of approach, and fire the first reaction drawn.
    #[allow(clippy::too_many_arguments)]
    fn test_encounters(
        &mut self,
        mover: Mover,
        pos: Vec3,
        disp: Vec3,
        limit: f64,
        partners: &[SpeciesId],
        when: impl Fn(f64) -> f64,
        hooks: &mut dyn OutputHooks,
    ) -> Result<Option<StepOutcome>, RunError> {
        let r = self.rx_radius;
        let mut swept = mote_core::Aabb::new(pos, pos + disp * limit);
        swept = swept.expanded(r);

        let mut hits: SmallVec<[(f64, MoleculeId, SpeciesId); 8]> = SmallVec::new();
        for s in self.partition.overlapping(&swept) {
            for &other in self.partition.subvolume(s).molecules() {
                if other == mover.id {
                    continue;
                }
                let Some(m) = self.molecules.get(other) else {
                    continue;
                };
                if !partners.contains(&m.species) {
                    continue;
                }
                let Placement::Volume { position, .. } = m.placement else {
                    continue;
                };
                if let Some(t) = encounter(pos, disp, position, r) {
                    if t <= limit {
                        hits.push((t, other, m.species));
                    }
                }
            }
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (t, other, other_species) in hits {
            if !self.molecules.contains(other) {
                continue;
            }
            self.stats.mol_collision_tests += 1;
            let point = pos + disp * t;
            let mut candidates: SmallVec<[Candidate; 2]> = SmallVec::new();
            let mut thirds: SmallVec<[Option<MoleculeId>; 2]> = SmallVec::new();
            if let Some(class) = self.reactions.find(&[mover.species, other_species]) {
                if self.reactions.class(class).kind == ReactionKind::VolumeVolume {
                    candidates.push(Candidate {
                        class,
                        scaling: 1.0,
                        participants: SmallVec::from_slice(&[
                            (mover.species, Orientation::None),
                            (other_species, Orientation::None),
                        ]),
                    });
                    thirds.push(None);
                }
            }
            if let Some((third, third_species, class)) =
                self.find_third(mover, other, other_species, point)
            {
                candidates.push(Candidate {
                    class,
                    scaling: 1.0,
                    participants: SmallVec::from_slice(&[
                        (mover.species, Orientation::None),
                        (other_species, Orientation::None),
                        (third_species, Orientation::None),
                    ]),
                });
                thirds.push(Some(third));
            }
            if candidates.is_empty() {
                continue;
            }
            let Some((ci, pi)) = self.select_reaction(&candidates)? else {
                continue;
            };
            let mut reactants: SmallVec<[MoleculeId; 3]> = SmallVec::from_slice(&[mover.id, other]);
            if let Some(third) = thirds[ci] {
                reactants.push(third);
            }
            let site = ReactionSite {
                point,
                wall: None,
                time: when(t),
            };
            if self.apply_pathway(candidates[ci].class, pi, &reactants, site, hooks)? {
                return Ok(Some(StepOutcome::Reacted));
            }
        }
        Ok(None)
    }

    /// The lowest-id molecule within the interaction radius of `point`
    /// that completes a trimolecular class with the mover and `other`.
    fn find_third(
        &self,
        mover: Mover,
        other: MoleculeId,
        other_species: SpeciesId,
        point: Vec3,
    ) -> Option<(MoleculeId, SpeciesId, usize)> {
        let r = self.rx_radius;
        let around = mote_core::Aabb::new(point, point).expanded(r);
        let mut best: Option<(MoleculeId, SpeciesId, usize)> = None;
        for s in self.partition.overlapping(&around) {
            for &third in self.partition.subvolume(s).molecules() {
                if third == mover.id || third == other {
                    continue;
                }
                if best.is_some_and(|(b, _, _)| b < third) {
                    continue;
                }
                let Some(m) = self.molecules.get(third) else {
                    continue;
                };
                let Placement::Volume { position, .. } = m.placement else {
                    continue;
                };
                if (position - point).length_squared() > r * r {
                    continue;
                }
                let Some(class) = self.reactions.find(&[mover.species, other_species, m.species])
                else {
                    continue;
                };
                if self.reactions.class(class).kind == ReactionKind::Trimolecular {
                    best = Some((third, m.species, class));
                }
            }
        }
        best
    }

    /// Report a wall hit and test reactions with the wall's surface class
    /// and the molecule on the tile that was hit.
    fn hit_wall(
        &mut self,
        mover: Mover,
        w: WallIndex,
        hit: &SegmentHit,
        time: f64,
        hooks: &mut dyn OutputHooks,
    ) -> Result<Option<StepOutcome>, RunError> {
        let wall = self.geometry.wall(w);
        if wall.report_hits {
            hooks.on_wall_hit(&WallHit {
                position: hit.point,
                molecule: mover.id,
                object: wall.object,
                wall: w,
                time,
            });
        }

        let side = if hit.from_front {
            Orientation::Up
        } else {
            Orientation::Down
        };
        let mut candidates: SmallVec<[Candidate; 2]> = SmallVec::new();
        let mut partner: SmallVec<[Option<MoleculeId>; 2]> = SmallVec::new();
        if let Some(class_species) = wall.surface_class {
            if let Some(class) = self.reactions.find(&[mover.species, class_species]) {
                candidates.push(Candidate {
                    class,
                    scaling: 1.0,
                    participants: SmallVec::from_slice(&[
                        (mover.species, side),
                        (class_species, Orientation::Up),
                    ]),
                });
                partner.push(None);
            }
        }
        if let Some(grid) = wall.grid.as_ref() {
            let tile = grid.xyz_to_tile(&wall.frame, hit.point);
            if let Some(occupant) = grid.occupant(tile) {
                if let Some(m) = self.molecules.get(occupant) {
                    if let Placement::Surface { orientation, .. } = m.placement {
                        if let Some(class) = self.reactions.find(&[mover.species, m.species]) {
                            if self.reactions.class(class).kind == ReactionKind::VolumeSurface {
                                candidates.push(Candidate {
                                    class,
                                    scaling: grid.tile_area(),
                                    participants: SmallVec::from_slice(&[
                                        (mover.species, side),
                                        (m.species, orientation),
                                    ]),
                                });
                                partner.push(Some(occupant));
                            }
                        }
                    }
                }
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let Some((ci, pi)) = self.select_reaction(&candidates)? else {
            return Ok(None);
        };
        let mut reactants: SmallVec<[MoleculeId; 3]> = SmallVec::from_slice(&[mover.id]);
        if let Some(p) = partner[ci] {
            reactants.push(p);
        }
        let site = ReactionSite {
            point: hit.point,
            wall: Some((w, side)),
            time,
        };
        if self.apply_pathway(candidates[ci].class, pi, &reactants, site, hooks)? {
            return Ok(Some(StepOutcome::Reacted));
        }
        Ok(None)
    }

    /// Update region counts for a molecule passing through a transparent
    /// wall. Crossing from the front of a closed region's wall enters it.
    fn count_crossing(&mut self, species: SpeciesId, w: WallIndex, from_front: bool) {
        let wall = self.geometry.wall(w);
        for &r in &wall.regions {
            let region = self.geometry.region(r);
            if region.counted && region.closed {
                self.counters.crossed(species, r, from_front);
            }
        }
    }
}

fn reflect_axis(v: Vec3, axis: usize) -> Vec3 {
    match axis {
        0 => Vec3::new(-v.x, v.y, v.z),
        1 => Vec3::new(v.x, -v.y, v.z),
        _ => Vec3::new(v.x, v.y, -v.z),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_reflection_flips_one_component() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(reflect_axis(v, 0), Vec3::new(-1.0, 2.0, 3.0));
        assert_eq!(reflect_axis(v, 1), Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(reflect_axis(v, 2), Vec3::new(1.0, 2.0, -3.0));
    }
}
