//! Carrying out a selected reaction pathway.
//!
//! Reactants whose species reappear among the products are kept (first
//! unused match, in product order); the rest are destroyed. New surface
//! products need vacant tiles near the reaction: tiles freed by consumed
//! surface reactants first, then the tile that was hit, then tiles within
//! the configured neighbor radius. If there is not enough room the
//! reaction does not happen and nothing is changed.
//!
//! Product orientations are relative to a reference reactant: the surface
//! class of the wall, else the first oriented surface reactant, else the
//! side a volume reactant approached the wall from.

use std::collections::VecDeque;

use mote_core::{
    MoleculeId, NotifyLevel, Orientation, SpeciesId, TileIndex, Vec3, WallIndex, SQRT_EPS,
};
use rand::Rng;
use smallvec::SmallVec;

use crate::error::RunError;
use crate::hooks::{OutputHooks, ReactionReport};
use crate::molecule::Placement;
use crate::reaction::{Candidate, Pathway};
use crate::world::World;

/// Where and when a reaction happens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ReactionSite {
    /// Position of the encounter.
    pub(crate) point: Vec3,
    /// The wall involved and the side (relative to its normal) the
    /// volume reactant is on.
    pub(crate) wall: Option<(WallIndex, Orientation)>,
    /// Simulated time.
    pub(crate) time: f64,
}

/// A reactant as it was just before the reaction.
#[derive(Clone, Copy, Debug)]
struct Reactant {
    id: MoleculeId,
    species: SpeciesId,
    placement: Placement,
}

impl World {
    /// Draw one `(candidate, pathway)` among the classes viable at a
    /// collision, or `None` when no reaction happens.
    ///
    /// A class can pass probability one only here, once divided by a tile
    /// area or neighbor count, so the overflow policy is applied again:
    /// `Error` stops the run, `Warn` logs the first occurrence, and the
    /// draw is normalized otherwise.
    pub(crate) fn select_reaction(
        &mut self,
        candidates: &[Candidate],
    ) -> Result<Option<(usize, usize)>, RunError> {
        if let Some((ci, total)) = self.reactions.overflowing(candidates) {
            self.stats.probability_overflows += 1;
            let policy = self.reactions.overflow_policy();
            let first = self.stats.probability_overflows == 1;
            if policy == NotifyLevel::Error || (policy == NotifyLevel::Warn && first) {
                let reactants = self
                    .reactions
                    .class(candidates[ci].class)
                    .reactants
                    .iter()
                    .map(|&s| self.species.name(s))
                    .collect::<Vec<_>>()
                    .join("+");
                if policy == NotifyLevel::Error {
                    return Err(RunError::ProbabilityOverflow { reactants, total });
                }
                log::warn!(
                    "reaction probability {total:.4} for {reactants} exceeds 1 at a collision; normalizing"
                );
            }
        }
        let draw = self.rng.random::<f64>();
        Ok(self.reactions.select_among(candidates, draw))
    }

    /// Fire pathway `pathway` of class `class` on `reactants`.
    ///
    /// Returns `false`, with no state changed, when surface products do
    /// not fit.
    pub(crate) fn apply_pathway(
        &mut self,
        class: usize,
        pathway: usize,
        reactants: &[MoleculeId],
        site: ReactionSite,
        hooks: &mut dyn OutputHooks,
    ) -> Result<bool, RunError> {
        let p: Pathway = self.reactions.class(class).pathways[pathway].clone();
        let found: SmallVec<[Reactant; 3]> = reactants
            .iter()
            .filter_map(|&id| {
                self.molecules.get(id).map(|m| Reactant {
                    id,
                    species: m.species,
                    placement: m.placement,
                })
            })
            .collect();
        if found.len() != reactants.len() {
            return Ok(false);
        }

        // Products keep reactants of the same species, first match wins.
        let mut kept = [false; 3];
        let mut reuse: SmallVec<[Option<usize>; 4]> = SmallVec::new();
        for product in &p.products {
            let slot = found
                .iter()
                .enumerate()
                .position(|(i, r)| !kept[i] && r.species == product.species);
            if let Some(i) = slot {
                kept[i] = true;
            }
            reuse.push(slot);
        }

        let reference = self.reference_orientation(&p, &found, site);
        let anchor = found.iter().find_map(|r| match r.placement {
            Placement::Surface { wall, tile, .. } => Some((wall, Some(tile))),
            Placement::Volume { .. } => None,
        });
        let anchor = anchor.or(site.wall.map(|(w, _)| (w, None)));

        // Reserve tiles before anything is destroyed.
        let new_surface = p
            .products
            .iter()
            .zip(&reuse)
            .filter(|(prod, slot)| {
                slot.is_none() && self.species.get(prod.species).is_some_and(|s| s.is_surface())
            })
            .count();
        let mut tiles: VecDeque<TileIndex> = VecDeque::new();
        let mut surface_wall = None;
        if new_surface > 0 {
            let Some((wall, anchor_tile)) = anchor else {
                return Ok(false);
            };
            let freed: SmallVec<[TileIndex; 3]> = found
                .iter()
                .enumerate()
                .filter(|(i, _)| !kept[*i])
                .filter_map(|(_, r)| match r.placement {
                    Placement::Surface { wall: w, tile, .. } if w == wall => Some(tile),
                    _ => None,
                })
                .collect();
            let hit_tile = match (site.wall, anchor) {
                (Some((w, _)), Some((aw, None))) if w == aw => {
                    let frame = self.geometry.wall(w).frame;
                    Some(self.geometry.ensure_grid(w)?.xyz_to_tile(&frame, site.point))
                }
                _ => None,
            };
            let radius = self.config.vacancy_search_radius;
            let grid = self.geometry.ensure_grid(wall)?;
            tiles.extend(freed.iter().copied());
            let mut frontier: Vec<TileIndex> = freed.to_vec();
            if let Some(t) = hit_tile {
                if grid.occupant(t).is_none() && !tiles.contains(&t) {
                    tiles.push_back(t);
                }
                frontier.push(t);
            }
            if let Some(t) = anchor_tile.filter(|t| !frontier.contains(t)) {
                frontier.push(t);
            }
            let mut seen: Vec<TileIndex> = frontier.clone();
            for _ in 0..radius {
                if tiles.len() >= new_surface {
                    break;
                }
                let mut ring: Vec<TileIndex> = frontier
                    .iter()
                    .flat_map(|&t| grid.neighbor_tiles(t))
                    .filter(|t| !seen.contains(t))
                    .collect();
                ring.sort_unstable();
                ring.dedup();
                for &t in &ring {
                    seen.push(t);
                    if grid.occupant(t).is_none() {
                        tiles.push_back(t);
                    }
                }
                frontier = ring;
            }
            if tiles.len() < new_surface {
                log::trace!("pathway '{}' blocked: no room for surface products", p.name);
                return Ok(false);
            }
            surface_wall = Some(wall);
        }

        // Commit.
        for (i, r) in found.iter().enumerate() {
            if !kept[i] {
                self.destroy(r.id);
            }
        }
        let first_step = self.step_time(self.iteration + 1);
        let mut products: SmallVec<[MoleculeId; 4]> = SmallVec::new();
        for (product, slot) in p.products.iter().zip(&reuse) {
            let facing = match reference {
                Some((spec, actual)) if product.orientation != Orientation::None => {
                    product.orientation.compose(spec).compose(actual)
                }
                _ => Orientation::None,
            };
            if let Some(i) = *slot {
                let id = found[i].id;
                if facing != Orientation::None {
                    if let Some(m) = self.molecules.get_mut(id) {
                        if let Placement::Surface { orientation, .. } = &mut m.placement {
                            *orientation = facing;
                        }
                    }
                }
                products.push(id);
                continue;
            }
            let is_surface = self.species.get(product.species).is_some_and(|s| s.is_surface());
            let id = if is_surface {
                let (Some(wall), Some(tile)) = (surface_wall, tiles.pop_front()) else {
                    continue;
                };
                let facing = if facing == Orientation::None {
                    self.random_orientation()
                } else {
                    facing
                };
                self.spawn_surface(product.species, wall, tile, facing, first_step)?
            } else {
                let position = self.volume_product_position(site, &found, facing);
                self.spawn_volume(product.species, position, None, first_step)?
            };
            products.push(id);
        }

        self.counters.fired(p.index);
        self.stats.reactions_fired += 1;
        log::trace!("pathway '{}' fired at t={}", p.name, site.time);
        hooks.on_reaction(&ReactionReport {
            pathway: p.index,
            time: site.time,
            position: site.point,
            reactants: reactants.iter().copied().collect(),
            products,
        });
        Ok(true)
    }

    /// `(spec orientation, actual orientation)` of the reactant products
    /// are oriented against.
    fn reference_orientation(
        &self,
        p: &Pathway,
        found: &[Reactant],
        site: ReactionSite,
    ) -> Option<(Orientation, Orientation)> {
        let mut used = [false; 3];
        let mut surface = None;
        let mut volume = None;
        for spec in &p.reactants {
            if spec.orientation == Orientation::None {
                continue;
            }
            if self.species.get(spec.species).is_some_and(|s| s.is_surface_class()) {
                return Some((spec.orientation, Orientation::Up));
            }
            let Some(i) = found
                .iter()
                .enumerate()
                .position(|(i, r)| !used[i] && r.species == spec.species)
            else {
                continue;
            };
            used[i] = true;
            match found[i].placement {
                Placement::Surface { orientation, .. } if orientation != Orientation::None => {
                    surface.get_or_insert((spec.orientation, orientation));
                }
                Placement::Volume { .. } => {
                    if let Some((_, side)) = site.wall {
                        volume.get_or_insert((spec.orientation, side));
                    }
                }
                Placement::Surface { .. } => {}
            }
        }
        surface.or(volume)
    }

    /// Volume products at a wall start just off it on the side they face.
    fn volume_product_position(&mut self, site: ReactionSite, found: &[Reactant], facing: Orientation) -> Vec3 {
        let wall = site.wall.or_else(|| {
            found.iter().find_map(|r| match r.placement {
                Placement::Surface {
                    wall, orientation, ..
                } => Some((wall, orientation)),
                Placement::Volume { .. } => None,
            })
        });
        let Some((w, side)) = wall else {
            return site.point;
        };
        let side = match (facing, side) {
            (Orientation::None, Orientation::None) => self.random_orientation(),
            (Orientation::None, s) => s,
            (f, _) => f,
        };
        let normal = self.geometry.wall(w).frame.normal;
        let offset = SQRT_EPS * site.point.max_abs().max(1.0);
        let position = site.point + normal * (offset * f64::from(side.sign()));
        if self.partition.bounds().contains(position) {
            position
        } else {
            site.point
        }
    }

    /// Handle a unimolecular event.
    pub(crate) fn fire_unimolecular(
        &mut self,
        id: MoleculeId,
        at: f64,
        hooks: &mut dyn OutputHooks,
    ) -> Result<(), RunError> {
        let current = self
            .molecules
            .get_mut(id)
            .filter(|m| m.unimol_time.is_some_and(|t| t.to_bits() == at.to_bits()));
        let Some(m) = current else {
            self.stats.stale_events += 1;
            return Ok(());
        };
        m.unimol_time = None;
        let species = m.species;
        let placement = m.placement;
        let Some(class) = self.reactions.unimolecular(species) else {
            return Ok(());
        };
        let draw = self.rng.random::<f64>() * self.reactions.class(class).max_fixed_p;
        let pathway = self.reactions.class(class).select(draw).unwrap_or(0);
        let site = match placement {
            Placement::Volume { position, .. } => ReactionSite {
                point: position,
                wall: None,
                time: at,
            },
            Placement::Surface {
                wall,
                uv,
                orientation,
                ..
            } => ReactionSite {
                point: self.geometry.wall(wall).frame.uv_to_xyz(uv),
                wall: Some((wall, orientation)),
                time: at,
            },
        };
        let fired = self.apply_pathway(class, pathway, &[id], site, hooks)?;
        let survivor = self.molecules.get(id).is_some_and(|m| m.unimol_time.is_none());
        if survivor {
            if !fired {
                log::trace!("unimolecular reaction of molecule {id} blocked, rescheduling");
            }
            self.schedule_unimolecular(id)?;
        }
        Ok(())
    }
}
