//! Surface diffusion and surface-surface reactions.
//!
//! A surface molecule's step is a 2-D Gaussian displacement in its wall's
//! frame. When the displacement leaves the triangle it continues on the
//! neighbor across that edge, rotated into the neighbor's frame; edges
//! without a neighbor reflect it. The molecule only moves if the tile it
//! lands on is vacant.

use mote_core::{MoleculeId, Orientation, SpeciesId, Vec2, WallIndex};
use smallvec::SmallVec;

use crate::error::RunError;
use crate::hooks::OutputHooks;
use crate::molecule::Placement;
use crate::outcome::ReactionSite;
use crate::reaction::{Candidate, ReactionKind};
use crate::sampling::box_muller;
use crate::world::{StepOutcome, World};

impl World {
    pub(crate) fn diffuse_surface(
        &mut self,
        id: MoleculeId,
        hooks: &mut dyn OutputHooks,
    ) -> Result<StepOutcome, RunError> {
        let not_surface = || RunError::NoSuchMolecule {
            molecule: id,
            expected: "surface",
        };
        let m = self.molecules.get(id).ok_or_else(not_surface)?;
        let species = m.species;
        let mut at = m.placement;
        let Placement::Surface {
            wall,
            tile,
            uv,
            orientation,
        } = at
        else {
            return Err(not_surface());
        };

        let sigma = self.species.get(species).map_or(0.0, |s| s.step_sigma);
        if sigma > 0.0 {
            self.stats.diffusion_steps += 1;
            let d = Vec2::new(sigma * box_muller(&mut self.rng), sigma * box_muller(&mut self.rng));
            let (to_wall, to_uv) = self.walk_surface(wall, uv, d);
            let grid = self.geometry.ensure_grid(to_wall)?;
            let to_tile = grid.uv_to_tile(to_uv);
            let moved = if to_wall == wall && to_tile == tile {
                true
            } else if grid.occupant(to_tile).is_none() {
                grid.place(to_tile, id)?;
                if let Some(old) = self.geometry.wall_mut(wall).grid.as_mut() {
                    old.clear(tile);
                }
                if to_wall != wall {
                    self.recount_surface_move(species, wall, to_wall);
                }
                true
            } else {
                false
            };
            if moved {
                at = Placement::Surface {
                    wall: to_wall,
                    tile: to_tile,
                    uv: to_uv,
                    orientation,
                };
                if let Some(m) = self.molecules.get_mut(id) {
                    m.placement = at;
                }
            }
        }

        if self.reactions.surface_partners(species).is_empty() {
            return Ok(StepOutcome::Moved);
        }
        self.react_with_neighbors(id, species, at, hooks)
    }

    /// Follow a 2-D displacement across wall edges.
    ///
    /// Returns the final wall and local position. After
    /// `max_edge_crossings` edge events the molecule stays where it is.
    pub(crate) fn walk_surface(&mut self, start: WallIndex, uv: Vec2, disp: Vec2) -> (WallIndex, Vec2) {
        let mut w = start;
        let mut pos = uv;
        let mut d = disp;
        let mut events = 0u32;
        loop {
            let wall = self.geometry.wall(w);
            let Some((edge, t)) = wall.frame.exit_edge(pos, d) else {
                return (w, pos + d);
            };
            events += 1;
            if events > self.config.max_edge_crossings {
                self.stats.edge_crossing_limit_hits += 1;
                return (w, pos + d * t);
            }
            let crossing = pos + d * t;
            let rest = d * (1.0 - t);
            match wall.edges[edge] {
                Some(tr) => {
                    pos = tr.apply(crossing);
                    d = tr.rotate(rest);
                    w = tr.neighbor;
                    self.stats.mol_moves_between_walls += 1;
                }
                None => {
                    pos = crossing;
                    d = wall.frame.reflect_across_edge(edge, rest);
                }
            }
        }
    }

    fn recount_surface_move(&mut self, species: SpeciesId, from: WallIndex, to: WallIndex) {
        let before = self.surface_regions(from);
        let after = self.surface_regions(to);
        for &r in before.iter().filter(|r| !after.contains(r)) {
            self.counters.crossed(species, r, false);
        }
        for &r in after.iter().filter(|r| !before.contains(r)) {
            self.counters.crossed(species, r, true);
        }
    }

    /// Test reactions with molecules on the tiles sharing an edge with
    /// the tile of `at`.
    fn react_with_neighbors(
        &mut self,
        id: MoleculeId,
        species: SpeciesId,
        at: Placement,
        hooks: &mut dyn OutputHooks,
    ) -> Result<StepOutcome, RunError> {
        let Placement::Surface {
            wall,
            tile,
            uv,
            orientation,
        } = at
        else {
            return Ok(StepOutcome::Moved);
        };
        let w = self.geometry.wall(wall);
        let Some(grid) = w.grid.as_ref() else {
            return Ok(StepOutcome::Moved);
        };
        let neighbors = grid.neighbor_tiles(tile);
        let scaling = grid.tile_area() * neighbors.len() as f64;
        let partners = self.reactions.surface_partners(species);

        let mut candidates: SmallVec<[Candidate; 3]> = SmallVec::new();
        let mut others: SmallVec<[MoleculeId; 3]> = SmallVec::new();
        for &t in &neighbors {
            let Some(other) = grid.occupant(t) else { continue };
            let Some(m) = self.molecules.get(other) else { continue };
            if !partners.contains(&m.species) {
                continue;
            }
            let Placement::Surface {
                orientation: other_orientation,
                ..
            } = m.placement
            else {
                continue;
            };
            let Some(class) = self.reactions.find(&[species, m.species]) else {
                continue;
            };
            if self.reactions.class(class).kind != ReactionKind::SurfaceSurface {
                continue;
            }
            candidates.push(Candidate {
                class,
                scaling,
                participants: SmallVec::from_slice(&[
                    (species, orientation),
                    (m.species, other_orientation),
                ]),
            });
            others.push(other);
        }
        if candidates.is_empty() {
            return Ok(StepOutcome::Moved);
        }
        let point = w.frame.uv_to_xyz(uv);

        let Some((ci, pi)) = self.select_reaction(&candidates)? else {
            return Ok(StepOutcome::Moved);
        };
        let site = ReactionSite {
            point,
            wall: Some((wall, orientation)),
            time: self.time,
        };
        let reactants = [id, others[ci]];
        if self.apply_pathway(candidates[ci].class, pi, &reactants, site, hooks)? {
            Ok(StepOutcome::Reacted)
        } else {
            Ok(StepOutcome::Moved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::model::Model;
    use crate::species::SpeciesDef;
    use mote_core::Vec3;
    use mote_geom::{ObjectNode, PolygonMesh};

    /// Floor in `z = 0` and a wall folded up into `y = 0`, sharing the
    /// edge from the origin along x.
    fn folded() -> World {
        let mut m = Model::new();
        m.add_species(SpeciesDef::surface("S", 1.0));
        m.add_object(ObjectNode::polygon(
            "fold",
            PolygonMesh {
                vertices: vec![
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(4.0, 0.0, 0.0),
                    Vec3::new(0.0, 4.0, 0.0),
                    Vec3::new(0.0, 0.0, 4.0),
                ],
                triangles: vec![[0, 1, 2], [1, 0, 3]],
                regions: Vec::new(),
            },
        ));
        World::new(&m, SimConfig::default()).unwrap()
    }

    #[test]
    fn walk_continues_onto_the_folded_neighbor() {
        let mut w = folded();
        let floor = WallIndex(0);
        let start = w.geometry.wall(floor).frame.xyz_to_uv(Vec3::new(1.0, 1.0, 0.0));
        let down = w.geometry.wall(floor).frame.xyz_to_uv(Vec3::new(1.0, -1.0, 0.0)) - start;

        let (to, uv) = w.walk_surface(floor, start, down);

        assert_eq!(to, WallIndex(1));
        let p = w.geometry.wall(to).frame.uv_to_xyz(uv);
        assert!((p - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-9, "ended at {p:?}");
        assert_eq!(w.stats.mol_moves_between_walls, 1);
    }

    #[test]
    fn walk_reflects_at_open_edges() {
        let mut w = folded();
        let floor = WallIndex(0);
        let frame = w.geometry.wall(floor).frame;
        let start = frame.xyz_to_uv(Vec3::new(1.0, 1.0, 0.0));
        let left = frame.xyz_to_uv(Vec3::new(-1.0, 1.0, 0.0)) - start;

        let (to, uv) = w.walk_surface(floor, start, left);

        assert_eq!(to, floor);
        let p = frame.uv_to_xyz(uv);
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-9, "ended at {p:?}");
    }

    #[test]
    fn walk_stops_after_the_crossing_limit() {
        let mut w = folded();
        w.config.max_edge_crossings = 1;
        let floor = WallIndex(0);
        let frame = w.geometry.wall(floor).frame;
        let start = frame.xyz_to_uv(Vec3::new(1.0, 2.0, 0.0));
        // Bounces off x = 0, then would cross y = 0.
        let disp = frame.xyz_to_uv(Vec3::new(-1.0, -1.0, 0.0)) - start;

        let (to, _) = w.walk_surface(floor, start, disp);

        assert_eq!(to, floor);
        assert_eq!(w.stats.edge_crossing_limit_hits, 1);
    }
}
