//! Release programs: timed injection of molecules.
//!
//! A [`ReleaseProgram`] names a species, a [`ReleaseShape`], a
//! [`ReleaseQuantity`] and a [`ReleasePattern`]. Each firing is a calendar
//! event; after placing its molecules the program advances its
//! [`ReleaseState`] and re-enqueues itself until the pattern is exhausted.
//!
//! # Pattern
//!
//! Trains start at `delay + t * train_interval` for `t` in
//! `0..number_of_trains`. Within a train, releases happen every
//! `release_interval` while strictly inside `train_duration`. With the
//! default (all intervals `TIME_FOREVER`, one train) a program fires once
//! at `delay`.

use mote_core::{
    distinguishable, Orientation, RegionIndex, ReleaseIndex, SpeciesId, TileIndex, Vec3, WallIndex,
    AVOGADRO, EPS, LITRES_PER_CUBIC_UM, TIME_FOREVER,
};
use mote_geom::Transform;
use rand::Rng;

use crate::calendar::EventKind;
use crate::error::{ModelError, RunError};
use crate::sampling::{box_muller, point_in_ellipsoid, point_on_ellipsoid};
use crate::world::World;

/// Attempts per molecule before a rejection sampler gives up.
const MAX_REJECTIONS: u32 = 10_000;

/// Random tile draws per surface molecule before falling back to a scan
/// of vacant tiles.
const SURFACE_TRIES: u32 = 20;

/// Where a release puts its molecules.
#[derive(Clone, Debug, PartialEq)]
pub enum ReleaseShape {
    /// Every molecule at one point.
    Point(Vec3),
    /// Uniformly inside an ellipsoid with the given per-axis diameters.
    Sphere {
        /// Center.
        center: Vec3,
        /// Diameters along x, y, z.
        diameter: Vec3,
    },
    /// On the surface of an ellipsoid.
    SphericalShell {
        /// Center.
        center: Vec3,
        /// Diameters along x, y, z.
        diameter: Vec3,
    },
    /// Inside closed regions (volume species) or on region walls (surface
    /// species). Regions are named `<object path>[<region>]`.
    Region(Vec<String>),
}

/// How many molecules one firing releases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReleaseQuantity {
    /// A fixed count.
    Constant(u32),
    /// A normally distributed count, rounded and clamped at zero.
    Gaussian {
        /// Mean.
        mean: f64,
        /// Standard deviation.
        stddev: f64,
    },
    /// Molar concentration over the shape's volume.
    Concentration(f64),
    /// Molecules per µm² over the shape's surface.
    Density(f64),
}

/// Timing of a release program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReleasePattern {
    /// Time of the first release (s).
    pub delay: f64,
    /// Time between releases within a train (s).
    pub release_interval: f64,
    /// Length of a train (s).
    pub train_duration: f64,
    /// Time between train starts (s).
    pub train_interval: f64,
    /// Number of trains.
    pub number_of_trains: u32,
}

impl Default for ReleasePattern {
    fn default() -> Self {
        Self {
            delay: 0.0,
            release_interval: TIME_FOREVER,
            train_duration: TIME_FOREVER,
            train_interval: TIME_FOREVER,
            number_of_trains: 1,
        }
    }
}

/// Progress of one release program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReleaseState {
    /// Time of the next firing.
    pub next_time: f64,
    /// Start of the current train.
    pub train_start: f64,
    /// Index of the current train.
    pub train: u32,
    /// Molecules released so far.
    pub released: u64,
    /// No more firings.
    pub exhausted: bool,
}

impl ReleasePattern {
    /// Check timing values.
    pub fn validate(&self, release: &str) -> Result<(), ModelError> {
        let bad = |reason: &str| ModelError::InvalidRelease {
            release: release.to_string(),
            reason: reason.to_string(),
        };
        if !(self.delay.is_finite() && self.delay >= 0.0) {
            return Err(bad("delay must be finite and non-negative"));
        }
        if self.release_interval.is_nan() || self.release_interval <= 0.0 {
            return Err(bad("release interval must be positive"));
        }
        if self.train_interval.is_nan() || self.train_interval <= 0.0 {
            return Err(bad("train interval must be positive"));
        }
        if self.train_duration.is_nan() || self.train_duration <= 0.0 {
            return Err(bad("train duration must be positive"));
        }
        if self.train_duration > self.train_interval {
            return Err(ModelError::ReleaseTrainOverlap {
                release: release.to_string(),
                duration: self.train_duration,
                interval: self.train_interval,
            });
        }
        Ok(())
    }

    /// State before the first firing.
    pub fn start(&self) -> ReleaseState {
        ReleaseState {
            next_time: self.delay,
            train_start: self.delay,
            train: 0,
            released: 0,
            exhausted: self.number_of_trains == 0,
        }
    }

    /// Move `state` past the firing at `state.next_time`.
    pub fn advance(&self, state: &mut ReleaseState) {
        let next = state.next_time + self.release_interval;
        let train_end = state.train_start + self.train_duration;
        if next > train_end || !distinguishable(next, train_end, EPS) {
            state.train += 1;
            state.train_start += self.train_interval;
            state.next_time = state.train_start;
        } else {
            state.next_time = next;
        }
        if state.train >= self.number_of_trains || state.next_time >= TIME_FOREVER {
            state.exhausted = true;
        }
    }
}

/// A programmed injection of one species.
#[derive(Clone, Debug, PartialEq)]
pub struct ReleaseProgram {
    /// Name used in logs and errors.
    pub name: String,
    /// Released species.
    pub species: SpeciesId,
    /// Facing of released surface molecules. `None` picks randomly.
    pub orientation: Orientation,
    /// Where.
    pub shape: ReleaseShape,
    /// How many.
    pub quantity: ReleaseQuantity,
    /// When.
    pub pattern: ReleasePattern,
}

impl ReleaseProgram {
    /// A single release of `count` molecules at `point` at time zero.
    pub fn point(name: impl Into<String>, species: SpeciesId, point: Vec3, count: u32) -> Self {
        Self {
            name: name.into(),
            species,
            orientation: Orientation::None,
            shape: ReleaseShape::Point(point),
            quantity: ReleaseQuantity::Constant(count),
            pattern: ReleasePattern::default(),
        }
    }

    /// Replace the pattern.
    pub fn with_pattern(mut self, pattern: ReleasePattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Move the shape by an object transform.
    pub fn transformed(mut self, t: &Transform) -> Self {
        let scale = |d: Vec3| {
            let v = t.apply_vector(d);
            Vec3::new(v.x.abs(), v.y.abs(), v.z.abs())
        };
        self.shape = match self.shape {
            ReleaseShape::Point(p) => ReleaseShape::Point(t.apply_point(p)),
            ReleaseShape::Sphere { center, diameter } => ReleaseShape::Sphere {
                center: t.apply_point(center),
                diameter: scale(diameter),
            },
            ReleaseShape::SphericalShell { center, diameter } => ReleaseShape::SphericalShell {
                center: t.apply_point(center),
                diameter: scale(diameter),
            },
            shape @ ReleaseShape::Region(_) => shape,
        };
        self
    }
}

/// A program with its region names resolved.
#[derive(Clone, Debug)]
pub(crate) struct ActiveRelease {
    pub(crate) program: ReleaseProgram,
    pub(crate) regions: Vec<RegionIndex>,
}

impl World {
    /// Resolve and validate a program against the built world.
    pub(crate) fn activate_release(&self, program: ReleaseProgram) -> Result<ActiveRelease, ModelError> {
        program.pattern.validate(&program.name)?;
        let invalid = |reason: &str| ModelError::InvalidRelease {
            release: program.name.clone(),
            reason: reason.to_string(),
        };
        let species = self
            .species
            .get(program.species)
            .ok_or_else(|| ModelError::UnknownSpecies {
                context: format!("release '{}'", program.name),
                species: program.species,
            })?;
        if species.is_surface_class() {
            return Err(ModelError::InvalidSpeciesUse {
                context: format!("release '{}'", program.name),
                name: species.name.clone(),
                reason: "surface classes cannot be released",
            });
        }
        let surface = species.is_surface();

        let mut regions = Vec::new();
        match &program.shape {
            ReleaseShape::Region(names) => {
                for name in names {
                    let r = self.geometry.region_by_name(name).ok_or_else(|| {
                        ModelError::UnknownRegion {
                            context: format!("release '{}'", program.name),
                            region: name.clone(),
                        }
                    })?;
                    if !surface && !self.geometry.region(r).closed {
                        return Err(invalid("volume releases need closed regions"));
                    }
                    regions.push(r);
                }
            }
            _ if surface => return Err(invalid("surface species can only be released on regions")),
            ReleaseShape::Point(p)
            | ReleaseShape::Sphere { center: p, .. }
            | ReleaseShape::SphericalShell { center: p, .. } => {
                if !self.partition.bounds().contains(*p) {
                    return Err(ModelError::ReleaseOutsideDomain {
                        release: program.name.clone(),
                        point: *p,
                    });
                }
            }
        }

        match (program.quantity, &program.shape) {
            (ReleaseQuantity::Constant(_), _) => {}
            (ReleaseQuantity::Gaussian { mean, stddev }, _) => {
                if !(mean.is_finite() && stddev.is_finite() && stddev >= 0.0) {
                    return Err(invalid("gaussian quantity needs finite mean and non-negative deviation"));
                }
            }
            (ReleaseQuantity::Concentration(c), shape) => {
                if surface {
                    return Err(invalid("surface species are released by density"));
                }
                if !matches!(shape, ReleaseShape::Sphere { .. } | ReleaseShape::Region(_)) {
                    return Err(invalid("concentration needs a shape with volume"));
                }
                if !(c.is_finite() && c >= 0.0) {
                    return Err(invalid("concentration must be finite and non-negative"));
                }
            }
            (ReleaseQuantity::Density(d), _) => {
                if !surface {
                    return Err(invalid("volume species are released by concentration"));
                }
                if !(d.is_finite() && d >= 0.0) {
                    return Err(invalid("density must be finite and non-negative"));
                }
            }
        }

        if regions.iter().all(|&r| self.geometry.region(r).walls.is_empty()) && !regions.is_empty() {
            log::warn!("release '{}' targets only empty regions", program.name);
        }
        Ok(ActiveRelease { program, regions })
    }

    /// Enclosed volume of a closed region by the divergence theorem.
    pub(crate) fn region_volume(&self, r: RegionIndex) -> f64 {
        self.geometry
            .region(r)
            .walls
            .iter()
            .map(|&w| {
                let f = &self.geometry.wall(w).frame;
                f.area * f.distance_to_origin / 3.0
            })
            .sum::<f64>()
            .abs()
    }

    fn release_count(&mut self, r: usize) -> u64 {
        let active = &self.releases[r];
        let l = self.config.length_unit;
        let expected = match active.program.quantity {
            ReleaseQuantity::Constant(n) => return u64::from(n),
            ReleaseQuantity::Gaussian { mean, stddev } => mean + stddev * box_muller(&mut self.rng),
            ReleaseQuantity::Concentration(c) => {
                let volume = match &active.program.shape {
                    ReleaseShape::Sphere { diameter, .. } => {
                        std::f64::consts::PI / 6.0 * diameter.x * diameter.y * diameter.z
                    }
                    ReleaseShape::Region(_) => {
                        active.regions.iter().map(|&r| self.region_volume(r)).sum()
                    }
                    _ => 0.0,
                };
                c * AVOGADRO * LITRES_PER_CUBIC_UM * l * l * l * volume
            }
            ReleaseQuantity::Density(d) => {
                let area: f64 = self
                    .release_walls(&active.regions)
                    .iter()
                    .map(|&w| self.geometry.wall(w).frame.area)
                    .sum();
                d * area * l * l
            }
        };
        expected.round().max(0.0) as u64
    }

    fn release_walls(&self, regions: &[RegionIndex]) -> Vec<WallIndex> {
        let mut walls: Vec<WallIndex> = regions
            .iter()
            .flat_map(|&r| self.geometry.region(r).walls.iter().copied())
            .collect();
        walls.sort_unstable();
        walls.dedup();
        walls
    }

    /// Run one firing of release `r` and re-enqueue it.
    pub(crate) fn fire_release(&mut self, r: ReleaseIndex) -> Result<(), RunError> {
        let idx = r.index();
        let count = self.release_count(idx);
        let placed = if self.releases[idx].regions.is_empty() {
            self.release_in_volume(idx, count)?
        } else if self
            .species
            .get(self.releases[idx].program.species)
            .is_some_and(|s| s.is_surface())
        {
            self.release_on_surface(idx, count)?
        } else {
            self.release_in_regions(idx, count)?
        };
        self.stats.molecules_released += placed;

        let pattern = self.releases[idx].program.pattern;
        let state = &mut self.release_states[idx];
        state.released += placed;
        pattern.advance(state);
        if state.exhausted {
            log::info!(
                "release '{}' exhausted after {} molecules",
                self.releases[idx].program.name,
                state.released
            );
        } else {
            let next = state.next_time;
            self.calendar.schedule(EventKind::Release(r), next)?;
        }
        Ok(())
    }

    fn release_in_volume(&mut self, idx: usize, count: u64) -> Result<u64, RunError> {
        let species = self.releases[idx].program.species;
        let shape = self.releases[idx].program.shape.clone();
        let first_step = self.next_grid_time(self.time);
        let bounds = *self.partition.bounds();
        let mut placed = 0;
        for _ in 0..count {
            let p = match &shape {
                ReleaseShape::Point(p) => Some(*p),
                ReleaseShape::Sphere { center, diameter } => (0..MAX_REJECTIONS)
                    .map(|_| point_in_ellipsoid(&mut self.rng, *center, *diameter))
                    .find(|p| bounds.contains(*p)),
                ReleaseShape::SphericalShell { center, diameter } => (0..MAX_REJECTIONS)
                    .map(|_| point_on_ellipsoid(&mut self.rng, *center, *diameter))
                    .find(|p| bounds.contains(*p)),
                ReleaseShape::Region(_) => None,
            };
            let Some(p) = p else {
                log::warn!(
                    "release '{}' could not find a point inside the domain",
                    self.releases[idx].program.name
                );
                break;
            };
            self.spawn_volume(species, p, None, first_step)?;
            placed += 1;
        }
        Ok(placed)
    }

    fn release_in_regions(&mut self, idx: usize, count: u64) -> Result<u64, RunError> {
        let species = self.releases[idx].program.species;
        let regions = self.releases[idx].regions.clone();
        let mut bb = mote_core::Aabb::empty();
        for w in self.release_walls(&regions) {
            bb.union(&self.geometry.wall_bounds(w));
        }
        if bb.is_empty() {
            log::warn!("release '{}' targets empty regions", self.releases[idx].program.name);
            return Ok(0);
        }
        let first_step = self.next_grid_time(self.time);
        let mut placed = 0;
        for _ in 0..count {
            let mut found = None;
            for _ in 0..MAX_REJECTIONS {
                let p = Vec3::new(
                    self.rng.random_range(bb.min.x..=bb.max.x),
                    self.rng.random_range(bb.min.y..=bb.max.y),
                    self.rng.random_range(bb.min.z..=bb.max.z),
                );
                if regions.iter().any(|&r| self.geometry.point_in_region(p, r)) {
                    found = Some(p);
                    break;
                }
            }
            let Some(p) = found else {
                log::warn!(
                    "release '{}' could not find a point inside its regions",
                    self.releases[idx].program.name
                );
                break;
            };
            self.spawn_volume(species, p, None, first_step)?;
            placed += 1;
        }
        Ok(placed)
    }

    fn release_on_surface(&mut self, idx: usize, count: u64) -> Result<u64, RunError> {
        let program = self.releases[idx].program.clone();
        let walls = self.release_walls(&self.releases[idx].regions);
        if walls.is_empty() {
            log::warn!("release '{}' targets empty regions", program.name);
            return Ok(0);
        }
        let mut cumulative = Vec::with_capacity(walls.len());
        let mut total = 0.0;
        for &w in &walls {
            total += self.geometry.wall(w).frame.area;
            cumulative.push(total);
        }
        let first_step = self.next_grid_time(self.time);
        let mut vacant: Option<Vec<(WallIndex, TileIndex)>> = None;
        let mut placed = 0;
        for _ in 0..count {
            let mut target = None;
            if vacant.is_none() {
                for _ in 0..SURFACE_TRIES {
                    let x = self.rng.random::<f64>() * total;
                    let i = cumulative.partition_point(|&c| c <= x).min(walls.len() - 1);
                    let w = walls[i];
                    let grid = self.geometry.ensure_grid(w)?;
                    let tile = TileIndex(self.rng.random_range(0..grid.tile_count()));
                    if grid.occupant(tile).is_none() {
                        target = Some((w, tile));
                        break;
                    }
                }
                if target.is_none() {
                    let mut all = Vec::new();
                    for &w in &walls {
                        let grid = self.geometry.ensure_grid(w)?;
                        all.extend(grid.vacant_tiles().map(|t| (w, t)));
                    }
                    vacant = Some(all);
                }
            }
            if let Some(list) = vacant.as_mut() {
                if list.is_empty() {
                    log::warn!("release '{}' ran out of vacant tiles", program.name);
                    break;
                }
                let i = self.rng.random_range(0..list.len());
                target = Some(list.swap_remove(i));
            }
            let Some((w, tile)) = target else { break };
            let orientation = match program.orientation {
                Orientation::None => self.random_orientation(),
                o => o,
            };
            self.spawn_surface(program.species, w, tile, orientation, first_step)?;
            placed += 1;
        }
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_all(p: &ReleasePattern, limit: usize) -> Vec<f64> {
        let mut s = p.start();
        let mut times = Vec::new();
        while !s.exhausted && times.len() < limit {
            times.push(s.next_time);
            p.advance(&mut s);
        }
        times
    }

    #[test]
    fn default_pattern_fires_once() {
        let p = ReleasePattern {
            delay: 2e-6,
            ..ReleasePattern::default()
        };
        assert_eq!(fire_all(&p, 10), vec![2e-6]);
    }

    #[test]
    fn trains_of_releases() {
        let p = ReleasePattern {
            delay: 1.0,
            release_interval: 1.0,
            train_duration: 2.5,
            train_interval: 10.0,
            number_of_trains: 2,
        };
        assert_eq!(fire_all(&p, 20), vec![1.0, 2.0, 3.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn release_at_train_end_is_excluded() {
        let p = ReleasePattern {
            delay: 0.0,
            release_interval: 1.0,
            train_duration: 2.0,
            train_interval: 5.0,
            number_of_trains: 1,
        };
        assert_eq!(fire_all(&p, 20), vec![0.0, 1.0]);
    }

    #[test]
    fn one_release_per_train() {
        let p = ReleasePattern {
            delay: 0.0,
            release_interval: TIME_FOREVER,
            train_duration: 1e-5,
            train_interval: 1e-4,
            number_of_trains: 2,
        };
        assert_eq!(fire_all(&p, 20), vec![0.0, 1e-4]);
    }

    #[test]
    fn zero_trains_never_fire() {
        let p = ReleasePattern {
            number_of_trains: 0,
            ..ReleasePattern::default()
        };
        assert!(fire_all(&p, 5).is_empty());
    }

    #[test]
    fn overlapping_trains_rejected() {
        let p = ReleasePattern {
            train_duration: 2.0,
            train_interval: 1.0,
            ..ReleasePattern::default()
        };
        assert!(matches!(
            p.validate("r"),
            Err(ModelError::ReleaseTrainOverlap { .. })
        ));
        assert_eq!(ReleasePattern::default().validate("r"), Ok(()));
    }

    #[test]
    fn zero_interval_rejected() {
        let p = ReleasePattern {
            release_interval: 0.0,
            ..ReleasePattern::default()
        };
        assert!(matches!(p.validate("r"), Err(ModelError::InvalidRelease { .. })));
    }

    #[test]
    fn site_transform_moves_shape() {
        let prog = ReleaseProgram::point("p", SpeciesId(0), Vec3::new(1.0, 0.0, 0.0), 3)
            .transformed(&Transform::translate(Vec3::new(0.0, 2.0, 0.0)));
        assert_eq!(prog.shape, ReleaseShape::Point(Vec3::new(1.0, 2.0, 0.0)));
        let sphere = ReleaseProgram {
            shape: ReleaseShape::Sphere {
                center: Vec3::ZERO,
                diameter: Vec3::new(1.0, 1.0, 1.0),
            },
            ..prog
        }
        .transformed(&Transform::scale(Vec3::new(2.0, -1.0, 1.0)));
        assert_eq!(
            sphere.shape,
            ReleaseShape::Sphere {
                center: Vec3::ZERO,
                diameter: Vec3::new(2.0, 1.0, 1.0)
            }
        );
    }
}
