//! Species, region and reaction counters.
//!
//! [`Counters`] is updated incrementally as molecules are created,
//! destroyed or cross counted region boundaries, and as pathways fire.
//! Region counts cover regions marked `counted`: surface molecules count
//! toward the regions of their wall, volume molecules toward the closed
//! regions enclosing them.

use indexmap::IndexMap;
use mote_core::{Aabb, PathwayIndex, RegionIndex, SpeciesId};

use crate::molecule::{MoleculeStore, Placement};

/// Incrementally maintained counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Counters {
    species: Vec<i64>,
    regions: IndexMap<(RegionIndex, SpeciesId), i64>,
    reactions: Vec<u64>,
}

impl Counters {
    /// Zeroed counters for the given table sizes.
    pub fn new(species: usize, pathways: usize) -> Self {
        Self {
            species: vec![0; species],
            regions: IndexMap::new(),
            reactions: vec![0; pathways],
        }
    }

    /// Live molecules of `species`.
    pub fn species_count(&self, species: SpeciesId) -> i64 {
        self.species.get(species.index()).copied().unwrap_or(0)
    }

    /// Live molecules of every species, by id.
    pub fn species_totals(&self) -> &[i64] {
        &self.species
    }

    /// Molecules of `species` in counted region `region`.
    pub fn region_count(&self, region: RegionIndex, species: SpeciesId) -> i64 {
        self.regions.get(&(region, species)).copied().unwrap_or(0)
    }

    /// Every non-zero-history region count, in first-touched order.
    pub fn region_counts(&self) -> impl Iterator<Item = ((RegionIndex, SpeciesId), i64)> + '_ {
        self.regions.iter().map(|(&k, &v)| (k, v))
    }

    /// Times pathway `p` has fired.
    pub fn reaction_count(&self, p: PathwayIndex) -> u64 {
        self.reactions.get(p.index()).copied().unwrap_or(0)
    }

    /// Firing counts of every pathway, by index.
    pub fn reaction_totals(&self) -> &[u64] {
        &self.reactions
    }

    pub(crate) fn created(&mut self, species: SpeciesId, regions: &[RegionIndex]) {
        if let Some(c) = self.species.get_mut(species.index()) {
            *c += 1;
        }
        for &r in regions {
            *self.regions.entry((r, species)).or_insert(0) += 1;
        }
    }

    pub(crate) fn destroyed(&mut self, species: SpeciesId, regions: &[RegionIndex]) {
        if let Some(c) = self.species.get_mut(species.index()) {
            *c -= 1;
        }
        for &r in regions {
            *self.regions.entry((r, species)).or_insert(0) -= 1;
        }
    }

    pub(crate) fn crossed(&mut self, species: SpeciesId, region: RegionIndex, entering: bool) {
        *self.regions.entry((region, species)).or_insert(0) += if entering { 1 } else { -1 };
    }

    pub(crate) fn fired(&mut self, pathway: PathwayIndex) {
        if let Some(c) = self.reactions.get_mut(pathway.index()) {
            *c += 1;
        }
    }
}

fn species_matches(filter: Option<SpeciesId>, s: SpeciesId) -> bool {
    filter.is_none_or(|f| f == s)
}

/// Volume molecules (optionally of one species) inside `aabb`, bounds inclusive.
pub fn count_in_box(molecules: &MoleculeStore, species: Option<SpeciesId>, aabb: &Aabb) -> u64 {
    molecules
        .iter()
        .filter(|m| species_matches(species, m.species))
        .filter(|m| match m.placement {
            Placement::Volume { position, .. } => aabb.contains(position),
            Placement::Surface { .. } => false,
        })
        .count() as u64
}

/// Volume molecule counts on a regular voxel lattice over `bounds`.
///
/// Voxels are half-open except the last along each axis, which includes
/// the upper face. The result is indexed `k + nz * (j + ny * i)`.
pub fn count_in_voxels(
    molecules: &MoleculeStore,
    species: Option<SpeciesId>,
    bounds: &Aabb,
    divisions: [u32; 3],
) -> Vec<u64> {
    let [nx, ny, nz] = divisions.map(|d| d.max(1) as usize);
    let mut out = vec![0u64; nx * ny * nz];
    let extent = bounds.extent();
    let cell = |axis: usize, x: f64, n: usize| -> usize {
        let f = (x - bounds.min[axis]) / extent[axis] * n as f64;
        (f.floor().max(0.0) as usize).min(n - 1)
    };
    for m in molecules.iter().filter(|m| species_matches(species, m.species)) {
        let Placement::Volume { position: p, .. } = m.placement else {
            continue;
        };
        if !bounds.contains(p) {
            continue;
        }
        let (i, j, k) = (cell(0, p.x, nx), cell(1, p.y, ny), cell(2, p.z, nz));
        out[k + nz * (j + ny * i)] += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mote_core::{SubvolumeIndex, Vec3};

    fn store_with(points: &[(u32, Vec3)]) -> MoleculeStore {
        let mut store = MoleculeStore::new();
        for &(s, p) in points {
            store
                .insert(
                    SpeciesId(s),
                    Placement::Volume {
                        position: p,
                        subvolume: SubvolumeIndex(0),
                    },
                    0.0,
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn create_destroy_cross() {
        let mut c = Counters::new(2, 1);
        let r = RegionIndex(3);
        c.created(SpeciesId(1), &[r]);
        c.created(SpeciesId(1), &[]);
        assert_eq!(c.species_count(SpeciesId(1)), 2);
        assert_eq!(c.region_count(r, SpeciesId(1)), 1);
        c.crossed(SpeciesId(1), r, true);
        assert_eq!(c.region_count(r, SpeciesId(1)), 2);
        c.destroyed(SpeciesId(1), &[r]);
        c.crossed(SpeciesId(1), r, false);
        assert_eq!(c.region_count(r, SpeciesId(1)), 0);
        assert_eq!(c.species_count(SpeciesId(1)), 1);
        c.fired(PathwayIndex(0));
        assert_eq!(c.reaction_count(PathwayIndex(0)), 1);
        assert_eq!(c.reaction_count(PathwayIndex(5)), 0);
    }

    #[test]
    fn box_count_filters_species() {
        let store = store_with(&[
            (0, Vec3::new(0.5, 0.5, 0.5)),
            (1, Vec3::new(0.5, 0.5, 0.5)),
            (0, Vec3::new(2.0, 0.5, 0.5)),
        ]);
        let bb = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(count_in_box(&store, None, &bb), 2);
        assert_eq!(count_in_box(&store, Some(SpeciesId(0)), &bb), 1);
    }

    #[test]
    fn voxel_counts_use_each_axis_bound() {
        // A point with x beyond the x extent but y within it must not count.
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 4.0, 1.0));
        let store = store_with(&[
            (0, Vec3::new(0.25, 0.5, 0.5)),
            (0, Vec3::new(0.75, 3.9, 0.9)),
            (0, Vec3::new(2.0, 1.0, 0.5)),
            (0, Vec3::new(1.0, 4.0, 1.0)),
        ]);
        let v = count_in_voxels(&store, None, &bounds, [2, 2, 1]);
        assert_eq!(v.iter().sum::<u64>(), 3);
        assert_eq!(v[0], 1); // i=0, j=0
        assert_eq!(v[3], 2); // i=1, j=1, upper faces included
    }
}
