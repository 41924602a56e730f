//! The subvolume lattice and molecule membership.

use std::ops::RangeInclusive;

use mote_core::{Aabb, MoleculeId, SubvolumeIndex, Vec3, WallIndex, EPS};
use mote_geom::GeometryStore;
use smallvec::SmallVec;

use crate::direction::Direction;
use crate::error::PartitionError;

/// One cell of the lattice.
#[derive(Clone, Debug)]
pub struct Subvolume {
    bounds: Aabb,
    cell: [u32; 3],
    neighbors: [Option<SubvolumeIndex>; 6],
    molecules: Vec<MoleculeId>,
    walls: Vec<WallIndex>,
}

impl Subvolume {
    /// Extent of the cell.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Lattice coordinates `(i, j, k)`.
    pub fn cell(&self) -> [u32; 3] {
        self.cell
    }

    /// Neighbor in `dir`, or `None` at the domain boundary.
    pub fn neighbor(&self, dir: Direction) -> Option<SubvolumeIndex> {
        self.neighbors[dir.slot()]
    }

    /// Volume molecules currently inside.
    pub fn molecules(&self) -> &[MoleculeId] {
        &self.molecules
    }

    /// Walls whose bounds overlap the cell.
    pub fn walls(&self) -> &[WallIndex] {
        &self.walls
    }
}

/// A regular lattice of subvolumes over the simulation box.
///
/// Cells are half-open (`min <= x < max`) except the last cell along each
/// axis, which also owns the upper face, so every point in the box has
/// exactly one cell.
#[derive(Clone, Debug)]
pub struct Partition {
    bounds: Aabb,
    divisions: [u32; 3],
    planes: [Vec<f64>; 3],
    subvolumes: Vec<Subvolume>,
}

impl Partition {
    /// Cut `bounds` into `divisions[a]` equal slabs along each axis.
    pub fn new(bounds: Aabb, divisions: [u32; 3]) -> Result<Self, PartitionError> {
        let extent = bounds.extent();
        if bounds.is_empty()
            || !bounds.min.is_finite()
            || !bounds.max.is_finite()
            || extent.x <= 0.0
            || extent.y <= 0.0
            || extent.z <= 0.0
        {
            return Err(PartitionError::EmptyBounds);
        }
        if let Some(axis) = divisions.iter().position(|&d| d == 0) {
            return Err(PartitionError::ZeroDivisions { axis });
        }
        let count = divisions.iter().map(|&d| d as u64).product::<u64>();
        if count > u32::MAX as u64 {
            return Err(PartitionError::TooManySubvolumes { count });
        }

        let planes: [Vec<f64>; 3] = std::array::from_fn(|a| {
            let n = divisions[a];
            let (lo, hi) = (bounds.min[a], bounds.max[a]);
            (0..=n)
                .map(|i| {
                    if i == n {
                        hi
                    } else {
                        lo + (hi - lo) * i as f64 / n as f64
                    }
                })
                .collect()
        });

        let [nx, ny, nz] = divisions;
        let mut subvolumes = Vec::with_capacity(count as usize);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let cell = [i, j, k];
                    let lo = Vec3::new(
                        planes[0][i as usize],
                        planes[1][j as usize],
                        planes[2][k as usize],
                    );
                    let hi = Vec3::new(
                        planes[0][i as usize + 1],
                        planes[1][j as usize + 1],
                        planes[2][k as usize + 1],
                    );
                    let mut neighbors = [None; 6];
                    for dir in Direction::ALL {
                        let a = dir.axis();
                        let mut c = cell;
                        let in_range = if dir.is_positive() {
                            c[a] += 1;
                            c[a] < divisions[a]
                        } else if c[a] > 0 {
                            c[a] -= 1;
                            true
                        } else {
                            false
                        };
                        if in_range {
                            neighbors[dir.slot()] = Some(Self::index_for(divisions, c));
                        }
                    }
                    subvolumes.push(Subvolume {
                        bounds: Aabb { min: lo, max: hi },
                        cell,
                        neighbors,
                        molecules: Vec::new(),
                        walls: Vec::new(),
                    });
                }
            }
        }

        Ok(Self {
            bounds,
            divisions,
            planes,
            subvolumes,
        })
    }

    /// Cut `bounds` into cubes of roughly `edge` on a side.
    pub fn with_edge_length(bounds: Aabb, edge: f64) -> Result<Self, PartitionError> {
        if !edge.is_finite() || edge <= 0.0 {
            return Err(PartitionError::InvalidEdgeLength { value: edge });
        }
        let e = bounds.extent();
        let div = |len: f64| ((len / edge).round() as u32).max(1);
        Self::new(bounds, [div(e.x), div(e.y), div(e.z)])
    }

    fn index_for(divisions: [u32; 3], c: [u32; 3]) -> SubvolumeIndex {
        SubvolumeIndex(c[2] + divisions[2] * (c[1] + divisions[1] * c[0]))
    }

    /// The partitioned box.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Cells per axis.
    pub fn divisions(&self) -> [u32; 3] {
        self.divisions
    }

    /// Number of subvolumes.
    pub fn len(&self) -> usize {
        self.subvolumes.len()
    }

    /// Whether there are no subvolumes (never true for a built partition).
    pub fn is_empty(&self) -> bool {
        self.subvolumes.is_empty()
    }

    /// One subvolume.
    pub fn subvolume(&self, s: SubvolumeIndex) -> &Subvolume {
        &self.subvolumes[s.index()]
    }

    /// All subvolumes in index order.
    pub fn subvolumes(&self) -> &[Subvolume] {
        &self.subvolumes
    }

    fn axis_cell(&self, axis: usize, x: f64) -> u32 {
        let planes = &self.planes[axis];
        let above = planes.partition_point(|&p| p <= x);
        (above.saturating_sub(1) as u32).min(self.divisions[axis] - 1)
    }

    /// Whether cell `s` owns point `p` under the half-open rule.
    pub fn owns(&self, s: SubvolumeIndex, p: Vec3) -> bool {
        let sv = &self.subvolumes[s.index()];
        (0..3).all(|a| {
            let last = sv.cell[a] + 1 == self.divisions[a];
            p[a] >= sv.bounds.min[a]
                && (p[a] < sv.bounds.max[a] || (last && p[a] <= sv.bounds.max[a]))
        })
    }

    /// Find the subvolume containing `p`, trying `hint` first.
    pub fn locate(&self, p: Vec3, hint: Option<SubvolumeIndex>) -> Result<SubvolumeIndex, PartitionError> {
        if !self.bounds.contains(p) {
            return Err(PartitionError::OutsideBounds { point: p });
        }
        if let Some(h) = hint.filter(|h| h.index() < self.subvolumes.len()) {
            if self.owns(h, p) {
                return Ok(h);
            }
        }
        let c = [self.axis_cell(0, p.x), self.axis_cell(1, p.y), self.axis_cell(2, p.z)];
        Ok(Self::index_for(self.divisions, c))
    }

    /// The neighbor of `s` in `dir`, or `None` at the domain boundary.
    pub fn traverse(&self, s: SubvolumeIndex, dir: Direction) -> Option<SubvolumeIndex> {
        self.subvolumes[s.index()].neighbor(dir)
    }

    fn axis_range(&self, axis: usize, lo: f64, hi: f64) -> Option<RangeInclusive<u32>> {
        if hi < self.bounds.min[axis] || lo > self.bounds.max[axis] {
            return None;
        }
        Some(self.axis_cell(axis, lo)..=self.axis_cell(axis, hi))
    }

    /// Subvolumes whose cells overlap `region`, in index order.
    pub fn overlapping(&self, region: &Aabb) -> SmallVec<[SubvolumeIndex; 8]> {
        let mut out = SmallVec::new();
        let (Some(xs), Some(ys), Some(zs)) = (
            self.axis_range(0, region.min.x, region.max.x),
            self.axis_range(1, region.min.y, region.max.y),
            self.axis_range(2, region.min.z, region.max.z),
        ) else {
            return out;
        };
        for i in xs {
            for j in ys.clone() {
                for k in zs.clone() {
                    out.push(Self::index_for(self.divisions, [i, j, k]));
                }
            }
        }
        out
    }

    /// Where `origin + t * disp` leaves subvolume `s`: the face and the
    /// fraction `t`, or `None` if the end point stays inside.
    pub fn exit_face(&self, s: SubvolumeIndex, origin: Vec3, disp: Vec3) -> Option<(Direction, f64)> {
        let b = &self.subvolumes[s.index()].bounds;
        let mut best: Option<(Direction, f64)> = None;
        for a in 0..3 {
            let d = disp[a];
            if d == 0.0 {
                continue;
            }
            let (face, positive) = if d > 0.0 { (b.max[a], true) } else { (b.min[a], false) };
            let t = ((face - origin[a]) / d).max(0.0);
            if t < 1.0 && best.is_none_or(|(_, bt)| t < bt) {
                best = Some((Direction::from_axis(a, positive), t));
            }
        }
        best
    }

    // ── Walls ──────────────────────────────────────────────────────

    /// Record, for every subvolume, the walls whose bounds overlap it.
    pub fn assign_walls(&mut self, geometry: &GeometryStore) {
        for sv in &mut self.subvolumes {
            sv.walls.clear();
        }
        for w in 0..geometry.walls().len() {
            let w = WallIndex(w as u32);
            let bb = geometry.wall_bounds(w);
            let pad = EPS * bb.extent().max_abs().max(1.0);
            for s in self.overlapping(&bb.expanded(pad)) {
                self.subvolumes[s.index()].walls.push(w);
            }
        }
    }

    // ── Membership ─────────────────────────────────────────────────

    /// Add a molecule to a subvolume's membership list.
    pub fn insert_molecule(&mut self, s: SubvolumeIndex, id: MoleculeId) {
        debug_assert!(
            !self.subvolumes[s.index()].molecules.contains(&id),
            "molecule {id} inserted twice into subvolume {s}"
        );
        self.subvolumes[s.index()].molecules.push(id);
    }

    /// Remove a molecule from a subvolume. Returns whether it was there.
    pub fn remove_molecule(&mut self, s: SubvolumeIndex, id: MoleculeId) -> bool {
        let list = &mut self.subvolumes[s.index()].molecules;
        match list.iter().position(|&m| m == id) {
            Some(i) => {
                list.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Move a molecule between subvolumes.
    pub fn transfer(&mut self, id: MoleculeId, from: SubvolumeIndex, to: SubvolumeIndex) {
        if from == to {
            return;
        }
        let removed = self.remove_molecule(from, id);
        debug_assert!(removed, "molecule {id} missing from subvolume {from}");
        self.insert_molecule(to, id);
    }

    /// Drop every membership entry.
    pub fn clear_molecules(&mut self) {
        for sv in &mut self.subvolumes {
            sv.molecules.clear();
        }
    }

    /// Total membership across all subvolumes.
    pub fn molecule_count(&self) -> usize {
        self.subvolumes.iter().map(|s| s.molecules.len()).sum()
    }
}
