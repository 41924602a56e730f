//! Triangular tiling of a wall for surface-bound molecules.
//!
//! A wall is cut into `n` strips parallel to its first edge, and each
//! strip into alternating upright and flipped triangles, giving `n * n`
//! congruent tiles. Strip `s` (counted from the apex, `0..n`) holds
//! `2s + 1` tiles, so the linear index is `s*s + 2*stripe + flip`.

use mote_core::{MoleculeId, ResourceError, TileIndex, Vec2, Vec3};
use rand::Rng;
use smallvec::SmallVec;

use crate::error::GeometryError;
use crate::wall::WallFrame;

/// Row/column/half decomposition of a tile index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Strip counted from the apex (`0..n`).
    pub strip: u32,
    /// Position along the strip (`0..=strip`).
    pub stripe: u32,
    /// 0 for an upright tile, 1 for a flipped one.
    pub flip: u32,
}

/// The tile lattice of one wall.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceGrid {
    n: u32,
    n_tiles: u32,
    occupied: u32,
    binding_factor: f64,
    strip_width_rcp: f64,
    vert2_slope: f64,
    fullslope: f64,
    uv_vert1_u: f64,
    uv_vert2: Vec2,
    tiles: Vec<Option<MoleculeId>>,
}

impl SurfaceGrid {
    /// Build an empty grid sized for `frame`.
    pub fn new(frame: &WallFrame) -> Result<Self, ResourceError> {
        let mut grid = Self {
            n: 0,
            n_tiles: 0,
            occupied: 0,
            binding_factor: 0.0,
            strip_width_rcp: 0.0,
            vert2_slope: 0.0,
            fullslope: 0.0,
            uv_vert1_u: 0.0,
            uv_vert2: Vec2::ZERO,
            tiles: Vec::new(),
        };
        grid.initialize(frame)?;
        Ok(grid)
    }

    /// Rebuild tile geometry from the wall's current frame.
    ///
    /// Occupants keep their tile index. If the grid shrinks, occupants of
    /// vanished tiles are removed and returned so the caller can relocate
    /// them.
    pub fn initialize(&mut self, frame: &WallFrame) -> Result<Vec<MoleculeId>, ResourceError> {
        let n = (frame.area.sqrt().ceil() as u32).max(1);
        let n_tiles = n * n;

        self.n = n;
        self.n_tiles = n_tiles;
        self.binding_factor = n_tiles as f64 / frame.area;
        self.strip_width_rcp = n as f64 / frame.uv_vert2.v;
        self.vert2_slope = frame.uv_vert2.u / frame.uv_vert2.v;
        self.fullslope = frame.uv_vert1_u / frame.uv_vert2.v;
        self.uv_vert1_u = frame.uv_vert1_u;
        self.uv_vert2 = frame.uv_vert2;

        let mut displaced = Vec::new();
        let wanted = n_tiles as usize;
        if wanted < self.tiles.len() {
            displaced.extend(self.tiles.drain(wanted..).flatten());
            self.occupied -= displaced.len() as u32;
        } else {
            self.tiles
                .try_reserve_exact(wanted - self.tiles.len())
                .map_err(|_| ResourceError::exhausted("surface grid"))?;
            self.tiles.resize(wanted, None);
        }
        debug_assert_eq!(self.occupied, self.scan_occupied());
        Ok(displaced)
    }

    /// Tiles along each side (`n`).
    pub fn tiles_per_side(&self) -> u32 {
        self.n
    }

    /// Total tiles (`n * n`).
    pub fn tile_count(&self) -> u32 {
        self.n_tiles
    }

    /// Tiles per unit area.
    pub fn binding_factor(&self) -> f64 {
        self.binding_factor
    }

    /// Area of one tile.
    pub fn tile_area(&self) -> f64 {
        1.0 / self.binding_factor
    }

    /// Number of occupied tiles, as tracked incrementally.
    pub fn occupied_count(&self) -> u32 {
        self.occupied
    }

    /// Number of occupied tiles, by full scan.
    pub fn scan_occupied(&self) -> u32 {
        self.tiles.iter().filter(|t| t.is_some()).count() as u32
    }

    /// Whether every tile is occupied.
    pub fn is_full(&self) -> bool {
        self.occupied == self.n_tiles
    }

    /// The molecule on `tile`, if any.
    pub fn occupant(&self, tile: TileIndex) -> Option<MoleculeId> {
        self.tiles.get(tile.index()).copied().flatten()
    }

    /// Put `molecule` on an empty tile.
    pub fn place(&mut self, tile: TileIndex, molecule: MoleculeId) -> Result<(), GeometryError> {
        let tiles = self.n_tiles;
        let slot = self
            .tiles
            .get_mut(tile.index())
            .ok_or(GeometryError::TileOutOfRange { tile, tiles })?;
        if let Some(occupant) = *slot {
            return Err(GeometryError::TileOccupied { tile, occupant });
        }
        *slot = Some(molecule);
        self.occupied += 1;
        Ok(())
    }

    /// Empty `tile`, returning its former occupant.
    pub fn clear(&mut self, tile: TileIndex) -> Option<MoleculeId> {
        let prev = self.tiles.get_mut(tile.index())?.take();
        if prev.is_some() {
            self.occupied -= 1;
        }
        prev
    }

    /// Remove every occupant.
    pub fn clear_all(&mut self) {
        self.tiles.iter_mut().for_each(|t| *t = None);
        self.occupied = 0;
    }

    /// Occupied tiles in index order.
    pub fn occupants(&self) -> impl Iterator<Item = (TileIndex, MoleculeId)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|m| (TileIndex(i as u32), m)))
    }

    /// Empty tiles in index order.
    pub fn vacant_tiles(&self) -> impl Iterator<Item = TileIndex> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_none())
            .map(|(i, _)| TileIndex(i as u32))
    }

    /// Decompose a tile index.
    pub fn coords(&self, tile: TileIndex) -> TileCoord {
        let mut strip = (tile.0 as f64).sqrt() as u32;
        // sqrt may round across an exact square.
        while strip * strip > tile.0 {
            strip -= 1;
        }
        while (strip + 1) * (strip + 1) <= tile.0 {
            strip += 1;
        }
        let rem = tile.0 - strip * strip;
        TileCoord {
            strip,
            stripe: rem / 2,
            flip: rem % 2,
        }
    }

    /// Compose a tile index.
    pub fn index_of(&self, c: TileCoord) -> TileIndex {
        TileIndex(c.strip * c.strip + 2 * c.stripe + c.flip)
    }

    /// The tiles sharing an edge with `tile` inside this grid.
    pub fn neighbor_tiles(&self, tile: TileIndex) -> SmallVec<[TileIndex; 3]> {
        let TileCoord { strip, stripe, flip } = self.coords(tile);
        let mut out = SmallVec::new();
        let at = |strip: u32, stripe: u32, flip: u32| TileIndex(strip * strip + 2 * stripe + flip);
        if flip == 0 {
            if stripe > 0 {
                out.push(at(strip, stripe - 1, 1));
            }
            if stripe < strip {
                out.push(at(strip, stripe, 1));
            }
            if strip + 1 < self.n {
                out.push(at(strip + 1, stripe, 1));
            }
        } else {
            out.push(at(strip, stripe, 0));
            out.push(at(strip, stripe + 1, 0));
            out.push(at(strip - 1, stripe, 0));
        }
        out
    }

    /// The tile containing local coordinates `uv`. Points outside the
    /// triangle map to the nearest tile along their strip.
    pub fn uv_to_tile(&self, uv: Vec2) -> TileIndex {
        let n = self.n as f64;
        let striploc = (uv.v * self.strip_width_rcp).clamp(0.0, n);
        let row = (striploc.floor() as u32).min(self.n - 1);
        let striprem = striploc - row as f64;
        let strip = self.n - row - 1;

        let u0 = uv.v * self.vert2_slope;
        let u1_u0 = self.uv_vert1_u - uv.v * self.fullslope;
        let stripeloc = if u1_u0 > 0.0 {
            ((uv.u - u0) / u1_u0) * (strip as f64 + (1.0 - striprem))
        } else {
            0.0
        };
        let stripeloc = stripeloc.max(0.0);
        let stripe = (stripeloc.floor() as u32).min(strip);
        let striperem = stripeloc - stripe as f64;
        let flip = if stripe == strip || striperem < 1.0 - striprem { 0 } else { 1 };
        TileIndex(strip * strip + 2 * stripe + flip)
    }

    /// Lattice position of a tile: `(j, k, i)` with `k` counted from the
    /// base and `i` the flip.
    fn lattice(&self, tile: TileIndex) -> (f64, f64, f64) {
        let c = self.coords(tile);
        let k = self.n - c.strip - 1;
        (c.stripe as f64, k as f64, c.flip as f64)
    }

    /// Centroid of a tile in local coordinates.
    pub fn tile_center(&self, tile: TileIndex) -> Vec2 {
        let (j, k, i) = self.lattice(tile);
        let over3n = 1.0 / (3.0 * self.n as f64);
        let a = (3.0 * j + i + 1.0) * over3n;
        let b = (3.0 * k + i + 1.0) * over3n;
        Vec2::new(a * self.uv_vert1_u + b * self.uv_vert2.u, b * self.uv_vert2.v)
    }

    /// A point drawn uniformly by area from inside a tile.
    pub fn tile_random_point<R: Rng + ?Sized>(&self, tile: TileIndex, rng: &mut R) -> Vec2 {
        let (j, k, i) = self.lattice(tile);
        let n = self.n as f64;
        let u_ran: f64 = rng.random();
        let v_ran = 1.0 - rng.random::<f64>().sqrt();
        let s = 1.0 - 2.0 * i;
        let a = ((j + i) + s * (1.0 - v_ran) * u_ran) / n;
        let b = ((k + i) + s * v_ran) / n;
        Vec2::new(a * self.uv_vert1_u + b * self.uv_vert2.u, b * self.uv_vert2.v)
    }

    /// Local position for a tile: random within it when an RNG is given,
    /// else its centroid.
    pub fn tile_to_position<R: Rng + ?Sized>(&self, tile: TileIndex, rng: Option<&mut R>) -> Vec2 {
        match rng {
            Some(rng) => self.tile_random_point(tile, rng),
            None => self.tile_center(tile),
        }
    }

    /// The tile under a world position (projected onto the wall).
    pub fn xyz_to_tile(&self, frame: &WallFrame, p: Vec3) -> TileIndex {
        self.uv_to_tile(frame.xyz_to_uv(p))
    }

    /// World position of a tile's centroid.
    pub fn tile_to_xyz(&self, frame: &WallFrame, tile: TileIndex) -> Vec3 {
        frame.uv_to_xyz(self.tile_center(tile))
    }
}
