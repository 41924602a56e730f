//! Molecule storage.
//!
//! [`MoleculeStore`] is a slab of molecule slots with a free list and a
//! separate id → slot table. Molecule ids are handed out monotonically and
//! never reused, so a stale id held by a calendar event or a partner list
//! simply fails to resolve. [`MoleculeStore::defragment`] compacts the slab
//! without changing any id.

use mote_core::{
    MoleculeId, Orientation, ResourceError, SpeciesId, SubvolumeIndex, TileIndex, Vec2, Vec3,
    WallIndex,
};

// ── Flags ──────────────────────────────────────────────────────────

/// Per-molecule state bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MoleculeFlags(u8);

impl MoleculeFlags {
    /// Created during the current iteration.
    pub const NEWLY_CREATED: Self = Self(1);
    /// Has a pending diffusion event.
    pub const SCHEDULED: Self = Self(1 << 1);
    /// Claimed by a reaction that is being applied.
    pub const MARKED_FOR_REACTION: Self = Self(1 << 2);

    /// No bits set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Rebuild from raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

// ── Molecule ───────────────────────────────────────────────────────

/// Where a molecule is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Free in volume.
    Volume {
        /// Position in internal units.
        position: Vec3,
        /// The subvolume whose membership list holds this molecule.
        subvolume: SubvolumeIndex,
    },
    /// Bound to a surface tile.
    Surface {
        /// The wall.
        wall: WallIndex,
        /// The occupied tile of the wall's grid.
        tile: TileIndex,
        /// Position in the wall's 2-D frame.
        uv: Vec2,
        /// Facing relative to the wall normal.
        orientation: Orientation,
    },
}

impl Placement {
    /// Whether this is a volume placement.
    pub fn is_volume(&self) -> bool {
        matches!(self, Self::Volume { .. })
    }
}

/// A simulated particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Molecule {
    /// Stable identity.
    pub id: MoleculeId,
    /// Species.
    pub species: SpeciesId,
    /// Volume or surface location.
    pub placement: Placement,
    /// State bits.
    pub flags: MoleculeFlags,
    /// Time of the pending diffusion event, if [`MoleculeFlags::SCHEDULED`].
    pub next_time: f64,
    /// Time of the pending unimolecular firing.
    pub unimol_time: Option<f64>,
    /// Creation time.
    pub birth_time: f64,
}

// ── MoleculeStore ──────────────────────────────────────────────────

const DEAD: u32 = u32::MAX;

/// Slab of live molecules addressed by [`MoleculeId`].
#[derive(Clone, Debug, Default)]
pub struct MoleculeStore {
    slots: Vec<Option<Molecule>>,
    /// id → slot, `DEAD` once removed.
    index: Vec<u32>,
    free: Vec<u32>,
    next_id: u64,
    live: usize,
}

impl MoleculeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live molecules.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether there are no live molecules.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The id the next inserted molecule will get.
    pub fn next_id(&self) -> MoleculeId {
        MoleculeId(self.next_id)
    }

    /// Add a molecule and return its id.
    pub fn insert(
        &mut self,
        species: SpeciesId,
        placement: Placement,
        time: f64,
    ) -> Result<MoleculeId, ResourceError> {
        self.index
            .try_reserve(1)
            .map_err(|_| ResourceError::exhausted("molecule id table"))?;
        let id = MoleculeId(self.next_id);
        let molecule = Molecule {
            id,
            species,
            placement,
            flags: MoleculeFlags::NEWLY_CREATED,
            next_time: time,
            unimol_time: None,
            birth_time: time,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(molecule);
                slot
            }
            None => {
                self.slots
                    .try_reserve(1)
                    .map_err(|_| ResourceError::exhausted("molecule slots"))?;
                self.slots.push(Some(molecule));
                (self.slots.len() - 1) as u32
            }
        };
        self.index.push(slot);
        self.next_id += 1;
        self.live += 1;
        Ok(id)
    }

    fn slot_of(&self, id: MoleculeId) -> Option<usize> {
        let slot = *self.index.get(id.index())?;
        (slot != DEAD).then_some(slot as usize)
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: MoleculeId) -> bool {
        self.slot_of(id).is_some()
    }

    /// Look up a live molecule.
    pub fn get(&self, id: MoleculeId) -> Option<&Molecule> {
        self.slots[self.slot_of(id)?].as_ref()
    }

    /// Look up a live molecule mutably.
    pub fn get_mut(&mut self, id: MoleculeId) -> Option<&mut Molecule> {
        let slot = self.slot_of(id)?;
        self.slots[slot].as_mut()
    }

    /// Remove a molecule. Returns it if it was live.
    pub fn remove(&mut self, id: MoleculeId) -> Option<Molecule> {
        let slot = self.slot_of(id)?;
        let m = self.slots[slot].take();
        debug_assert!(m.is_some(), "id table points at an empty slot");
        self.index[id.index()] = DEAD;
        self.free.push(slot as u32);
        self.live -= 1;
        m
    }

    /// Live molecules in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Molecule> + '_ {
        self.slots.iter().flatten()
    }

    /// Live molecules in id order.
    pub fn iter_by_id(&self) -> impl Iterator<Item = &Molecule> + '_ {
        self.index
            .iter()
            .filter(|&&s| s != DEAD)
            .filter_map(|&s| self.slots[s as usize].as_ref())
    }

    /// Compact the slab so live molecules occupy the first `len()` slots.
    ///
    /// Returns the number of slots reclaimed. Ids are unchanged.
    pub fn defragment(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(Option::is_some);
        self.free.clear();
        for (slot, m) in self.slots.iter().enumerate() {
            if let Some(m) = m {
                self.index[m.id.index()] = slot as u32;
            }
        }
        debug_assert_eq!(self.slots.len(), self.live);
        before - self.slots.len()
    }

    /// Replace the contents with `molecules` and continue ids at `next_id`.
    pub fn restore(&mut self, molecules: &[Molecule], next_id: MoleculeId) -> Result<(), ResourceError> {
        let table = usize::try_from(next_id.0).map_err(|_| ResourceError::exhausted("molecule id table"))?;
        let mut slots = Vec::new();
        slots
            .try_reserve(molecules.len())
            .map_err(|_| ResourceError::exhausted("molecule slots"))?;
        let mut index = Vec::new();
        index
            .try_reserve(table)
            .map_err(|_| ResourceError::exhausted("molecule id table"))?;
        index.resize(table, DEAD);
        for m in molecules {
            debug_assert!(m.id.0 < next_id.0, "restored molecule id beyond next_id");
            index[m.id.index()] = slots.len() as u32;
            slots.push(Some(m.clone()));
        }
        self.slots = slots;
        self.index = index;
        self.free.clear();
        self.next_id = next_id.0;
        self.live = molecules.len();
        Ok(())
    }
}
