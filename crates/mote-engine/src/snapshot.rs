//! Checkpoint snapshots and state hashing.
//!
//! A [`Snapshot`] holds the entire mutable state of a world: molecules,
//! calendar contents, release progress, counters, statistics, the RNG and
//! vertex positions. Subvolume membership and grid occupancy are derived
//! from the molecule table on restore, so they are not stored.
//!
//! [`Snapshot::state_hash`] folds that state into an FNV-1a digest. These
//! hashes are not cryptographically secure; they are used for fast
//! determinism checks.

use mote_core::{MoleculeId, Vec2, Vec3};
use rand_chacha::ChaCha8Rng;

use crate::calendar::{EventKind, ScheduledEvent};
use crate::counter::Counters;
use crate::metrics::SimulationStats;
use crate::molecule::{Molecule, Placement};
use crate::release::ReleaseState;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed a single byte into an FNV-1a hash state.
#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// Feed a u32 (as 4 LE bytes) into an FNV-1a hash state.
#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Feed a u64 (as 8 LE bytes) into an FNV-1a hash state.
#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

fn fnv1a_f64(hash: u64, v: f64) -> u64 {
    fnv1a_u64(hash, v.to_bits())
}

fn fnv1a_vec3(hash: u64, v: Vec3) -> u64 {
    v.to_bits().iter().fold(hash, |h, &b| fnv1a_u64(h, b))
}

fn fnv1a_vec2(hash: u64, v: Vec2) -> u64 {
    v.to_bits().iter().fold(hash, |h, &b| fnv1a_u64(h, b))
}

/// Full mutable state of a [`World`](crate::World) at an event boundary.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Simulated time.
    pub time: f64,
    /// Completed iterations.
    pub iteration: u64,
    /// Live molecules in id order.
    pub molecules: Vec<Molecule>,
    /// Id the next molecule would get.
    pub next_molecule_id: MoleculeId,
    /// Pending events in pop order.
    pub events: Vec<ScheduledEvent>,
    /// Calendar sequence counter.
    pub next_event_seq: u64,
    /// Progress of each release program.
    pub releases: Vec<ReleaseState>,
    /// Counters.
    pub counters: Counters,
    /// Statistics.
    pub stats: SimulationStats,
    /// The random stream, mid-sequence.
    pub rng: ChaCha8Rng,
    /// Vertex positions, which may have been moved during the run.
    pub vertices: Vec<Vec3>,
}

impl Snapshot {
    /// FNV-1a digest of the simulation state.
    ///
    /// Covers time, iteration, molecules, calendar contents, release
    /// progress, species and reaction counters, the RNG position and the
    /// vertices. Statistics are excluded.
    pub fn state_hash(&self) -> u64 {
        let mut h = FNV_OFFSET;
        h = fnv1a_f64(h, self.time);
        h = fnv1a_u64(h, self.iteration);
        h = fnv1a_u64(h, self.next_molecule_id.0);
        for m in &self.molecules {
            h = fnv1a_u64(h, m.id.0);
            h = fnv1a_u32(h, m.species.0);
            h = match m.placement {
                Placement::Volume {
                    position,
                    subvolume,
                } => fnv1a_u32(fnv1a_vec3(fnv1a_byte(h, 0), position), subvolume.0),
                Placement::Surface {
                    wall,
                    tile,
                    uv,
                    orientation,
                } => {
                    let h = fnv1a_u32(fnv1a_u32(fnv1a_byte(h, 1), wall.0), tile.0);
                    fnv1a_byte(fnv1a_vec2(h, uv), orientation.sign() as u8)
                }
            };
            h = fnv1a_byte(h, m.flags.bits());
            h = fnv1a_f64(h, m.next_time);
            h = fnv1a_f64(h, m.unimol_time.unwrap_or(f64::NAN));
        }
        h = fnv1a_u64(h, self.next_event_seq);
        for ev in &self.events {
            h = fnv1a_f64(h, ev.time);
            h = fnv1a_u64(h, ev.seq);
            h = match ev.kind {
                EventKind::Diffuse(id) => fnv1a_u64(fnv1a_byte(h, 0), id.0),
                EventKind::Unimolecular(id) => fnv1a_u64(fnv1a_byte(h, 1), id.0),
                EventKind::Release(r) => fnv1a_u32(fnv1a_byte(h, 2), r.0),
                EventKind::PeriodicOutput => fnv1a_byte(h, 3),
            };
        }
        for r in &self.releases {
            h = fnv1a_f64(h, r.next_time);
            h = fnv1a_f64(h, r.train_start);
            h = fnv1a_u32(h, r.train);
            h = fnv1a_u64(h, r.released);
            h = fnv1a_byte(h, u8::from(r.exhausted));
        }
        for &c in self.counters.species_totals() {
            h = fnv1a_u64(h, c as u64);
        }
        for &c in self.counters.reaction_totals() {
            h = fnv1a_u64(h, c);
        }
        for ((r, s), c) in self.counters.region_counts() {
            h = fnv1a_u64(fnv1a_u32(fnv1a_u32(h, r.0), s.0), c as u64);
        }
        let word = self.rng.get_word_pos();
        h = fnv1a_u64(h, word as u64);
        h = fnv1a_u64(h, (word >> 64) as u64);
        for &v in &self.vertices {
            h = fnv1a_vec3(h, v);
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mote_core::{SpeciesId, SubvolumeIndex};
    use rand::{Rng, SeedableRng};

    use crate::molecule::MoleculeFlags;

    fn snapshot() -> Snapshot {
        Snapshot {
            time: 1e-6,
            iteration: 1,
            molecules: vec![Molecule {
                id: MoleculeId(0),
                species: SpeciesId(0),
                placement: Placement::Volume {
                    position: Vec3::new(0.1, 0.2, 0.3),
                    subvolume: SubvolumeIndex(0),
                },
                flags: MoleculeFlags::SCHEDULED,
                next_time: 2e-6,
                unimol_time: None,
                birth_time: 0.0,
            }],
            next_molecule_id: MoleculeId(1),
            events: vec![ScheduledEvent {
                time: 2e-6,
                seq: 4,
                kind: EventKind::Diffuse(MoleculeId(0)),
            }],
            next_event_seq: 5,
            releases: Vec::new(),
            counters: Counters::new(1, 0),
            stats: SimulationStats::default(),
            rng: ChaCha8Rng::seed_from_u64(9),
            vertices: Vec::new(),
        }
    }

    #[test]
    fn hash_is_stable_for_clones() {
        let s = snapshot();
        assert_eq!(s.state_hash(), s.clone().state_hash());
    }

    #[test]
    fn hash_sees_positions() {
        let s = snapshot();
        let mut t = s.clone();
        if let Placement::Volume { position, .. } = &mut t.molecules[0].placement {
            position.x += 1e-12;
        }
        assert_ne!(s.state_hash(), t.state_hash());
    }

    #[test]
    fn hash_sees_rng_position() {
        let s = snapshot();
        let mut t = s.clone();
        let _: u64 = t.rng.random();
        assert_ne!(s.state_hash(), t.state_hash());
    }

    #[test]
    fn hash_ignores_stats() {
        let s = snapshot();
        let mut t = s.clone();
        t.stats.events_processed = 99;
        assert_eq!(s.state_hash(), t.state_hash());
    }
}
