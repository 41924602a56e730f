//! Integration test: subvolume membership after volume moves.
//!
//! Every live volume molecule must sit inside the domain, in the
//! subvolume that owns its position, and appear in that subvolume's
//! member list exactly once. Moves start on or next to the domain faces
//! and the partition planes, where reflections overshoot by an ulp.

use mote_core::{MoleculeId, SpeciesId, SubvolumeIndex, Vec3};
use mote_engine::{Model, NullHooks, Placement, SpeciesDef, StepOutcome, World};
use mote_test_utils::open_space;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ── Helpers ─────────────────────────────────────────────────────

const A: SpeciesId = SpeciesId(0);

fn empty_world(seed: u64) -> World {
    let mut m = Model::new();
    m.add_species(SpeciesDef::volume("A", 1.0));
    World::new(&m, open_space(seed)).unwrap()
}

fn owning_subvolume(w: &World, id: MoleculeId) -> (Vec3, SubvolumeIndex) {
    match w.molecules().get(id).map(|m| m.placement) {
        Some(Placement::Volume {
            position,
            subvolume,
        }) => (position, subvolume),
        other => panic!("molecule {id} is not a volume molecule: {other:?}"),
    }
}

fn check_membership(w: &World) -> Result<(), TestCaseError> {
    let p = w.partition();
    for mol in w.molecules().iter() {
        let (pos, sv) = owning_subvolume(w, mol.id);
        prop_assert!(p.bounds().contains(pos), "{} escaped to {:?}", mol.id, pos);
        prop_assert_eq!(p.locate(pos, None).unwrap(), sv);
        let hits = p
            .subvolume(sv)
            .molecules()
            .iter()
            .filter(|&&m| m == mol.id)
            .count();
        prop_assert_eq!(hits, 1);
    }
    prop_assert_eq!(p.molecule_count(), w.molecules().len());
    Ok(())
}

/// Coordinates on, just inside, or just off the faces and the plane at 0.
fn near_face() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(-1.0),
        Just(1.0),
        Just(0.0),
        -1.0..-0.999,
        0.999..=1.0,
        -1e-3..1e-3,
        -1.0..=1.0,
    ]
}

fn position() -> impl Strategy<Value = Vec3> {
    (near_face(), near_face(), near_face()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn displacement() -> impl Strategy<Value = Vec3> {
    (-3.0..3.0f64, -3.0..3.0f64, -3.0..3.0f64).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn moves_keep_membership_consistent(
        starts in prop::collection::vec(position(), 1..8),
        moves in prop::collection::vec((any::<prop::sample::Index>(), displacement()), 1..40),
    ) {
        let mut w = empty_world(1);
        let ids: Vec<MoleculeId> = starts
            .iter()
            .map(|&p| w.add_volume_molecule(A, p).unwrap())
            .collect();
        check_membership(&w)?;
        for (pick, disp) in moves {
            let id = ids[pick.index(ids.len())];
            let outcome = w.move_volume_molecule(id, disp, &mut NullHooks).unwrap();
            prop_assert_eq!(outcome, StepOutcome::Moved);
            check_membership(&w)?;
        }
    }
}

// ── Long walks ──────────────────────────────────────────────────

#[test]
fn long_random_walk_never_leaves_the_domain() {
    let mut w = empty_world(2);
    let ids: Vec<MoleculeId> = [
        Vec3::new(-0.98, -0.99, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.5, -1.0, 0.001),
    ]
    .into_iter()
    .map(|p| w.add_volume_molecule(A, p).unwrap())
    .collect();
    let mut rng = ChaCha8Rng::seed_from_u64(20_000);

    for step in 0..20_000usize {
        let id = ids[step % ids.len()];
        let disp = Vec3::new(
            rng.random_range(-2.5..2.5),
            rng.random_range(-2.5..2.5),
            rng.random_range(-2.5..2.5),
        );
        if let Err(e) = w.move_volume_molecule(id, disp, &mut NullHooks) {
            panic!("step {step}: {e}");
        }
    }
    check_membership(&w).unwrap();
}
