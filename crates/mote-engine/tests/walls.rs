//! Integration test: volume molecules meeting walls.
//!
//! A molecule inside the unit box is pushed through its top face with
//! an explicit displacement. Depending on the surface class the face
//! reflects, passes or absorbs it, and region counts and hit reports
//! must follow.

use mote_core::{NotifyLevel, Orientation, SpeciesId, TileIndex, Vec3, WallIndex};
use mote_engine::{
    Model, NullHooks, PathwayDef, Permeability, ReactantSpec, RunError, SimConfig, SpeciesDef,
    StepOutcome, World,
};
use mote_test_utils::{counted_box, unit_box, RecordingHooks, BOX_MAX, BOX_MIN};

// ── Helpers ─────────────────────────────────────────────────────

const START: Vec3 = Vec3::new(0.1, 0.2, 0.5);
const PUSH: Vec3 = Vec3::new(0.0, 0.0, 0.8);

fn boxed_world(permeability: Option<Permeability>) -> (World, SpeciesId) {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 0.0));
    let class = permeability.map(|p| m.add_species(SpeciesDef::surface_class("membrane", p)));
    m.add_object(counted_box("box", class));
    (World::new(&m, SimConfig::default()).unwrap(), a)
}

fn region_total(w: &World, a: SpeciesId) -> i64 {
    let r = w.geometry().region_by_name("box[walls]").unwrap();
    w.region_count(r, a)
}

// ── Tests ───────────────────────────────────────────────────────

#[test]
fn reflective_face_mirrors_the_overshoot() {
    let (mut w, a) = boxed_world(None);
    let id = w.add_volume_molecule(a, START).unwrap();
    let mut hooks = RecordingHooks::new();

    let outcome = w.move_volume_molecule(id, PUSH, &mut hooks).unwrap();

    assert_eq!(outcome, StepOutcome::Moved);
    let p = w.molecule_position(id).unwrap();
    assert!((p.z - 0.7).abs() < 1e-9, "z = {}", p.z);
    assert!((p.x - START.x).abs() < 1e-12);
    assert!((p.y - START.y).abs() < 1e-12);
    assert_eq!(region_total(&w, a), 1);

    assert_eq!(hooks.wall_hits.len(), 1);
    let hit = hooks.wall_hits[0];
    assert_eq!(hit.molecule, id);
    assert!((hit.position.z - BOX_MAX.z).abs() < 1e-9);
}

#[test]
fn transparent_face_lets_the_molecule_out() {
    let (mut w, a) = boxed_world(Some(Permeability::Transparent));
    let id = w.add_volume_molecule(a, START).unwrap();
    assert_eq!(region_total(&w, a), 1);

    w.move_volume_molecule(id, PUSH, &mut NullHooks).unwrap();

    let p = w.molecule_position(id).unwrap();
    assert!((p.z - 1.3).abs() < 1e-9, "z = {}", p.z);
    assert_eq!(region_total(&w, a), 0);
    assert_eq!(w.count(a), 1);
}

#[test]
fn transparent_face_counts_molecules_coming_in() {
    let (mut w, a) = boxed_world(Some(Permeability::Transparent));
    let id = w
        .add_volume_molecule(a, Vec3::new(0.1, 0.2, 1.3))
        .unwrap();
    assert_eq!(region_total(&w, a), 0);

    w.move_volume_molecule(id, -PUSH, &mut NullHooks).unwrap();

    assert_eq!(region_total(&w, a), 1);
}

#[test]
fn absorptive_face_removes_the_molecule() {
    let (mut w, a) = boxed_world(Some(Permeability::Absorptive));
    let id = w.add_volume_molecule(a, START).unwrap();

    let outcome = w.move_volume_molecule(id, PUSH, &mut NullHooks).unwrap();

    assert_eq!(outcome, StepOutcome::Absorbed);
    assert!(w.molecule_position(id).is_none());
    assert_eq!(w.count(a), 0);
    assert_eq!(region_total(&w, a), 0);
}

#[test]
fn partition_boundary_reflects_without_walls() {
    let (mut w, a) = boxed_world(None);
    // Outside the box, heading for the partition's upper z bound at 2.0.
    let id = w
        .add_volume_molecule(a, Vec3::new(0.1, 0.2, 1.5))
        .unwrap();

    w.move_volume_molecule(id, Vec3::new(0.0, 0.0, 1.0), &mut NullHooks)
        .unwrap();

    let p = w.molecule_position(id).unwrap();
    assert!(p.z <= w.partition().bounds().max.z);
    assert!((p.z - 1.5).abs() < 1e-9, "z = {}", p.z);
}

#[test]
fn wall_reaction_binds_volume_molecule_to_the_surface() {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 1.0));
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    let class = m.add_species(SpeciesDef::surface_class("sticky", Permeability::Reflective));
    m.add_pathway(PathwayDef::new(
        "stick",
        vec![ReactantSpec::plain(a), ReactantSpec::plain(class)],
        vec![ReactantSpec::plain(s)],
        1e6,
    ));
    m.add_object(counted_box("box", Some(class)));
    let mut config = SimConfig::default();
    config.notifications.high_reaction_probability = NotifyLevel::Warn;
    let mut w = World::new(&m, config).unwrap();
    let id = w.add_volume_molecule(a, START).unwrap();
    let mut hooks = RecordingHooks::new();

    let outcome = w.move_volume_molecule(id, PUSH, &mut hooks).unwrap();

    assert_eq!(outcome, StepOutcome::Reacted);
    assert_eq!(w.count(a), 0);
    assert_eq!(w.count(s), 1);
    assert_eq!(hooks.reactions.len(), 1);
    let product = hooks.reactions[0].products[0];
    let p = w.molecule_position(product).unwrap();
    assert!((p.z - BOX_MAX.z).abs() < 1e-9, "bound at z = {}", p.z);
    assert!(p.x >= BOX_MIN.x && p.x <= BOX_MAX.x);
}

#[test]
fn molecules_outside_bounds_are_rejected() {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 0.0));
    m.add_object(unit_box("box"));
    let mut w = World::new(&m, SimConfig::default()).unwrap();
    assert!(w.add_volume_molecule(a, Vec3::new(10.0, 0.0, 0.0)).is_err());
    assert_eq!(w.count(a), 0);
}

// ── Tile-scaled probabilities ───────────────────────────────────

/// `A + S -> 0` with a per-tile probability of about 0.75. Every wall of
/// the unit box is a half-unit triangle with one tile, so a hit divides
/// the probability by 0.5 and the scaled class passes one.
fn tiled_box_world(policy: NotifyLevel) -> (World, SpeciesId) {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 1.0));
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    m.add_pathway(PathwayDef::new(
        "consume",
        vec![ReactantSpec::plain(a), ReactantSpec::plain(s)],
        vec![],
        5.1e7,
    ));
    m.add_object(unit_box("box"));
    let mut config = SimConfig::default();
    config.notifications.high_reaction_probability = policy;
    let mut w = World::new(&m, config).unwrap();
    for wall in 0..w.geometry().walls().len() {
        w.add_surface_molecule(s, WallIndex(wall as u32), TileIndex(0), Orientation::Up)
            .unwrap();
    }
    (w, a)
}

#[test]
fn tile_scaled_overflow_stops_the_run_under_error() {
    let (mut w, a) = tiled_box_world(NotifyLevel::Error);
    let class = w.reactions().find(&[a, SpeciesId(1)]).unwrap();
    let p = w.reactions().class(class).max_fixed_p;
    assert!(p > 0.5 && p < 1.0, "per-tile p = {p}");
    let id = w.add_volume_molecule(a, START).unwrap();

    let err = w.move_volume_molecule(id, PUSH, &mut NullHooks).unwrap_err();

    assert!(matches!(err, RunError::ProbabilityOverflow { total, .. } if total > 1.0), "{err}");
    assert_eq!(w.stats().probability_overflows, 1);
}

#[test]
fn tile_scaled_overflow_is_normalized_under_warn() {
    let (mut w, a) = tiled_box_world(NotifyLevel::Warn);
    let id = w.add_volume_molecule(a, START).unwrap();

    let outcome = w.move_volume_molecule(id, PUSH, &mut NullHooks).unwrap();

    assert_eq!(outcome, StepOutcome::Reacted);
    assert_eq!(w.count(a), 0);
    assert_eq!(w.count(SpeciesId(1)), 11);
    assert_eq!(w.stats().probability_overflows, 1);
}
