//! Integration test: release programs driven by the run loop.
//!
//! Release trains must stop after their last train, region releases must
//! convert concentrations and densities into molecule counts, and
//! surface releases must respect tile capacity.

use mote_core::{SpeciesId, Vec3};
use mote_engine::{
    Model, NullHooks, ReleasePattern, ReleaseProgram, ReleaseQuantity, ReleaseShape, SimConfig,
    SpeciesDef, World,
};
use mote_test_utils::{open_space, unit_box, RecordingHooks, BOX_MAX, BOX_MIN};

// ── Helpers ─────────────────────────────────────────────────────

fn boxed_model() -> (Model, SpeciesId, SpeciesId) {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 0.0));
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    m.add_object(unit_box("box"));
    (m, a, s)
}

fn region_release(species: SpeciesId, quantity: ReleaseQuantity) -> ReleaseProgram {
    ReleaseProgram {
        shape: ReleaseShape::Region(vec!["box[ALL]".to_string()]),
        quantity,
        ..ReleaseProgram::point("fill", species, Vec3::ZERO, 0)
    }
}

fn inside_box(p: Vec3) -> bool {
    (BOX_MIN.x..=BOX_MAX.x).contains(&p.x)
        && (BOX_MIN.y..=BOX_MAX.y).contains(&p.y)
        && (BOX_MIN.z..=BOX_MAX.z).contains(&p.z)
}

// ── Patterns ────────────────────────────────────────────────────

#[test]
fn two_trains_release_twice_per_train() {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 0.0));
    let pattern = ReleasePattern {
        delay: 0.0,
        release_interval: 5e-6,
        train_duration: 1e-5,
        train_interval: 1e-4,
        number_of_trains: 2,
    };
    m.add_release(ReleaseProgram::point("pulse", a, Vec3::ZERO, 10).with_pattern(pattern));
    let mut w = World::new(&m, open_space(1)).unwrap();

    w.run_iterations(50, &mut NullHooks).unwrap();
    // First train: t = 0 and t = 5 µs. Nothing at 10 µs, where the train ends.
    assert_eq!(w.count(a), 20);
    assert!(!w.release_states()[0].exhausted);

    w.run_iterations(150, &mut NullHooks).unwrap();
    assert_eq!(w.count(a), 40);
    assert!(w.release_states()[0].exhausted);
    assert_eq!(w.stats().molecules_released, 40);

    w.run_iterations(100, &mut NullHooks).unwrap();
    assert_eq!(w.count(a), 40);
}

#[test]
fn delayed_release_waits_for_its_iteration() {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 0.0));
    let pattern = ReleasePattern {
        delay: 5.5e-6,
        ..ReleasePattern::default()
    };
    m.add_release(ReleaseProgram::point("late", a, Vec3::ZERO, 3).with_pattern(pattern));
    let mut w = World::new(&m, open_space(1)).unwrap();
    let mut hooks = RecordingHooks::new();

    w.run_iterations(10, &mut hooks).unwrap();

    let totals: Vec<i64> = hooks.iterations.iter().map(|r| r.species_totals[0]).collect();
    assert_eq!(&totals[..5], &[0, 0, 0, 0, 0]);
    assert_eq!(&totals[5..], &[3, 3, 3, 3, 3]);
}

// ── Regions ─────────────────────────────────────────────────────

#[test]
fn concentration_fills_the_enclosed_volume() {
    let (mut m, a, _) = boxed_model();
    // 0.1 M in one cubic internal unit (1e-6 µm³) is about 60 molecules.
    m.add_release(region_release(a, ReleaseQuantity::Concentration(0.1)));
    let mut w = World::new(&m, SimConfig::default()).unwrap();

    w.run_iterations(1, &mut NullHooks).unwrap();

    assert_eq!(w.count(a), 60);
    for mol in w.molecules().iter() {
        let p = w.molecule_position(mol.id).unwrap();
        assert!(inside_box(p), "released outside the box at {p:?}");
    }
}

#[test]
fn density_places_molecules_on_region_walls() {
    let (mut m, _, s) = boxed_model();
    // Six faces of one square unit each: 6e-4 µm².
    m.add_release(region_release(s, ReleaseQuantity::Density(1e4)));
    let mut w = World::new(&m, SimConfig::default()).unwrap();

    w.run_iterations(1, &mut NullHooks).unwrap();

    assert_eq!(w.count(s), 6);
    let occupied: u32 = w
        .geometry()
        .walls()
        .iter()
        .filter_map(|wall| wall.grid.as_ref())
        .map(|g| g.occupied_count())
        .sum();
    assert_eq!(occupied, 6);
}

#[test]
fn surface_release_stops_when_tiles_run_out() {
    let (mut m, _, s) = boxed_model();
    m.add_release(region_release(s, ReleaseQuantity::Density(1e5)));
    let mut w = World::new(&m, SimConfig::default()).unwrap();

    w.run_iterations(1, &mut NullHooks).unwrap();

    // Twelve triangles of half a square unit: one tile each.
    assert_eq!(w.count(s), 12);
    assert!(w
        .geometry()
        .walls()
        .iter()
        .all(|wall| wall.grid.as_ref().is_some_and(|g| g.is_full())));
}

#[test]
fn sphere_release_stays_within_its_diameter() {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 0.0));
    let center = Vec3::new(0.2, -0.1, 0.3);
    m.add_release(ReleaseProgram {
        shape: ReleaseShape::Sphere {
            center,
            diameter: Vec3::new(0.5, 0.5, 0.5),
        },
        ..ReleaseProgram::point("ball", a, Vec3::ZERO, 200)
    });
    let mut w = World::new(&m, open_space(9)).unwrap();

    w.run_iterations(1, &mut NullHooks).unwrap();

    assert_eq!(w.count(a), 200);
    for mol in w.molecules().iter() {
        let p = w.molecule_position(mol.id).unwrap();
        assert!((p - center).length() <= 0.25 + 1e-12);
    }
}

#[test]
fn unknown_region_is_a_model_error() {
    let (mut m, a, _) = boxed_model();
    m.add_release(ReleaseProgram {
        shape: ReleaseShape::Region(vec!["box[nowhere]".to_string()]),
        ..ReleaseProgram::point("lost", a, Vec3::ZERO, 1)
    });
    assert!(World::new(&m, SimConfig::default()).is_err());
}
