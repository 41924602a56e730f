//! Integration test: surface molecules on a folded pair of walls.
//!
//! Surface molecules diffuse across the shared edge while tile
//! occupancy, region counts and species totals stay consistent, and
//! neighboring surface molecules react.

use mote_core::{NotifyLevel, Orientation, PathwayIndex, SpeciesId, TileIndex, WallIndex};
use mote_engine::{
    Model, NullHooks, PathwayDef, Placement, ReactantSpec, RunError, SimConfig, SpeciesDef, World,
};
use mote_geom::ObjectKind;
use mote_test_utils::{folded_pair, RecordingHooks};

// ── Helpers ─────────────────────────────────────────────────────

fn counted_fold() -> mote_geom::ObjectNode {
    let mut node = folded_pair("fold");
    if let ObjectKind::Polygon(mesh) = &mut node.kind {
        for r in &mut mesh.regions {
            r.counted = true;
        }
    }
    node
}

fn occupied(w: &World, wall: u32) -> u32 {
    w.geometry()
        .wall(WallIndex(wall))
        .grid
        .as_ref()
        .map_or(0, |g| g.occupied_count())
}

// ── Diffusion ───────────────────────────────────────────────────

#[test]
fn diffusion_keeps_tiles_and_counts_consistent() {
    let mut m = Model::new();
    let s = m.add_species(SpeciesDef::surface("S", 50.0));
    m.add_object(counted_fold());
    let mut w = World::new(&m, SimConfig { seed: 17, ..SimConfig::default() }).unwrap();
    for tile in 0..5 {
        w.add_surface_molecule(s, WallIndex(0), TileIndex(tile), Orientation::Up)
            .unwrap();
        w.add_surface_molecule(s, WallIndex(1), TileIndex(tile), Orientation::Down)
            .unwrap();
    }

    w.run_iterations(100, &mut NullHooks).unwrap();

    assert_eq!(w.count(s), 10);
    assert_eq!(occupied(&w, 0) + occupied(&w, 1), 10);
    let floor = w.geometry().region_by_name("fold[floor]").unwrap();
    let wall = w.geometry().region_by_name("fold[wall]").unwrap();
    assert_eq!(w.region_count(floor, s), i64::from(occupied(&w, 0)));
    assert_eq!(w.region_count(wall, s), i64::from(occupied(&w, 1)));
    assert!(w.stats().mol_moves_between_walls > 0);

    for mol in w.molecules().iter() {
        let Placement::Surface { wall, tile, .. } = mol.placement else {
            panic!("surface molecule {} left its surface", mol.id);
        };
        let grid = w.geometry().wall(wall).grid.as_ref().unwrap();
        assert_eq!(grid.occupant(tile), Some(mol.id));
    }
}

#[test]
fn occupied_tile_is_refused() {
    let mut m = Model::new();
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    m.add_object(folded_pair("fold"));
    let mut w = World::new(&m, SimConfig::default()).unwrap();
    w.add_surface_molecule(s, WallIndex(0), TileIndex(0), Orientation::Up)
        .unwrap();
    let err = w
        .add_surface_molecule(s, WallIndex(0), TileIndex(0), Orientation::Up)
        .unwrap_err();
    assert!(matches!(err, RunError::TileUnavailable { .. }), "{err}");
}

#[test]
fn volume_species_cannot_be_bound() {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 1.0));
    m.add_object(folded_pair("fold"));
    let mut w = World::new(&m, SimConfig::default()).unwrap();
    let err = w
        .add_surface_molecule(a, WallIndex(0), TileIndex(0), Orientation::Up)
        .unwrap_err();
    assert!(matches!(err, RunError::WrongSpeciesKind { .. }), "{err}");
}

#[test]
fn randomized_placement_stays_inside_its_tile() {
    let mut m = Model::new();
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    m.add_object(folded_pair("fold"));
    let config = SimConfig {
        randomize_surface_positions: true,
        ..SimConfig::default()
    };
    let mut w = World::new(&m, config).unwrap();
    let floor = WallIndex(0);
    let ids: Vec<_> = (0..9)
        .map(|t| {
            w.add_surface_molecule(s, floor, TileIndex(t), Orientation::Up)
                .unwrap()
        })
        .collect();

    let wall = w.geometry().wall(floor);
    let grid = wall.grid.as_ref().unwrap();
    let mut off_center = 0;
    for (t, &id) in ids.iter().enumerate() {
        let p = w.molecule_position(id).unwrap();
        assert_eq!(grid.xyz_to_tile(&wall.frame, p), TileIndex(t as u32));
        if (p - grid.tile_to_xyz(&wall.frame, TileIndex(t as u32))).length() > 1e-9 {
            off_center += 1;
        }
    }
    assert!(off_center > 0, "every molecule sits on its tile centroid");
}

// ── Reactions ───────────────────────────────────────────────────

#[test]
fn neighbors_react_into_a_surface_product() {
    let mut m = Model::new();
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    let t = m.add_species(SpeciesDef::surface("T", 0.0));
    let p = m.add_species(SpeciesDef::surface("P", 0.0));
    m.add_pathway(PathwayDef::new(
        "dimerize",
        vec![ReactantSpec::plain(s), ReactantSpec::plain(t)],
        vec![ReactantSpec::plain(p)],
        1e6,
    ));
    m.add_object(folded_pair("fold"));
    let mut config = SimConfig::default();
    config.notifications.high_reaction_probability = NotifyLevel::Cope;
    let mut w = World::new(&m, config).unwrap();

    let floor = WallIndex(0);
    w.add_surface_molecule(s, floor, TileIndex(0), Orientation::Up)
        .unwrap();
    let next = w.geometry().wall(floor).grid.as_ref().unwrap().neighbor_tiles(TileIndex(0))[0];
    w.add_surface_molecule(t, floor, next, Orientation::Up)
        .unwrap();

    w.run_iterations(50, &mut NullHooks).unwrap();

    assert_eq!(w.count(s), 0);
    assert_eq!(w.count(t), 0);
    assert_eq!(w.count(p), 1);
    assert_eq!(w.counters().reaction_count(PathwayIndex(0)), 1);
    assert_eq!(occupied(&w, 0), 1);
}

#[test]
fn separated_molecules_do_not_react() {
    let mut m = Model::new();
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    let t = m.add_species(SpeciesDef::surface("T", 0.0));
    m.add_pathway(PathwayDef::new(
        "dimerize",
        vec![ReactantSpec::plain(s), ReactantSpec::plain(t)],
        vec![],
        1e6,
    ));
    m.add_object(folded_pair("fold"));
    let mut config = SimConfig::default();
    config.notifications.high_reaction_probability = NotifyLevel::Cope;
    let mut w = World::new(&m, config).unwrap();
    w.add_surface_molecule(s, WallIndex(0), TileIndex(0), Orientation::Up)
        .unwrap();
    w.add_surface_molecule(t, WallIndex(1), TileIndex(0), Orientation::Up)
        .unwrap();

    w.run_iterations(20, &mut NullHooks).unwrap();

    assert_eq!(w.count(SpeciesId(0)), 1);
    assert_eq!(w.count(SpeciesId(1)), 1);
}

#[test]
fn surface_reaction_is_reported_at_the_initiator() {
    let mut m = Model::new();
    let s = m.add_species(SpeciesDef::surface("S", 0.0));
    let t = m.add_species(SpeciesDef::surface("T", 0.0));
    m.add_pathway(PathwayDef::new(
        "dimerize",
        vec![ReactantSpec::plain(s), ReactantSpec::plain(t)],
        vec![],
        1e6,
    ));
    m.add_object(folded_pair("fold"));
    let mut config = SimConfig {
        randomize_surface_positions: true,
        ..SimConfig::default()
    };
    config.notifications.high_reaction_probability = NotifyLevel::Cope;
    let mut w = World::new(&m, config).unwrap();
    let floor = WallIndex(0);
    let ms = w
        .add_surface_molecule(s, floor, TileIndex(0), Orientation::Up)
        .unwrap();
    let next = w.geometry().wall(floor).grid.as_ref().unwrap().neighbor_tiles(TileIndex(0))[0];
    let mt = w.add_surface_molecule(t, floor, next, Orientation::Up).unwrap();
    let placed = [
        (ms, w.molecule_position(ms).unwrap()),
        (mt, w.molecule_position(mt).unwrap()),
    ];
    let mut hooks = RecordingHooks::new();

    w.run_iterations(50, &mut hooks).unwrap();

    assert_eq!(hooks.reactions.len(), 1);
    let report = &hooks.reactions[0];
    let (_, at) = placed
        .iter()
        .find(|(id, _)| *id == report.reactants[0])
        .unwrap();
    assert!((report.position - *at).length() < 1e-12, "{:?} vs {at:?}", report.position);
}
