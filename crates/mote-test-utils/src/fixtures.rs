//! Reusable geometries, models and configurations.
//!
//! - [`unit_box`]: the box `[-0.5, 0.5] x [-0.5, 0.5] x [0, 1]` with
//!   outward normals and an `ALL` region.
//! - [`folded_pair`]: two triangles sharing an edge at a right angle.
//! - [`open_space`]: a configuration with explicit bounds and no walls.

use mote_core::{Aabb, SpeciesId, Vec3};
use mote_engine::{
    Model, PathwayDef, ReactantSpec, SimConfig, SpeciesDef, SubvolumeLayout,
};
use mote_geom::{BoxSpec, ObjectNode, PolygonMesh, RegionDef};

/// Lower corner of [`unit_box`].
pub const BOX_MIN: Vec3 = Vec3::new(-0.5, -0.5, 0.0);
/// Upper corner of [`unit_box`].
pub const BOX_MAX: Vec3 = Vec3::new(0.5, 0.5, 1.0);

/// A closed box object named `name`.
pub fn unit_box(name: &str) -> ObjectNode {
    ObjectNode::cuboid(name, BoxSpec::new(BOX_MIN, BOX_MAX))
}

/// A closed box whose `ALL` region is counted and reports hits.
pub fn counted_box(name: &str, surface_class: Option<SpeciesId>) -> ObjectNode {
    let mut spec = BoxSpec::new(BOX_MIN, BOX_MAX);
    let mut region = RegionDef::new("walls", (0..12).collect());
    region.counted = true;
    region.report_hits = true;
    region.surface_class = surface_class;
    spec.regions.push(region);
    ObjectNode::cuboid(name, spec)
}

/// Two right triangles meeting along the x axis: one in the `z = 0`
/// plane, the other folded up into `y = 0`.
pub fn folded_pair(name: &str) -> ObjectNode {
    let mesh = PolygonMesh {
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        ],
        triangles: vec![[0, 1, 2], [1, 0, 3]],
        regions: vec![RegionDef::new("floor", vec![0]), RegionDef::new("wall", vec![1])],
    };
    ObjectNode::polygon(name, mesh)
}

/// Configuration with explicit bounds `[-1, 1]^3`, two subvolumes per
/// axis and a fixed seed.
pub fn open_space(seed: u64) -> SimConfig {
    SimConfig {
        partition_bounds: Some(Aabb::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        )),
        partition: SubvolumeLayout::PerAxis([2, 2, 2]),
        seed,
        ..SimConfig::default()
    }
}

/// Species `A`, `B`, `C` and the pathway `A + B -> C` with rate `k`
/// (M⁻¹s⁻¹).
pub fn ab_to_c(d: f64, k: f64) -> Model {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", d));
    let b = m.add_species(SpeciesDef::volume("B", d));
    let c = m.add_species(SpeciesDef::volume("C", d));
    m.add_pathway(PathwayDef::new(
        "bind",
        vec![ReactantSpec::plain(a), ReactantSpec::plain(b)],
        vec![ReactantSpec::plain(c)],
        k,
    ));
    m
}
