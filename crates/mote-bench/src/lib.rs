//! Benchmark profiles for the Mote simulator.
//!
//! - [`reference_profile`]: a closed box with two reacting species released
//!   as clouds, 1 000 molecules each
//! - [`stress_profile`]: the same model at ten times the molecule count

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use mote_core::{NotifyLevel, Vec3};
use mote_engine::{
    Model, PathwayDef, ReactantSpec, ReleaseProgram, ReleaseShape, SimConfig, SpeciesDef,
    SubvolumeLayout,
};
use mote_geom::{BoxSpec, ObjectNode};

/// Half the edge of the reference box, in internal units.
pub const HALF_EDGE: f64 = 5.0;

/// Build the reference model: `A + B -> C` inside a closed cube of edge
/// 10 with `per_species` molecules of `A` and `B` released as overlapping
/// spheres.
///
/// D = 1 µm²/s for all species, k = 1e7 M⁻¹s⁻¹.
pub fn reference_model(per_species: u32) -> Model {
    let mut m = Model::new();
    let a = m.add_species(SpeciesDef::volume("A", 1.0));
    let b = m.add_species(SpeciesDef::volume("B", 1.0));
    let c = m.add_species(SpeciesDef::volume("C", 1.0));
    m.add_pathway(PathwayDef::new(
        "bind",
        vec![ReactantSpec::plain(a), ReactantSpec::plain(b)],
        vec![ReactantSpec::plain(c)],
        1e7,
    ));
    m.add_object(ObjectNode::cuboid(
        "cell",
        BoxSpec::new(
            Vec3::new(-HALF_EDGE, -HALF_EDGE, -HALF_EDGE),
            Vec3::new(HALF_EDGE, HALF_EDGE, HALF_EDGE),
        ),
    ));
    for (name, species, x) in [("a", a, -1.0), ("b", b, 1.0)] {
        let center = Vec3::new(x, 0.0, 0.0);
        m.add_release(ReleaseProgram {
            shape: ReleaseShape::Sphere {
                center,
                diameter: Vec3::new(6.0, 6.0, 6.0),
            },
            ..ReleaseProgram::point(name, species, center, per_species)
        });
    }
    m
}

/// Configuration for the reference model: 8 subvolumes per axis and a
/// fixed seed.
pub fn reference_config(seed: u64) -> SimConfig {
    let mut config = SimConfig {
        partition: SubvolumeLayout::PerAxis([8, 8, 8]),
        seed,
        ..SimConfig::default()
    };
    config.notifications.high_reaction_probability = NotifyLevel::Warn;
    config
}

/// The reference model and configuration.
pub fn reference_profile(seed: u64) -> (Model, SimConfig) {
    (reference_model(1_000), reference_config(seed))
}

/// Ten times the molecules of [`reference_profile`].
pub fn stress_profile(seed: u64) -> (Model, SimConfig) {
    (reference_model(10_000), reference_config(seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mote_engine::{NullHooks, World};

    #[test]
    fn reference_profile_builds_and_runs() {
        let (model, config) = reference_profile(1);
        let mut w = World::new(&model, config).unwrap();
        w.run_iterations(2, &mut NullHooks).unwrap();
        let total: i64 = (0..3).map(|s| w.count(mote_core::SpeciesId(s))).sum();
        let fired = w.counters().reaction_totals()[0] as i64;
        assert_eq!(total + fired, 2_000);
    }
}
