//! Mote: an event-driven Monte Carlo simulator for reaction and diffusion
//! of individual molecules in triangulated cellular geometry.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Mote sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use mote::prelude::*;
//!
//! // A + B -> C inside a closed box.
//! let mut model = Model::new();
//! let a = model.add_species(SpeciesDef::volume("A", 1.0));
//! let b = model.add_species(SpeciesDef::volume("B", 1.0));
//! let c = model.add_species(SpeciesDef::volume("C", 1.0));
//! model.add_pathway(PathwayDef::new(
//!     "bind",
//!     vec![ReactantSpec::plain(a), ReactantSpec::plain(b)],
//!     vec![ReactantSpec::plain(c)],
//!     1e6,
//! ));
//! model.add_object(ObjectNode::cuboid(
//!     "cell",
//!     BoxSpec::new(Vec3::new(-2.0, -2.0, -2.0), Vec3::new(2.0, 2.0, 2.0)),
//! ));
//! model.add_release(ReleaseProgram::point("a", a, Vec3::ZERO, 100));
//! model.add_release(ReleaseProgram::point("b", b, Vec3::ZERO, 100));
//!
//! let mut world = World::new(&model, SimConfig::default()).unwrap();
//! world.run_iterations(10, &mut NullHooks).unwrap();
//! assert_eq!(world.iteration(), 10);
//! assert_eq!(world.count(a), world.count(b));
//! assert_eq!(world.count(a) + world.count(c), 100);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `mote-core` | IDs, vectors, orientations, tolerances |
//! | [`geom`] | `mote-geom` | Object tree, walls, regions, surface grids |
//! | [`space`] | `mote-space` | Subvolume partition |
//! | [`engine`] | `mote-engine` | Calendar, reactions, releases and the world |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, vectors and numeric helpers (`mote-core`).
pub use mote_core as types;

/// Geometry: the object tree, walls, regions and surface grids
/// (`mote-geom`).
pub use mote_geom as geom;

/// The subvolume partition (`mote-space`).
pub use mote_space as space;

/// The simulation engine (`mote-engine`).
///
/// [`engine::World`] owns the state; [`engine::OutputHooks`] receives
/// reports.
pub use mote_engine as engine;

/// Common imports for building and running a model.
pub mod prelude {
    // Core types
    pub use mote_core::{
        Aabb, MoleculeId, NotifyLevel, Orientation, PathwayIndex, RegionIndex, SpeciesId, Vec2,
        Vec3, WallIndex,
    };

    // Geometry
    pub use mote_geom::{BoxSpec, ObjectNode, PolygonMesh, RegionDef, Transform};

    // Errors
    pub use mote_engine::{ConfigError, ModelError, RunError};

    // Engine
    pub use mote_engine::{
        Model, NullHooks, OutputHooks, PathwayDef, Permeability, ReactantSpec, ReleasePattern,
        ReleaseProgram, ReleaseQuantity, ReleaseShape, SimConfig, Snapshot, SpeciesDef,
        SubvolumeLayout, World,
    };
}
