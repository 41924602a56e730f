//! Core types for the Mote reaction-diffusion simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: typed
//! indices, small fixed-size vectors, epsilon-tolerant comparisons,
//! physical constants, and the resource-exhaustion error.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod consts;
pub mod error;
pub mod id;
pub mod notify;
pub mod numeric;
pub mod orientation;
pub mod vec;

pub use consts::*;
pub use error::ResourceError;
pub use id::{
    MoleculeId, ObjectId, PathwayIndex, RegionIndex, ReleaseIndex, SpeciesId, SubvolumeIndex,
    TileIndex, VertexIndex, WallIndex,
};
pub use notify::NotifyLevel;
pub use numeric::{cmp_eq, cmp_ge, cmp_le, distinguishable, distinguishable_vec2, distinguishable_vec3};
pub use orientation::Orientation;
pub use vec::{Aabb, Vec2, Vec3};
