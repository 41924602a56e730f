//! Triangle-mesh geometry for the Mote simulator.
//!
//! The [`GeometryStore`] owns every vertex and wall. Each [`Wall`] carries
//! a precomputed local 2-D frame ([`WallFrame`]), per-edge transforms
//! ([`EdgeTransform`]) onto its neighbors, and an optional
//! [`SurfaceGrid`] of tiles for surface-bound molecules.
//!
//! Geometry enters as a tree of [`ObjectNode`]s and is flattened by an
//! iterative traversal ([`walk`]) that accumulates dotted object paths
//! and affine transforms.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod edge;
pub mod error;
pub mod grid;
pub mod object;
pub mod region;
pub mod store;
pub mod transform;
pub mod wall;

pub use edge::EdgeTransform;
pub use error::GeometryError;
pub use grid::{SurfaceGrid, TileCoord};
pub use object::{bounding_box, walk, BoxFace, BoxSpec, Instance, ObjectKind, ObjectNode, PolygonMesh, RegionDef};
pub use region::Region;
pub use store::{GeometryStore, MovedWalls, ObjectInfo, ReleaseSite, VertexMove};
pub use transform::Transform;
pub use wall::{SegmentHit, Wall, WallFrame};
