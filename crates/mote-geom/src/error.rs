//! Error types for geometry construction and surface-grid access.

use mote_core::{MoleculeId, ResourceError, TileIndex, WallIndex};
use thiserror::Error;

/// Errors raised while building or editing geometry.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GeometryError {
    /// A triangle's area is indistinguishable from zero, or two of its
    /// corners coincide.
    #[error("degenerate polygon {polygon} in object '{object}' (area {area})")]
    DegenerateWall {
        /// Full path of the owning object.
        object: String,
        /// Triangle index within the object.
        polygon: usize,
        /// The computed area.
        area: f64,
    },
    /// A triangle refers to a vertex the object does not have.
    #[error("polygon {polygon} in object '{object}' uses vertex {vertex}, but only {count} exist")]
    VertexOutOfRange {
        /// Full path of the owning object.
        object: String,
        /// Triangle index within the object.
        polygon: usize,
        /// The offending vertex index.
        vertex: usize,
        /// Number of vertices in the object.
        count: usize,
    },
    /// A vertex coordinate is NaN or infinite.
    #[error("vertex {vertex} of object '{object}' is not finite")]
    NonFiniteVertex {
        /// Full path of the owning object.
        object: String,
        /// The offending vertex index.
        vertex: usize,
    },
    /// A region lists a triangle the object does not have.
    #[error("region '{region}' lists polygon {polygon}, but object has {count}")]
    RegionPolygonOutOfRange {
        /// Full region name.
        region: String,
        /// The offending triangle index.
        polygon: usize,
        /// Number of triangles in the object.
        count: usize,
    },
    /// Two objects resolve to the same path.
    #[error("duplicate object path '{path}'")]
    DuplicateObject {
        /// The repeated path.
        path: String,
    },
    /// A vertex index does not exist in the store.
    #[error("vertex {vertex} out of range ({count} vertices)")]
    UnknownVertex {
        /// The offending index.
        vertex: usize,
        /// Number of vertices in the store.
        count: usize,
    },
    /// A wall index does not exist in the store.
    #[error("wall {wall} out of range")]
    UnknownWall {
        /// The offending index.
        wall: WallIndex,
    },
    /// A tile index is beyond the grid.
    #[error("tile {tile} out of range ({tiles} tiles)")]
    TileOutOfRange {
        /// The offending index.
        tile: TileIndex,
        /// Number of tiles in the grid.
        tiles: u32,
    },
    /// A tile already holds a molecule.
    #[error("tile {tile} already holds molecule {occupant}")]
    TileOccupied {
        /// The requested tile.
        tile: TileIndex,
        /// Its current occupant.
        occupant: MoleculeId,
    },
    /// Grid storage could not grow.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
