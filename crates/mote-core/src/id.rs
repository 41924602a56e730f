//! Strongly-typed indices.
//!
//! Every entity in the simulator lives in a contiguous store and is
//! referenced elsewhere only by one of these integer newtypes. Indices
//! for walls, vertices, tiles and subvolumes are positional and fixed at
//! model build. [`MoleculeId`] is an external identity that survives
//! defragmentation of the molecule store and is never reused.

use std::fmt;

macro_rules! typed_index {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $inner);

        impl $name {
            /// The index as a `usize`, for slice access.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                Self(v)
            }
        }
    };
}

typed_index!(
    /// Identifies a species in the species table.
    ///
    /// Surface classes are species too, so a wall's surface class and a
    /// diffusing molecule can key the same reaction table.
    SpeciesId(u32)
);

typed_index!(
    /// Unique identity of a molecule for the lifetime of a run.
    MoleculeId(u64)
);

typed_index!(
    /// Position of a vertex in the geometry store.
    VertexIndex(u32)
);

typed_index!(
    /// Position of a wall (triangle) in the geometry store.
    WallIndex(u32)
);

typed_index!(
    /// Linear index of a tile within one wall's surface grid.
    TileIndex(u32)
);

typed_index!(
    /// Position of a subvolume in the spatial partition.
    SubvolumeIndex(u32)
);

typed_index!(
    /// Position of a region in the geometry store.
    RegionIndex(u32)
);

typed_index!(
    /// Identifies an instantiated polygon or box object.
    ObjectId(u32)
);

typed_index!(
    /// Position of a release program.
    ReleaseIndex(u32)
);

typed_index!(
    /// Position of a pathway in the reaction table's flat pathway list.
    PathwayIndex(u32)
);
