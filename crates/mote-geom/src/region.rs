//! Named sets of walls.

use mote_core::{ObjectId, SpeciesId, WallIndex};

/// A named set of walls belonging to one object.
///
/// Every object has an implicit `<path>[ALL]` region; further regions come
/// from the mesh definition as `<path>[<name>]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Full name, `<object path>[<region>]`.
    pub name: String,
    /// Owning object.
    pub object: ObjectId,
    /// Member walls in ascending order.
    pub walls: Vec<WallIndex>,
    /// Surface class applied to the walls.
    pub surface_class: Option<SpeciesId>,
    /// Whether per-species counts are kept.
    pub counted: bool,
    /// Whether molecule hits are reported.
    pub report_hits: bool,
    /// Whether the walls enclose a volume (every edge is shared with
    /// another wall of the region).
    pub closed: bool,
    /// Total area of the member walls.
    pub area: f64,
}
