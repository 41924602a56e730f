//! Model-definition and runtime errors.

use mote_core::{MoleculeId, ResourceError, SpeciesId, Vec3};
use mote_geom::GeometryError;
use mote_space::PartitionError;
use thiserror::Error;

use crate::config::ConfigError;

/// A problem found while building a [`World`](crate::World) from a model.
///
/// Every variant names the offending entity so the model author can find it.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ModelError {
    /// The configuration failed validation.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    /// The geometry could not be built.
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// The spatial partition could not be built.
    #[error("partition: {0}")]
    Partition(#[from] PartitionError),
    /// Two species share a name.
    #[error("species '{name}' defined twice")]
    DuplicateSpecies {
        /// The repeated name.
        name: String,
    },
    /// A species has a negative or non-finite diffusion constant.
    #[error("species '{name}' has invalid diffusion constant {value}")]
    InvalidDiffusion {
        /// Species name.
        name: String,
        /// The rejected value.
        value: f64,
    },
    /// A species id does not refer to a defined species.
    #[error("{context} refers to unknown species {species}")]
    UnknownSpecies {
        /// Where the reference appeared.
        context: String,
        /// The dangling id.
        species: SpeciesId,
    },
    /// A species is used in a role its kind does not allow.
    #[error("{context}: species '{name}' cannot be used here ({reason})")]
    InvalidSpeciesUse {
        /// Where the reference appeared.
        context: String,
        /// Species name.
        name: String,
        /// Why the use is invalid.
        reason: &'static str,
    },
    /// A pathway is structurally invalid.
    #[error("pathway '{pathway}': {reason}")]
    InvalidPathway {
        /// Pathway name.
        pathway: String,
        /// What is wrong.
        reason: String,
    },
    /// A reaction class's total probability exceeds one under the
    /// `Error` policy.
    #[error("reaction class {reactants} has total probability {total} > 1")]
    ProbabilityOverflow {
        /// Reactant names joined with `+`.
        reactants: String,
        /// The summed probability.
        total: f64,
    },
    /// A release program is structurally invalid.
    #[error("release '{release}': {reason}")]
    InvalidRelease {
        /// Release name.
        release: String,
        /// What is wrong.
        reason: String,
    },
    /// A release pattern's train duration exceeds its train interval.
    #[error("release '{release}': train duration {duration} exceeds train interval {interval}")]
    ReleaseTrainOverlap {
        /// Release name.
        release: String,
        /// Train duration (s).
        duration: f64,
        /// Train interval (s).
        interval: f64,
    },
    /// A release location lies outside the simulation domain.
    #[error("release '{release}' at {point:?} is outside the simulation domain")]
    ReleaseOutsideDomain {
        /// Release name.
        release: String,
        /// The offending location.
        point: Vec3,
    },
    /// A region referenced by name or index does not exist.
    #[error("{context} refers to unknown region '{region}'")]
    UnknownRegion {
        /// Where the reference appeared.
        context: String,
        /// The dangling reference.
        region: String,
    },
    /// Storage could not be grown while building.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// A problem raised while the simulation is running.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RunError {
    /// Storage could not be grown. The emergency checkpoint hook has been
    /// called; the run cannot continue.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(#[from] ResourceError),
    /// A point handed to the engine lies outside the partition.
    #[error("position {point:?} is outside the simulation domain")]
    OutsideDomain {
        /// The offending position.
        point: Vec3,
    },
    /// The species cannot be placed the way requested.
    #[error("species {species} cannot be placed this way ({reason})")]
    WrongSpeciesKind {
        /// The species.
        species: SpeciesId,
        /// What was expected.
        reason: &'static str,
    },
    /// The molecule does not exist or is not of the required kind.
    #[error("molecule {molecule} is not a live {expected} molecule")]
    NoSuchMolecule {
        /// The id.
        molecule: MoleculeId,
        /// The required kind.
        expected: &'static str,
    },
    /// The species id is out of range.
    #[error("unknown species {species}")]
    UnknownSpecies {
        /// The id.
        species: SpeciesId,
    },
    /// A geometry edit was rejected.
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// The requested tile is already occupied or out of range.
    #[error("tile {tile} on wall {wall} is not available")]
    TileUnavailable {
        /// Wall index.
        wall: u32,
        /// Tile index.
        tile: u32,
    },
    /// A partition query failed for a reason other than an outside point.
    #[error("partition: {0}")]
    Partition(PartitionError),
    /// A reaction class scaled at a collision exceeds probability one
    /// under the `Error` policy.
    #[error("reaction class {reactants} reached probability {total} > 1 at a collision")]
    ProbabilityOverflow {
        /// Reactant names joined with `+`.
        reactants: String,
        /// The scaled probability.
        total: f64,
    },
    /// A snapshot does not fit this world.
    #[error("snapshot does not match this world: {reason}")]
    SnapshotMismatch {
        /// What differs.
        reason: String,
    },
}

impl From<PartitionError> for RunError {
    fn from(e: PartitionError) -> Self {
        match e {
            PartitionError::OutsideBounds { point } => Self::OutsideDomain { point },
            other => Self::Partition(other),
        }
    }
}
