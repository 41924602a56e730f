//! The declarative model a [`World`](crate::World) is built from.

use mote_core::{ReleaseIndex, SpeciesId};
use mote_geom::ObjectNode;

use crate::reaction::PathwayDef;
use crate::release::ReleaseProgram;
use crate::species::SpeciesDef;

/// Species, reactions, geometry and releases of one simulation.
///
/// Ids handed out by the `add_*` methods are positions in the matching
/// vector, so a model can also be filled by pushing directly.
#[derive(Clone, Debug, Default)]
pub struct Model {
    /// Species and surface classes.
    pub species: Vec<SpeciesDef>,
    /// Reaction pathways, including surface-class special pathways.
    pub pathways: Vec<PathwayDef>,
    /// Root objects of the geometry tree.
    pub geometry: Vec<ObjectNode>,
    /// Release programs. Release-site objects refer to these by index.
    pub releases: Vec<ReleaseProgram>,
}

impl Model {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a species and return its id.
    pub fn add_species(&mut self, def: SpeciesDef) -> SpeciesId {
        self.species.push(def);
        SpeciesId((self.species.len() - 1) as u32)
    }

    /// Add a reaction pathway.
    pub fn add_pathway(&mut self, def: PathwayDef) {
        self.pathways.push(def);
    }

    /// Add a root geometry object.
    pub fn add_object(&mut self, node: ObjectNode) {
        self.geometry.push(node);
    }

    /// Add a release program and return its index.
    pub fn add_release(&mut self, program: ReleaseProgram) -> ReleaseIndex {
        self.releases.push(program);
        ReleaseIndex((self.releases.len() - 1) as u32)
    }

    /// Look up a species id by name.
    pub fn species_id(&self, name: &str) -> Option<SpeciesId> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(|i| SpeciesId(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mote_core::Vec3;

    #[test]
    fn ids_follow_insertion_order() {
        let mut m = Model::new();
        let a = m.add_species(SpeciesDef::volume("A", 1e-6));
        let b = m.add_species(SpeciesDef::volume("B", 1e-6));
        assert_eq!(a, SpeciesId(0));
        assert_eq!(b, SpeciesId(1));
        assert_eq!(m.species_id("B"), Some(b));
        assert_eq!(m.species_id("C"), None);
        let r = m.add_release(ReleaseProgram::point("r", a, Vec3::ZERO, 1));
        assert_eq!(r, ReleaseIndex(0));
    }
}
