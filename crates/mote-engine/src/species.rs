//! Species definitions and their per-timestep derived constants.

use indexmap::IndexMap;
use mote_core::SpeciesId;

use crate::error::ModelError;

/// What a surface class does to a volume molecule that hits it and does
/// not react.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Permeability {
    /// Bounce off.
    #[default]
    Reflective,
    /// Pass through.
    Transparent,
    /// Be destroyed.
    Absorptive,
}

/// The three kinds of species.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeciesKind {
    /// Diffuses freely in 3-D.
    Volume,
    /// Bound to surface tiles, diffuses in 2-D.
    Surface,
    /// A property of walls, never instantiated as molecules.
    SurfaceClass {
        /// Permeability for species without an override.
        default: Permeability,
    },
}

/// A species as the model describes it.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesDef {
    /// Unique name.
    pub name: String,
    /// Diffusion constant in µm²/s.
    pub diffusion: f64,
    /// Kind.
    pub kind: SpeciesKind,
}

impl SpeciesDef {
    /// A volume species.
    pub fn volume(name: impl Into<String>, diffusion: f64) -> Self {
        Self {
            name: name.into(),
            diffusion,
            kind: SpeciesKind::Volume,
        }
    }

    /// A surface species.
    pub fn surface(name: impl Into<String>, diffusion: f64) -> Self {
        Self {
            name: name.into(),
            diffusion,
            kind: SpeciesKind::Surface,
        }
    }

    /// A surface class.
    pub fn surface_class(name: impl Into<String>, default: Permeability) -> Self {
        Self {
            name: name.into(),
            diffusion: 0.0,
            kind: SpeciesKind::SurfaceClass { default },
        }
    }
}

/// A species with derived step constants.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    /// Id.
    pub id: SpeciesId,
    /// Name.
    pub name: String,
    /// Diffusion constant in µm²/s.
    pub diffusion: f64,
    /// Kind.
    pub kind: SpeciesKind,
    /// Standard deviation of one axis of a step, in internal units.
    pub step_sigma: f64,
    /// Mean 3-D step length `2*sqrt(4 D dt / pi)`, in internal units.
    pub mean_step: f64,
    overrides: IndexMap<SpeciesId, Permeability>,
}

impl Species {
    /// Whether this is a volume species.
    pub fn is_volume(&self) -> bool {
        self.kind == SpeciesKind::Volume
    }

    /// Whether this is a surface species.
    pub fn is_surface(&self) -> bool {
        self.kind == SpeciesKind::Surface
    }

    /// Whether this is a surface class.
    pub fn is_surface_class(&self) -> bool {
        matches!(self.kind, SpeciesKind::SurfaceClass { .. })
    }

    /// Whether molecules of this species move.
    pub fn diffuses(&self) -> bool {
        self.step_sigma > 0.0
    }

    /// What this surface class does to `species`. Non-classes reflect.
    pub fn permeability(&self, species: SpeciesId) -> Permeability {
        match self.kind {
            SpeciesKind::SurfaceClass { default } => {
                self.overrides.get(&species).copied().unwrap_or(default)
            }
            _ => Permeability::Reflective,
        }
    }

    fn derive(&mut self, time_step: f64, length_unit: f64) {
        let d = self.diffusion / (length_unit * length_unit);
        self.step_sigma = (2.0 * d * time_step).sqrt();
        self.mean_step = 2.0 * (4.0 * d * time_step / std::f64::consts::PI).sqrt();
    }
}

/// All species, indexed by [`SpeciesId`] and by name.
#[derive(Clone, Debug, Default)]
pub struct SpeciesTable {
    species: Vec<Species>,
    by_name: IndexMap<String, SpeciesId>,
}

impl SpeciesTable {
    /// Build from definitions. Ids follow definition order.
    pub fn build(defs: &[SpeciesDef], time_step: f64, length_unit: f64) -> Result<Self, ModelError> {
        let mut table = Self::default();
        for (i, def) in defs.iter().enumerate() {
            if !(def.diffusion.is_finite() && def.diffusion >= 0.0) {
                return Err(ModelError::InvalidDiffusion {
                    name: def.name.clone(),
                    value: def.diffusion,
                });
            }
            let id = SpeciesId(i as u32);
            if table.by_name.insert(def.name.clone(), id).is_some() {
                return Err(ModelError::DuplicateSpecies {
                    name: def.name.clone(),
                });
            }
            let mut s = Species {
                id,
                name: def.name.clone(),
                diffusion: def.diffusion,
                kind: def.kind,
                step_sigma: 0.0,
                mean_step: 0.0,
                overrides: IndexMap::new(),
            };
            if !s.is_surface_class() {
                s.derive(time_step, length_unit);
            }
            table.species.push(s);
        }
        Ok(table)
    }

    /// Recompute step constants for a new timestep.
    pub fn rescale(&mut self, time_step: f64, length_unit: f64) {
        for s in self.species.iter_mut().filter(|s| !s.is_surface_class()) {
            s.derive(time_step, length_unit);
        }
    }

    /// Number of species.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.index())
    }

    /// Look up an id by name.
    pub fn by_name(&self, name: &str) -> Option<SpeciesId> {
        self.by_name.get(name).copied()
    }

    /// The name of `id`, or `"?"` when out of range.
    pub fn name(&self, id: SpeciesId) -> &str {
        self.get(id).map_or("?", |s| s.name.as_str())
    }

    /// All species in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Species> + '_ {
        self.species.iter()
    }

    pub(crate) fn set_override(&mut self, class: SpeciesId, species: SpeciesId, p: Permeability) {
        if let Some(s) = self.species.get_mut(class.index()) {
            s.overrides.insert(species, p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_steps_use_internal_units() {
        // D = 1e-6 µm²/s with 0.01 µm units is 1e-2 internal²/s.
        let t = SpeciesTable::build(&[SpeciesDef::volume("A", 1e-6)], 1.0, 0.01).unwrap();
        let a = t.get(SpeciesId(0)).unwrap();
        assert!((a.step_sigma - (2.0e-2f64).sqrt()).abs() < 1e-12);
        let expect = 2.0 * (4.0e-2 / std::f64::consts::PI).sqrt();
        assert!((a.mean_step - expect).abs() < 1e-12);
        assert!(a.diffuses());
    }

    #[test]
    fn duplicate_names_rejected() {
        let defs = [SpeciesDef::volume("A", 1.0), SpeciesDef::surface("A", 1.0)];
        assert_eq!(
            SpeciesTable::build(&defs, 1e-6, 0.01).unwrap_err(),
            ModelError::DuplicateSpecies { name: "A".into() }
        );
    }

    #[test]
    fn negative_diffusion_rejected() {
        let defs = [SpeciesDef::volume("A", -1.0)];
        assert!(matches!(
            SpeciesTable::build(&defs, 1e-6, 0.01),
            Err(ModelError::InvalidDiffusion { .. })
        ));
    }

    #[test]
    fn surface_class_overrides() {
        let defs = [
            SpeciesDef::volume("A", 1.0),
            SpeciesDef::volume("B", 1.0),
            SpeciesDef::surface_class("membrane", Permeability::Reflective),
        ];
        let mut t = SpeciesTable::build(&defs, 1e-6, 0.01).unwrap();
        t.set_override(SpeciesId(2), SpeciesId(0), Permeability::Transparent);
        let class = t.get(SpeciesId(2)).unwrap();
        assert_eq!(class.permeability(SpeciesId(0)), Permeability::Transparent);
        assert_eq!(class.permeability(SpeciesId(1)), Permeability::Reflective);
        assert!(!class.diffuses());
    }

    #[test]
    fn rescale_changes_steps() {
        let mut t = SpeciesTable::build(&[SpeciesDef::volume("A", 1.0)], 1e-6, 0.01).unwrap();
        let before = t.get(SpeciesId(0)).unwrap().step_sigma;
        t.rescale(4e-6, 0.01);
        let after = t.get(SpeciesId(0)).unwrap().step_sigma;
        assert!((after / before - 2.0).abs() < 1e-12);
        assert_eq!(t.by_name("A"), Some(SpeciesId(0)));
        assert_eq!(t.name(SpeciesId(9)), "?");
    }
}
