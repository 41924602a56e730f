//! Reaction pathways, reaction classes and stochastic pathway selection.
//!
//! Pathways that share the same reactant species are grouped into a
//! [`ReactionClass`], keyed by the sorted reactant species list. Each
//! pathway's rate constant is converted once into a per-test probability
//! for the current timestep; a class then answers "given a uniform draw,
//! which pathway fires, if any" by walking the cumulative intervals
//! `[0, p1), [p1, p1 + p2), ...` up to `min_noreaction_p`.
//!
//! Probabilities for volume-surface and surface-surface tests depend on
//! the tile area and the number of neighbors tested, which are only known
//! at test time. Those local factors are applied by scaling the draw.

use indexmap::IndexMap;
use mote_core::{
    distinguishable, NotifyLevel, Orientation, PathwayIndex, SpeciesId, AVOGADRO, EPS,
    LITRES_PER_CUBIC_UM,
};
use smallvec::SmallVec;

use crate::config::SimConfig;
use crate::error::ModelError;
use crate::species::{Permeability, Species, SpeciesTable};

/// Sorted reactant species, the lookup key of a reaction class.
pub type ReactantKey = SmallVec<[SpeciesId; 3]>;

/// A species with an orientation, as written in a pathway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReactantSpec {
    /// Species.
    pub species: SpeciesId,
    /// Orientation relative to the other oriented participants.
    pub orientation: Orientation,
}

impl ReactantSpec {
    /// An oriented reactant or product.
    pub fn new(species: SpeciesId, orientation: Orientation) -> Self {
        Self {
            species,
            orientation,
        }
    }

    /// An unoriented reactant or product.
    pub fn plain(species: SpeciesId) -> Self {
        Self::new(species, Orientation::None)
    }
}

/// Ordinary pathways, or the special surface-class pathways that only
/// change how a wall treats a volume species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathwayKind {
    /// Reactants turn into products at the given rate.
    #[default]
    Standard,
    /// The surface class lets the volume species through.
    Transparent,
    /// The surface class reflects the volume species.
    Reflective,
    /// The surface class destroys the volume species.
    Absorptive,
}

/// A pathway as the model describes it.
///
/// Rate units follow the usual conventions: unimolecular 1/s;
/// volume-volume and volume-surface 1/(M·s); volume-wall µm/s;
/// surface-surface µm²/s per molecule; trimolecular 1/(M²·s).
#[derive(Clone, Debug, PartialEq)]
pub struct PathwayDef {
    /// Name used in reports and errors.
    pub name: String,
    /// Reactants.
    pub reactants: Vec<ReactantSpec>,
    /// Products.
    pub products: Vec<ReactantSpec>,
    /// Rate constant.
    pub rate: f64,
    /// Standard or surface-class special.
    pub kind: PathwayKind,
}

impl PathwayDef {
    /// A standard pathway.
    pub fn new(
        name: impl Into<String>,
        reactants: Vec<ReactantSpec>,
        products: Vec<ReactantSpec>,
        rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            reactants,
            products,
            rate,
            kind: PathwayKind::Standard,
        }
    }

    /// A special pathway setting how `class` treats `species`.
    pub fn special(
        name: impl Into<String>,
        species: SpeciesId,
        class: SpeciesId,
        kind: PathwayKind,
    ) -> Self {
        Self {
            name: name.into(),
            reactants: vec![ReactantSpec::plain(species), ReactantSpec::plain(class)],
            products: Vec::new(),
            rate: 0.0,
            kind,
        }
    }
}

/// The geometric situation a reaction class is tested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    /// One reactant, fires at an exponentially distributed time.
    Unimolecular,
    /// Two volume molecules collide.
    VolumeVolume,
    /// A volume molecule hits a tile holding a surface molecule.
    VolumeSurface,
    /// A volume molecule hits a wall of a surface class.
    VolumeWall,
    /// Two surface molecules on neighboring tiles.
    SurfaceSurface,
    /// Three volume molecules meet.
    Trimolecular,
}

/// One possible outcome of a reaction class.
#[derive(Clone, Debug, PartialEq)]
pub struct Pathway {
    /// Model-wide pathway index.
    pub index: PathwayIndex,
    /// Name.
    pub name: String,
    /// Reactants in definition order.
    pub reactants: SmallVec<[ReactantSpec; 3]>,
    /// Products in definition order.
    pub products: SmallVec<[ReactantSpec; 4]>,
    /// Rate constant as given.
    pub rate: f64,
    /// Per-test probability (or rate fraction for unimolecular classes).
    pub probability: f64,
}

impl Pathway {
    /// Whether this pathway's orientations are consistent with the actual
    /// `(species, orientation)` of the participants.
    ///
    /// Participants are assigned to reactants by species, first unused
    /// match wins. Orientations are relative: every oriented pair
    /// `(spec, actual)` must agree with the first one on whether spec and
    /// actual facings are the same or flipped. Unoriented specs or
    /// participants match anything.
    pub fn matches(&self, participants: &[(SpeciesId, Orientation)]) -> bool {
        let mut used: SmallVec<[bool; 3]> = SmallVec::from_elem(false, participants.len());
        let mut reference: Option<Orientation> = None;
        for spec in &self.reactants {
            let Some(j) = participants
                .iter()
                .enumerate()
                .position(|(j, p)| !used[j] && p.0 == spec.species)
            else {
                return false;
            };
            used[j] = true;
            let actual = participants[j].1;
            if spec.orientation == Orientation::None || actual == Orientation::None {
                continue;
            }
            let relation = spec.orientation.compose(actual);
            match reference {
                None => reference = Some(relation),
                Some(r) if r != relation => return false,
                Some(_) => {}
            }
        }
        true
    }
}

/// Pathways sharing one reactant key.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionClass {
    /// Sorted reactant species.
    pub reactants: ReactantKey,
    /// Situation this class is tested in.
    pub kind: ReactionKind,
    /// Pathways in definition order.
    pub pathways: Vec<Pathway>,
    /// Sum of pathway probabilities.
    pub max_fixed_p: f64,
    /// Draws at or above this value never react.
    pub min_noreaction_p: f64,
    /// Sum of rate constants; the firing rate of unimolecular classes.
    pub total_rate: f64,
    cumulative: Vec<f64>,
}

impl ReactionClass {
    fn new(reactants: ReactantKey, kind: ReactionKind) -> Self {
        Self {
            reactants,
            kind,
            pathways: Vec::new(),
            max_fixed_p: 0.0,
            min_noreaction_p: 0.0,
            total_rate: 0.0,
            cumulative: Vec::new(),
        }
    }

    fn refresh_thresholds(&mut self) {
        self.cumulative.clear();
        let mut acc = 0.0;
        for p in &self.pathways {
            acc += p.probability;
            self.cumulative.push(acc);
        }
        self.max_fixed_p = acc;
        self.min_noreaction_p = acc;
        self.total_rate = self.pathways.iter().map(|p| p.rate).sum();
    }

    /// Multiply every pathway probability by `factor`.
    pub fn rescale(&mut self, factor: f64) {
        for p in &mut self.pathways {
            p.probability *= factor;
        }
        self.refresh_thresholds();
    }

    /// Probability that a test fires no pathway.
    pub fn no_reaction_probability(&self) -> f64 {
        (1.0 - self.min_noreaction_p).max(0.0)
    }

    /// The pathway whose interval contains `draw`, or `None` when the
    /// draw falls in the no-reaction interval.
    pub fn select(&self, draw: f64) -> Option<usize> {
        if draw >= self.min_noreaction_p {
            return None;
        }
        self.cumulative.iter().position(|&c| draw < c)
    }

    /// Delay until a unimolecular class fires, from a uniform draw in `(0, 1]`.
    pub fn firing_delay(&self, draw: f64) -> f64 {
        if self.total_rate <= 0.0 {
            return f64::INFINITY;
        }
        -draw.ln() / self.total_rate
    }
}

/// One reaction class considered in a multi-partner test.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Index of the class in the [`ReactionTable`].
    pub class: usize,
    /// Local factor dividing the class probabilities (tile area,
    /// neighbor count).
    pub scaling: f64,
    /// Actual `(species, orientation)` of the participants.
    pub participants: SmallVec<[(SpeciesId, Orientation); 3]>,
}

/// Every reaction class of the model.
#[derive(Clone, Debug, Default)]
pub struct ReactionTable {
    classes: Vec<ReactionClass>,
    by_key: IndexMap<ReactantKey, usize>,
    unimolecular: Vec<Option<usize>>,
    volume_partners: Vec<SmallVec<[SpeciesId; 4]>>,
    surface_partners: Vec<SmallVec<[SpeciesId; 4]>>,
    pathway_names: Vec<String>,
    overflow_policy: NotifyLevel,
}

fn key_of(species: &[SpeciesId]) -> ReactantKey {
    let mut k: ReactantKey = species.iter().copied().collect();
    k.sort_unstable();
    k
}

fn invalid(def: &PathwayDef, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidPathway {
        pathway: def.name.clone(),
        reason: reason.into(),
    }
}

fn push_unique(list: &mut SmallVec<[SpeciesId; 4]>, s: SpeciesId) {
    if !list.contains(&s) {
        list.push(s);
    }
}

impl ReactionTable {
    /// Build the table from pathway definitions.
    ///
    /// Special pathways become permeability overrides on their surface
    /// class. Probabilities are derived for `config.time_step`.
    pub fn build(
        defs: &[PathwayDef],
        species: &mut SpeciesTable,
        config: &SimConfig,
    ) -> Result<Self, ModelError> {
        let n = species.len();
        let mut table = Self {
            unimolecular: vec![None; n],
            volume_partners: vec![SmallVec::new(); n],
            surface_partners: vec![SmallVec::new(); n],
            overflow_policy: config.notifications.high_reaction_probability,
            ..Self::default()
        };

        for def in defs {
            let resolved: Vec<&Species> = def
                .reactants
                .iter()
                .chain(&def.products)
                .map(|r| {
                    species.get(r.species).ok_or(ModelError::UnknownSpecies {
                        context: format!("pathway '{}'", def.name),
                        species: r.species,
                    })
                })
                .collect::<Result<_, _>>()?;
            let (reactants, products) = resolved.split_at(def.reactants.len());

            if def.kind != PathwayKind::Standard {
                let (vol, class) = match reactants {
                    [a, b] if a.is_surface_class() && !b.is_surface_class() => (b.id, a.id),
                    [a, b] if b.is_surface_class() && !a.is_surface_class() => (a.id, b.id),
                    _ => {
                        return Err(invalid(
                            def,
                            "special pathways need one molecule species and one surface class",
                        ))
                    }
                };
                let p = match def.kind {
                    PathwayKind::Transparent => Permeability::Transparent,
                    PathwayKind::Absorptive => Permeability::Absorptive,
                    _ => Permeability::Reflective,
                };
                species.set_override(class, vol, p);
                continue;
            }

            let kind = Self::classify(def, reactants)?;
            if !(def.rate.is_finite() && def.rate >= 0.0) {
                return Err(invalid(def, format!("rate {} is negative or not finite", def.rate)));
            }
            if let Some(p) = products.iter().find(|p| p.is_surface_class()) {
                return Err(ModelError::InvalidSpeciesUse {
                    context: format!("pathway '{}'", def.name),
                    name: p.name.clone(),
                    reason: "surface classes cannot be products",
                });
            }
            let on_surface = reactants.iter().any(|r| !r.is_volume());
            if !on_surface && products.iter().any(|p| p.is_surface()) {
                return Err(invalid(def, "surface product without a surface reactant or wall"));
            }

            let key = key_of(&reactants.iter().map(|r| r.id).collect::<Vec<_>>());
            let class = match table.by_key.get(&key) {
                Some(&c) => c,
                None => {
                    table.classes.push(ReactionClass::new(key.clone(), kind));
                    table.by_key.insert(key.clone(), table.classes.len() - 1);
                    table.classes.len() - 1
                }
            };
            let index = PathwayIndex(table.pathway_names.len() as u32);
            table.pathway_names.push(def.name.clone());
            table.classes[class].pathways.push(Pathway {
                index,
                name: def.name.clone(),
                reactants: def.reactants.iter().copied().collect(),
                products: def.products.iter().copied().collect(),
                rate: def.rate,
                probability: 0.0,
            });

            match kind {
                ReactionKind::Unimolecular => table.unimolecular[key[0].index()] = Some(class),
                ReactionKind::VolumeVolume | ReactionKind::Trimolecular => {
                    for &a in &key {
                        for &b in &key {
                            if a != b || key.iter().filter(|&&s| s == a).count() > 1 {
                                push_unique(&mut table.volume_partners[a.index()], b);
                            }
                        }
                    }
                }
                ReactionKind::SurfaceSurface => {
                    push_unique(&mut table.surface_partners[key[0].index()], key[1]);
                    push_unique(&mut table.surface_partners[key[1].index()], key[0]);
                }
                ReactionKind::VolumeSurface | ReactionKind::VolumeWall => {}
            }
        }

        table.recompute(species, config)?;
        log::debug!(
            "reaction table: {} classes, {} pathways",
            table.classes.len(),
            table.pathway_names.len()
        );
        Ok(table)
    }

    fn classify(def: &PathwayDef, reactants: &[&Species]) -> Result<ReactionKind, ModelError> {
        let vol = reactants.iter().filter(|s| s.is_volume()).count();
        let surf = reactants.iter().filter(|s| s.is_surface()).count();
        let class = reactants.iter().filter(|s| s.is_surface_class()).count();
        match (reactants.len(), vol, surf, class) {
            (0, ..) => Err(invalid(def, "no reactants")),
            (1, 0, 0, 1) => Err(invalid(def, "a surface class cannot react alone")),
            (1, ..) => Ok(ReactionKind::Unimolecular),
            (2, 2, 0, 0) => Ok(ReactionKind::VolumeVolume),
            (2, 1, 1, 0) => Ok(ReactionKind::VolumeSurface),
            (2, 1, 0, 1) => Ok(ReactionKind::VolumeWall),
            (2, 0, 2, 0) => Ok(ReactionKind::SurfaceSurface),
            (3, 3, 0, 0) => Ok(ReactionKind::Trimolecular),
            (len, ..) => Err(invalid(
                def,
                format!("unsupported combination of {len} reactants"),
            )),
        }
    }

    /// Re-derive every probability for the timestep and units in `config`.
    pub fn recompute(&mut self, species: &SpeciesTable, config: &SimConfig) -> Result<(), ModelError> {
        let dt = config.time_step;
        let l = config.length_unit;
        let r = config.rx_radius();
        let pi = std::f64::consts::PI;
        // Molecules per internal cubic unit at 1 M.
        let conc = AVOGADRO * LITRES_PER_CUBIC_UM * l * l * l;
        let step = |s: SpeciesId| species.get(s).map_or(0.0, |s| s.mean_step);
        let mobile = |s: SpeciesId| species.get(s).is_some_and(|s| s.is_volume());

        for class in &mut self.classes {
            let key = class.reactants.clone();
            let volume_steps: f64 = key.iter().filter(|&&s| mobile(s)).map(|&s| step(s)).sum();
            let factor = match class.kind {
                ReactionKind::Unimolecular => 0.0,
                ReactionKind::VolumeVolume => {
                    let denom = conc * pi * r * r * volume_steps;
                    if denom > 0.0 { dt / denom } else { 0.0 }
                }
                ReactionKind::VolumeSurface => {
                    let denom = conc * volume_steps / 2.0;
                    if denom > 0.0 { dt / denom } else { 0.0 }
                }
                ReactionKind::VolumeWall => {
                    if volume_steps > 0.0 { 2.0 * dt / (l * volume_steps) } else { 0.0 }
                }
                ReactionKind::SurfaceSurface => dt / (l * l),
                ReactionKind::Trimolecular => {
                    let denom = conc * conc * pi * r * r * volume_steps * (4.0 / 3.0) * pi * r * r * r;
                    if denom > 0.0 { dt / denom } else { 0.0 }
                }
            };

            if class.kind == ReactionKind::Unimolecular {
                let total: f64 = class.pathways.iter().map(|p| p.rate).sum();
                for p in &mut class.pathways {
                    p.probability = if total > 0.0 { p.rate / total } else { 0.0 };
                }
                class.refresh_thresholds();
                continue;
            }

            for p in &mut class.pathways {
                p.probability = p.rate * factor;
            }
            class.refresh_thresholds();

            if class.max_fixed_p > 1.0 {
                let names = key
                    .iter()
                    .map(|&s| species.name(s))
                    .collect::<Vec<_>>()
                    .join("+");
                match self.overflow_policy {
                    NotifyLevel::Error => {
                        return Err(ModelError::ProbabilityOverflow {
                            reactants: names,
                            total: class.max_fixed_p,
                        })
                    }
                    NotifyLevel::Warn => {
                        log::warn!(
                            "reaction probability {:.4} for {names} exceeds 1; scaling pathways down",
                            class.max_fixed_p
                        );
                        class.rescale(1.0 / class.max_fixed_p);
                    }
                    NotifyLevel::Cope => class.rescale(1.0 / class.max_fixed_p),
                }
            }
        }
        Ok(())
    }

    /// Number of classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of standard pathways.
    pub fn pathway_count(&self) -> usize {
        self.pathway_names.len()
    }

    /// Name of a pathway.
    pub fn pathway_name(&self, p: PathwayIndex) -> Option<&str> {
        self.pathway_names.get(p.index()).map(String::as_str)
    }

    /// A class by table index.
    pub fn class(&self, index: usize) -> &ReactionClass {
        &self.classes[index]
    }

    /// All classes.
    pub fn classes(&self) -> &[ReactionClass] {
        &self.classes
    }

    /// Class index for an unordered reactant set.
    pub fn find(&self, species: &[SpeciesId]) -> Option<usize> {
        self.by_key.get(&key_of(species)).copied()
    }

    /// Unimolecular class of `species`.
    pub fn unimolecular(&self, species: SpeciesId) -> Option<usize> {
        self.unimolecular.get(species.index()).copied().flatten()
    }

    /// Volume species that `species` can meet in a volume reaction.
    pub fn volume_partners(&self, species: SpeciesId) -> &[SpeciesId] {
        self.volume_partners
            .get(species.index())
            .map_or(&[], |v| v.as_slice())
    }

    /// Surface species that `species` can react with on a neighboring tile.
    pub fn surface_partners(&self, species: SpeciesId) -> &[SpeciesId] {
        self.surface_partners
            .get(species.index())
            .map_or(&[], |v| v.as_slice())
    }

    /// The policy applied when a class's probability exceeds one.
    pub fn overflow_policy(&self) -> NotifyLevel {
        self.overflow_policy
    }

    /// The first candidate whose own class, after dividing by its
    /// scaling, sums to more than one, with that sum.
    pub fn overflowing(&self, candidates: &[Candidate]) -> Option<(usize, f64)> {
        candidates.iter().enumerate().find_map(|(ci, c)| {
            let scale = if c.scaling > 0.0 { c.scaling } else { 1.0 };
            let total: f64 = self.classes[c.class]
                .pathways
                .iter()
                .filter(|p| p.probability > 0.0 && p.matches(&c.participants))
                .map(|p| p.probability / scale)
                .sum();
            (total > 1.0 && distinguishable(total, 1.0, EPS)).then_some((ci, total))
        })
    }

    /// Pick one `(candidate, pathway)` from several viable classes.
    ///
    /// Matching pathway probabilities, each divided by its candidate's
    /// scaling, are accumulated in order. If the total exceeds one it is
    /// normalized so exactly one pathway wins. `draw` is uniform in `[0, 1)`.
    pub fn select_among(&self, candidates: &[Candidate], draw: f64) -> Option<(usize, usize)> {
        let mut weights: SmallVec<[(usize, usize, f64); 8]> = SmallVec::new();
        for (ci, c) in candidates.iter().enumerate() {
            let class = &self.classes[c.class];
            let scale = if c.scaling > 0.0 { c.scaling } else { 1.0 };
            for (pi, p) in class.pathways.iter().enumerate() {
                if p.probability > 0.0 && p.matches(&c.participants) {
                    weights.push((ci, pi, p.probability / scale));
                }
            }
        }
        let total: f64 = weights.iter().map(|w| w.2).sum();
        let target = if total > 1.0 { draw * total } else { draw };
        let mut acc = 0.0;
        for (ci, pi, w) in weights {
            acc += w;
            if target < acc {
                return Some((ci, pi));
            }
        }
        None
    }
}
