//! Per-cell stock containers
//!
//! A cell either tracks a full `StructuredAbundance` per species or just a
//! scalar biomass with a carrying capacity, depending on the scenario. The
//! two representations flow through parallel pipeline variants; code branches
//! on the variant once, at each stage boundary.

use crate::biology::abundance::StructuredAbundance;
use crate::biology::species::{Species, SpeciesRegistry};
use crate::core::types::SpeciesId;
use serde::{Deserialize, Serialize};

/// Which stock representation a scenario uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiologyKind {
    Abundance,
    Biomass,
}

/// Stock state held by one ocean cell (or by an aggregate of cells)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocalBiology {
    Abundance(AbundanceLocalBiology),
    Biomass(BiomassLocalBiology),
}

impl LocalBiology {
    /// Fresh, empty biology of the given kind shaped for the registry
    pub fn empty(kind: BiologyKind, registry: &SpeciesRegistry) -> Self {
        match kind {
            BiologyKind::Abundance => {
                LocalBiology::Abundance(AbundanceLocalBiology::empty(registry))
            }
            BiologyKind::Biomass => LocalBiology::Biomass(BiomassLocalBiology::empty(registry)),
        }
    }

    pub fn kind(&self) -> BiologyKind {
        match self {
            LocalBiology::Abundance(_) => BiologyKind::Abundance,
            LocalBiology::Biomass(_) => BiologyKind::Biomass,
        }
    }

    /// Biomass of one species in kg, derived or stored depending on variant
    pub fn biomass_of(&self, species: &Species) -> f64 {
        match self {
            LocalBiology::Abundance(inner) => inner.biomass_of(species),
            LocalBiology::Biomass(inner) => inner.biomass(species.id),
        }
    }

    /// Remove up to `target_kg` of one species, returning the amount removed
    pub fn remove_biomass(&mut self, species: &Species, target_kg: f64, rounding: bool) -> f64 {
        match self {
            LocalBiology::Abundance(inner) => {
                let Some(meristics) = species.meristics() else {
                    return 0.0;
                };
                inner
                    .abundance_mut(species.id)
                    .remove_biomass_proportionally(meristics, target_kg, rounding)
            }
            LocalBiology::Biomass(inner) => inner.remove(species.id, target_kg),
        }
    }
}

/// Abundance-based cell state: one count matrix per species
///
/// Biomass-only species get a zero-shaped slot so indexing stays dense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceLocalBiology {
    slots: Vec<StructuredAbundance>,
}

impl AbundanceLocalBiology {
    pub fn empty(registry: &SpeciesRegistry) -> Self {
        let slots = registry
            .iter()
            .map(|species| match species.meristics() {
                Some(m) => StructuredAbundance::empty(m.subdivisions(), m.bins()),
                None => StructuredAbundance::empty(0, 0),
            })
            .collect();
        Self { slots }
    }

    #[inline]
    pub fn abundance(&self, species: SpeciesId) -> &StructuredAbundance {
        &self.slots[species.0]
    }

    #[inline]
    pub fn abundance_mut(&mut self, species: SpeciesId) -> &mut StructuredAbundance {
        &mut self.slots[species.0]
    }

    pub fn biomass_of(&self, species: &Species) -> f64 {
        match species.meristics() {
            Some(meristics) => self.slots[species.id.0].biomass(meristics),
            None => 0.0,
        }
    }
}

/// Biomass-based cell state: scalar stock per species with carrying capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomassLocalBiology {
    current: Vec<f64>,
    carrying_capacity: Vec<f64>,
}

impl BiomassLocalBiology {
    pub fn empty(registry: &SpeciesRegistry) -> Self {
        Self {
            current: vec![0.0; registry.len()],
            carrying_capacity: vec![f64::INFINITY; registry.len()],
        }
    }

    pub fn with_capacity(current: Vec<f64>, carrying_capacity: Vec<f64>) -> Self {
        debug_assert_eq!(current.len(), carrying_capacity.len());
        Self { current, carrying_capacity }
    }

    #[inline]
    pub fn biomass(&self, species: SpeciesId) -> f64 {
        self.current[species.0]
    }

    #[inline]
    pub fn carrying_capacity(&self, species: SpeciesId) -> f64 {
        self.carrying_capacity[species.0]
    }

    /// Set the stock level, clamped into [0, carrying capacity]
    pub fn set_biomass(&mut self, species: SpeciesId, kg: f64) {
        self.current[species.0] = kg.clamp(0.0, self.carrying_capacity[species.0]);
    }

    /// Set the stock level without the capacity clamp.
    ///
    /// Reallocation must land exactly `aggregate * weight` in each cell to
    /// conserve totals, even where that transiently exceeds capacity.
    pub fn overwrite_biomass(&mut self, species: SpeciesId, kg: f64) {
        self.current[species.0] = kg.max(0.0);
    }

    pub fn set_carrying_capacity(&mut self, species: SpeciesId, kg: f64) {
        self.carrying_capacity[species.0] = kg;
    }

    /// Multiply the stock by a survival factor
    pub fn scale(&mut self, species: SpeciesId, factor: f64) {
        self.current[species.0] *= factor;
    }

    fn remove(&mut self, species: SpeciesId, target_kg: f64) -> f64 {
        let available = self.current[species.0];
        let removed = target_kg.min(available).max(0.0);
        self.current[species.0] = available - removed;
        removed
    }
}
