//! Species identity and the global species registry

use crate::biology::meristics::Meristics;
use crate::core::types::SpeciesId;

/// One fish species in the model
///
/// Age-structured species carry a meristics table; biomass-only species
/// (scenarios that do not track cohorts) carry none.
#[derive(Debug, Clone)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    meristics: Option<Meristics>,
}

impl Species {
    pub fn age_structured(id: SpeciesId, name: impl Into<String>, meristics: Meristics) -> Self {
        Self { id, name: name.into(), meristics: Some(meristics) }
    }

    pub fn biomass_only(id: SpeciesId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), meristics: None }
    }

    #[inline]
    pub fn is_age_structured(&self) -> bool {
        self.meristics.is_some()
    }

    /// Meristics table; only present for age-structured species
    #[inline]
    pub fn meristics(&self) -> Option<&Meristics> {
        self.meristics.as_ref()
    }
}

/// All species in the model, indexed densely by `SpeciesId`
///
/// Immutable after scenario setup.
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
}

impl SpeciesRegistry {
    pub fn new(species: Vec<Species>) -> Self {
        debug_assert!(species.iter().enumerate().all(|(i, s)| s.id.0 == i));
        Self { species }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    #[inline]
    pub fn get(&self, id: SpeciesId) -> &Species {
        &self.species[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Case-insensitive lookup by name, as used by exogenous catch configs
    pub fn by_name(&self, name: &str) -> Option<&Species> {
        self.species
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}
