//! Core type definitions used throughout the codebase

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Simulated day counter since the start of the run
pub type Step = u64;

/// Simulated year counter (step / cycle length)
pub type Year = u64;

/// Index of a species in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

/// Grid coordinates of one ocean cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub x: u32,
    pub y: u32,
}

impl CellIndex {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Row-major flat index into a width-wide raster
    #[inline]
    pub fn flat(&self, width: u32) -> usize {
        (self.y as usize) * (width as usize) + self.x as usize
    }
}

/// Lookup key for an allocation grid: a species, optionally narrowed to a
/// named size group (e.g. "small" / "large") when small and large fish are
/// distributed differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridKey {
    pub species: SpeciesId,
    pub group: Option<String>,
}

impl GridKey {
    /// Key covering the whole species, no size split
    pub fn whole(species: SpeciesId) -> Self {
        Self { species, group: None }
    }

    pub fn grouped(species: SpeciesId, group: impl Into<String>) -> Self {
        Self { species, group: Some(group.into()) }
    }
}

impl std::fmt::Display for GridKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group {
            Some(g) => write!(f, "species {}:{}", self.species.0, g),
            None => write!(f, "species {}", self.species.0),
        }
    }
}

/// Maps (species, bin) to the size-group tag used for grid lookups.
///
/// Species without an entry are not split: every bin resolves to the
/// whole-species key.
#[derive(Debug, Clone, Default)]
pub struct BinClassifier {
    groups: AHashMap<SpeciesId, Vec<String>>,
}

impl BinClassifier {
    /// Classifier that never splits any species
    pub fn ungrouped() -> Self {
        Self::default()
    }

    /// Assign one group name per bin for a species
    pub fn insert(&mut self, species: SpeciesId, per_bin: Vec<String>) {
        self.groups.insert(species, per_bin);
    }

    /// The grid key to use for this species at this bin
    pub fn key_for(&self, species: SpeciesId, bin: usize) -> GridKey {
        match self.groups.get(&species).and_then(|g| g.get(bin)) {
            Some(name) => GridKey::grouped(species, name.clone()),
            None => GridKey::whole(species),
        }
    }
}
