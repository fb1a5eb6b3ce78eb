//! Biological state: species, meristics, and per-cell stock containers

pub mod abundance;
pub mod local;
pub mod meristics;
pub mod species;

pub use abundance::StructuredAbundance;
pub use local::{AbundanceLocalBiology, BiologyKind, BiomassLocalBiology, LocalBiology};
pub use meristics::Meristics;
pub use species::{Species, SpeciesRegistry};
