//! Pelagos - spatial, age-structured fish population dynamics
//!
//! The biology core of an agent-based fisheries model: aggregates
//! distributed stock state, redistributes it through seasonal allocation
//! grids, ages cohorts, applies mortality, computes recruitment from
//! spawning biomass, and absorbs externally specified catches.

pub mod biology;
pub mod core;
pub mod processes;
pub mod simulation;
pub mod spatial;
