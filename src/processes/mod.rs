//! The population dynamics pipeline
//!
//! Stages run in a fixed daily order driven by `simulation::schedule`:
//! mortality, then (at year boundaries) aging and recruitment, then
//! exogenous catches, then periodic aggregate-and-reallocate.

pub mod aggregator;
pub mod aging;
pub mod exogenous;
pub mod mortality;
pub mod reallocator;
pub mod recruitment;

pub use aggregator::aggregate;
pub use aging::{age_cohorts, AgingAndRecruitmentProcess, RecruitAllocationPolicy};
pub use exogenous::{CatchTarget, ExogenousCatches};
pub use mortality::{MortalityProcess, MortalitySource};
pub use reallocator::Reallocator;
pub use recruitment::RecruitmentBySpawningBiomass;
