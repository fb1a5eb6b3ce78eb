//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the population dynamics engine
///
/// These defaults reproduce the reference parameterization; scenarios may
/// override any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIME ===
    /// Length of the repeating annual cycle in simulated days
    ///
    /// Allocation grid lookups wrap at this length: step 400 with a 365-day
    /// cycle resolves identically to step 35.
    pub cycle_length_days: u32,

    /// How often the stock is aggregated and redistributed across the map
    ///
    /// Smaller values track the seasonal grids more closely but cost a full
    /// map sweep each time.
    pub reallocation_interval_days: u32,

    // === EXOGENOUS CATCHES ===
    /// Hard cap on removal iterations per species per period
    ///
    /// If the catch target is not met within this many random cell draws the
    /// period ends with an under-fulfilled warning instead of an error.
    pub exogenous_iteration_cap: u32,

    /// Biomass (kg) below which a cell is considered empty
    ///
    /// Cells at or under this level are dropped from the eligible set during
    /// exogenous removal, and removal targets within this epsilon of zero
    /// count as fulfilled.
    pub biomass_epsilon: f64,

    // === RECRUITMENT ===
    /// Fraction of recruits injected into the female subdivision at birth
    ///
    /// The remainder is split evenly across the other subdivisions. Ignored
    /// for species with a single subdivision.
    pub female_fraction_at_birth: f64,

    /// Round fish counts to whole individuals after recruitment and removal
    ///
    /// Leftover fractions are carried across cells during recruit allocation
    /// so rounding does not bleed total abundance.
    pub rounding: bool,

    // === NUMERICS ===
    /// Relative tolerance for the aggregate-then-reallocate conservation check
    pub conservation_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cycle_length_days: 365,
            reallocation_interval_days: 30,
            exogenous_iteration_cap: 10_000,
            biomass_epsilon: 1e-6,
            female_fraction_at_birth: 0.5,
            rounding: false,
            conservation_tolerance: 1e-6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = SimulationConfig::default();
        assert_eq!(config.cycle_length_days, 365);
        assert!(config.biomass_epsilon > 0.0);
        assert!(config.female_fraction_at_birth >= 0.0 && config.female_fraction_at_birth <= 1.0);
    }
}
