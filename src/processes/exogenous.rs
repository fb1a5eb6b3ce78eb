//! Exogenous catches: remove a configured biomass target from the stock
//!
//! Once per period (year), each configured species loses up to its target in
//! kg, drawn from randomly sampled cells that still hold fishable biomass.
//! Each draw removes `min(remaining, target / eligible_cells_at_start)`,
//! proportionally across bins for abundance species. A bounded iteration cap
//! turns an unreachable target into a logged warning, never an error.

use crate::biology::species::SpeciesRegistry;
use crate::core::types::{SpeciesId, Year};
use crate::spatial::map::OceanMap;
use ahash::AHashMap;
use rand::Rng;

/// Yearly removal target for one species
#[derive(Debug, Clone)]
pub enum CatchTarget {
    /// Same target every year
    Fixed(f64),
    /// One value per elapsed year; the last value holds once exhausted
    Series(Vec<f64>),
}

impl CatchTarget {
    pub fn for_year(&self, year: Year) -> f64 {
        match self {
            CatchTarget::Fixed(kg) => *kg,
            CatchTarget::Series(values) => {
                if values.is_empty() {
                    return 0.0;
                }
                let index = (year as usize).min(values.len() - 1);
                values[index]
            }
        }
    }
}

#[derive(Debug)]
pub struct ExogenousCatches {
    targets: AHashMap<SpeciesId, CatchTarget>,
    /// Biomass actually removed per species this period, for reporting
    caught: AHashMap<SpeciesId, f64>,
    iteration_cap: u32,
    epsilon: f64,
    rounding: bool,
}

impl ExogenousCatches {
    pub fn new(
        targets: AHashMap<SpeciesId, CatchTarget>,
        iteration_cap: u32,
        epsilon: f64,
        rounding: bool,
    ) -> Self {
        Self {
            targets,
            caught: AHashMap::new(),
            iteration_cap,
            epsilon,
            rounding,
        }
    }

    /// Biomass removed for a species in the most recent period
    pub fn caught(&self, species: SpeciesId) -> f64 {
        self.caught.get(&species).copied().unwrap_or(0.0)
    }

    /// Run one period of removals. Resets the per-period accounting first.
    pub fn step(
        &mut self,
        year: Year,
        registry: &SpeciesRegistry,
        map: &mut OceanMap,
        rng: &mut impl Rng,
    ) {
        self.caught.clear();

        // Registry order, not hash order, so RNG consumption is reproducible
        for species in registry.iter() {
            let species_id = species.id;
            let Some(target) = self.targets.get(&species_id) else {
                continue;
            };
            let target_kg = target.for_year(year);
            if target_kg <= 0.0 {
                self.caught.insert(species_id, 0.0);
                continue;
            }

            // Eligible set rebuilt fresh each period: cells with biomass above
            // the negligible-epsilon floor.
            let mut eligible: Vec<usize> = (0..map.cell_count())
                .filter(|&i| map.biology(i).biomass_of(species) > self.epsilon)
                .collect();
            if eligible.is_empty() {
                tracing::warn!(
                    "exogenous catches for {}: no eligible cells this period",
                    species.name
                );
                self.caught.insert(species_id, 0.0);
                continue;
            }

            let chunk = target_kg / eligible.len() as f64;
            let mut remaining = target_kg;
            let mut caught_kg = 0.0;
            let mut iterations = 0u32;

            while remaining > self.epsilon && !eligible.is_empty() {
                iterations += 1;
                if iterations > self.iteration_cap {
                    tracing::warn!(
                        "exogenous catches for {} under-fulfilled: {:.3} kg of {:.3} kg still outstanding after {} iterations",
                        species.name,
                        remaining,
                        target_kg,
                        self.iteration_cap
                    );
                    break;
                }

                let pick = rng.gen_range(0..eligible.len());
                let cell = eligible[pick];
                let take = remaining.min(chunk);
                let removed = map
                    .biology_mut(cell)
                    .remove_biomass(species, take, self.rounding);
                remaining -= removed;
                caught_kg += removed;

                let depleted = map.biology(cell).biomass_of(species) <= self.epsilon;
                if depleted || removed <= 0.0 {
                    eligible.swap_remove(pick);
                }
            }

            // Summed removals, not target minus remaining: rounded removals
            // can floor out more than `take`, and the report must match what
            // actually left the water.
            self.caught.insert(species_id, caught_kg);
        }
    }
}
