//! Mortality: time-varying survival applied to every cell
//!
//! Abundance-tracked species use per-[subdivision][bin] proportional
//! mortality rows, one per period (year), from any number of named sources.
//! Sources combine additively as proportions before being subtracted from 1,
//! a competing-risks approximation:
//!
//!   survival = 1 - sum(sources)
//!
//! An over-specified combination (survival below zero) is rejected at setup.
//! Biomass-only species use a yearly instantaneous rate applied daily as
//! `biomass *= exp(-m / cycle_length)`.

use crate::biology::local::LocalBiology;
use crate::biology::species::SpeciesRegistry;
use crate::core::error::{PelagosError, Result};
use crate::core::types::SpeciesId;
use ahash::AHashMap;

/// One named mortality source for one species
#[derive(Debug, Clone)]
pub struct MortalitySource {
    pub name: String,
    /// Proportional mortality at [period][subdivision][bin]; the last period
    /// row is held once the series is exhausted
    pub rates: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug)]
pub struct MortalityProcess {
    proportional: AHashMap<SpeciesId, Vec<MortalitySource>>,
    /// Yearly instantaneous rates per period for biomass-only species
    instantaneous: AHashMap<SpeciesId, Vec<f64>>,
    cycle_length: u32,
    /// Floor surviving counts to whole fish
    rounding: bool,
}

impl MortalityProcess {
    pub fn new(cycle_length: u32) -> Self {
        Self {
            proportional: AHashMap::new(),
            instantaneous: AHashMap::new(),
            cycle_length,
            rounding: false,
        }
    }

    pub fn set_rounding(&mut self, rounding: bool) {
        self.rounding = rounding;
    }

    pub fn add_source(&mut self, species: SpeciesId, source: MortalitySource) {
        self.proportional.entry(species).or_default().push(source);
    }

    pub fn set_instantaneous(&mut self, species: SpeciesId, rates_per_period: Vec<f64>) {
        self.instantaneous.insert(species, rates_per_period);
    }

    /// Setup-time validation: row dimensions must match the meristics and no
    /// combined proportion may exceed 1 in any period.
    pub fn validate(&self, registry: &SpeciesRegistry) -> Result<()> {
        for (&species_id, sources) in &self.proportional {
            let species = registry.get(species_id);
            let meristics = species.meristics().ok_or_else(|| {
                PelagosError::Scenario(format!(
                    "proportional mortality configured for {} which has no age structure",
                    species.name
                ))
            })?;

            for source in sources {
                for (period, row) in source.rates.iter().enumerate() {
                    if row.len() != meristics.subdivisions()
                        || row.iter().any(|bins| bins.len() != meristics.bins())
                    {
                        return Err(PelagosError::Scenario(format!(
                            "mortality source {:?} for {} has wrong dimensions at period {}",
                            source.name, species.name, period
                        )));
                    }
                }
            }

            let periods = sources.iter().map(|s| s.rates.len()).max().unwrap_or(0);
            for period in 0..periods {
                for sub in 0..meristics.subdivisions() {
                    for bin in 0..meristics.bins() {
                        let combined = self.combined_proportion(sources, period, sub, bin);
                        if combined > 1.0 {
                            return Err(PelagosError::OverSpecifiedMortality {
                                species: species.name.clone(),
                                period,
                                subdivision: sub,
                                bin,
                                combined,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Daily decay for biomass-only species
    pub fn apply_daily(&self, year: u64, map_biologies: &mut [LocalBiology]) {
        if self.instantaneous.is_empty() {
            return;
        }
        let mut entries: Vec<_> = self.instantaneous.iter().collect();
        entries.sort_by_key(|(species, _)| species.0);
        for (&species, rates) in entries {
            let Some(rate) = period_value(rates, year as usize) else {
                continue;
            };
            let survival = (-rate / self.cycle_length as f64).exp();
            for biology in map_biologies.iter_mut() {
                if let LocalBiology::Biomass(inner) = biology {
                    inner.scale(species, survival);
                }
            }
        }
    }

    /// Once-per-period proportional cull for abundance-tracked species
    pub fn apply_period(&self, period: usize, registry: &SpeciesRegistry, map_biologies: &mut [LocalBiology]) {
        for species in registry.iter() {
            let species_id = species.id;
            let Some(sources) = self.proportional.get(&species_id) else {
                continue;
            };
            let Some(meristics) = species.meristics() else {
                continue;
            };
            for sub in 0..meristics.subdivisions() {
                for bin in 0..meristics.bins() {
                    let combined = self.combined_proportion(sources, period, sub, bin);
                    // Validation rejects combined > 1 at setup; the clamp only
                    // guards against float dust at runtime.
                    let survival = (1.0 - combined).clamp(0.0, 1.0);
                    for biology in map_biologies.iter_mut() {
                        if let LocalBiology::Abundance(inner) = biology {
                            let abundance = inner.abundance_mut(species_id);
                            let mut survivors = abundance.get(sub, bin) * survival;
                            if self.rounding {
                                survivors = survivors.floor();
                            }
                            abundance.set(sub, bin, survivors);
                        }
                    }
                }
            }
        }
    }

    fn combined_proportion(
        &self,
        sources: &[MortalitySource],
        period: usize,
        sub: usize,
        bin: usize,
    ) -> f64 {
        sources
            .iter()
            .filter_map(|s| period_value(&s.rates, period))
            .map(|row| row[sub][bin])
            .sum()
    }
}

/// Value for a period, holding the last entry once the series runs out
fn period_value<T>(series: &[T], period: usize) -> Option<&T> {
    series.get(period.min(series.len().saturating_sub(1)))
}
