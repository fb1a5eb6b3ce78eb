//! Yearly aging and recruitment across the whole map at once
//!
//! Recruitment is computed from the total spawning stock over every cell, so
//! this process runs on all abundance cells simultaneously rather than
//! cell-by-cell. Cohorts advance one bin with survivorship weights, the
//! terminal bin behaves as a plus group, and new recruits enter at bin 0
//! split by the sex ratio at birth.

use crate::biology::local::LocalBiology;
use crate::biology::meristics::Meristics;
use crate::biology::species::SpeciesRegistry;
use crate::core::types::{SpeciesId, Year};
use crate::processes::recruitment::RecruitmentBySpawningBiomass;
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rand::Rng;

/// How recruits are spread across cells before injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecruitAllocationPolicy {
    /// Proportional to each cell's share of total spawning biomass (default)
    SpawningBiomass,
    /// Proportional to each cell's total biomass of the species
    TotalBiomass,
    /// Evenly across all cells
    Uniform,
}

#[derive(Debug)]
pub struct AgingAndRecruitmentProcess {
    recruitment: AHashMap<SpeciesId, RecruitmentBySpawningBiomass>,
    policy: RecruitAllocationPolicy,
    /// Share of recruits entering the female subdivision
    female_fraction: f64,
    rounding: bool,
    /// Guards against double application within the same simulated year
    last_applied_year: Option<Year>,
    last_recruits: AHashMap<SpeciesId, f64>,
}

impl AgingAndRecruitmentProcess {
    pub fn new(
        recruitment: AHashMap<SpeciesId, RecruitmentBySpawningBiomass>,
        policy: RecruitAllocationPolicy,
        female_fraction: f64,
        rounding: bool,
    ) -> Self {
        Self {
            recruitment,
            policy,
            female_fraction,
            rounding,
            last_applied_year: None,
            last_recruits: AHashMap::new(),
        }
    }

    /// Recruits produced for a species at the last application, for reporting
    pub fn last_recruits(&self, species: SpeciesId) -> f64 {
        self.last_recruits.get(&species).copied().unwrap_or(0.0)
    }

    /// Run one year of aging and recruitment over every abundance cell.
    pub fn process(
        &mut self,
        year: Year,
        registry: &SpeciesRegistry,
        map_biologies: &mut [LocalBiology],
        rng: &mut impl Rng,
    ) {
        if self.last_applied_year == Some(year) {
            tracing::debug!("aging already applied for year {}, skipping", year);
            return;
        }
        self.last_applied_year = Some(year);

        let abundance_cells = map_biologies
            .iter()
            .filter(|b| matches!(b, LocalBiology::Abundance(_)))
            .count();
        if abundance_cells == 0 {
            // Model not started yet or biomass-only scenario; recoverable.
            tracing::warn!("no abundance cells available, skipping aging and recruitment");
            return;
        }

        for species in registry.iter() {
            let Some(meristics) = species.meristics() else {
                continue;
            };
            let recruitment = self.recruitment.get(&species.id);

            // Allocation weights are measured before aging touches anything.
            let mut weights = Vec::with_capacity(map_biologies.len());
            let mut total_spawning = 0.0;
            for biology in map_biologies.iter() {
                let LocalBiology::Abundance(inner) = biology else {
                    weights.push(0.0);
                    continue;
                };
                let abundance = inner.abundance(species.id);
                let spawning = recruitment
                    .map(|r| r.spawning_biomass(meristics, abundance))
                    .unwrap_or(0.0);
                total_spawning += spawning;
                weights.push(match self.policy {
                    RecruitAllocationPolicy::SpawningBiomass => spawning,
                    RecruitAllocationPolicy::TotalBiomass => abundance.biomass(meristics),
                    RecruitAllocationPolicy::Uniform => 1.0,
                });
            }

            let mut recruits = match recruitment {
                Some(r) => r.recruits_noisy(total_spawning, rng),
                None => 0.0,
            };
            if self.rounding {
                recruits = recruits.floor();
            }
            self.last_recruits.insert(species.id, recruits);

            for biology in map_biologies.iter_mut() {
                if let LocalBiology::Abundance(inner) = biology {
                    age_cohorts(inner.abundance_mut(species.id), meristics);
                }
            }

            if recruits > 0.0 {
                self.inject_recruits(species.id, meristics, recruits, &weights, map_biologies);
            }
        }
    }

    /// Spread recruits across cells by normalized weight and add them at
    /// bin 0, split by the sex ratio at birth. In rounding mode fractional
    /// leftovers carry forward so no recruit is lost to truncation.
    fn inject_recruits(
        &self,
        species: SpeciesId,
        meristics: &Meristics,
        recruits: f64,
        weights: &[f64],
        map_biologies: &mut [LocalBiology],
    ) {
        let mut total_weight: f64 = weights.iter().sum();
        let uniform;
        let weights: &[f64] = if total_weight > 0.0 {
            weights
        } else {
            // Empty ocean for this species: fall back to an even spread
            tracing::debug!(
                "allocation weights sum to zero for species {}, spreading recruits uniformly",
                species.0
            );
            uniform = vec![1.0; weights.len()];
            total_weight = weights.len() as f64;
            &uniform
        };

        let mut leftover = 0.0;
        for (biology, &weight) in map_biologies.iter_mut().zip(weights) {
            let LocalBiology::Abundance(inner) = biology else {
                continue;
            };
            let ratio = weight / total_weight;
            let mut here = (recruits + leftover) * ratio;
            if self.rounding {
                let whole = here.floor();
                leftover = here - whole;
                here = whole;
            }
            self.add_at_bin_zero(species, inner.abundance_mut(species), meristics, here);
        }

        // Whatever rounding left behind lands on the heaviest cell
        if self.rounding && leftover >= 1.0 {
            let heaviest = weights
                .iter()
                .enumerate()
                .max_by_key(|(_, w)| OrderedFloat(**w))
                .map(|(i, _)| i);
            if let Some(i) = heaviest {
                if let LocalBiology::Abundance(inner) = &mut map_biologies[i] {
                    self.add_at_bin_zero(species, inner.abundance_mut(species), meristics, leftover.floor());
                }
            }
        }
    }

    fn add_at_bin_zero(
        &self,
        species: SpeciesId,
        abundance: &mut crate::biology::abundance::StructuredAbundance,
        meristics: &Meristics,
        recruits: f64,
    ) {
        if recruits <= 0.0 {
            return;
        }
        let subdivisions = meristics.subdivisions();
        if subdivisions == 1 {
            abundance.add(0, 0, recruits);
            return;
        }
        let female = self
            .recruitment
            .get(&species)
            .map(|r| r.female_subdivision())
            .unwrap_or(subdivisions - 1)
            .min(subdivisions - 1);
        let other_share = (1.0 - self.female_fraction) / (subdivisions - 1) as f64;
        for sub in 0..subdivisions {
            let share = if sub == female { self.female_fraction } else { other_share };
            abundance.add(sub, 0, recruits * share);
        }
    }
}

/// Advance every cohort one bin with survivorship weights.
///
/// Shifts run from the terminal bin downward so nothing is overwritten before
/// it is read. The terminal bin is a plus group: it keeps its own survivors
/// and gains those of the second-to-last bin. Bin 0 is left empty for
/// recruits.
pub fn age_cohorts(
    abundance: &mut crate::biology::abundance::StructuredAbundance,
    meristics: &Meristics,
) {
    let bins = meristics.bins();
    for sub in 0..meristics.subdivisions() {
        let survival = |bin: usize| 1.0 - meristics.natural_mortality(sub, bin);
        let row = abundance.row_mut(sub);
        if bins == 1 {
            // Single plus group: survivors stay put
            row[0] *= survival(0);
            continue;
        }
        let terminal = bins - 1;
        row[terminal] = row[terminal] * survival(terminal) + row[terminal - 1] * survival(terminal - 1);
        for bin in (1..terminal).rev() {
            row[bin] = row[bin - 1] * survival(bin - 1);
        }
        row[0] = 0.0;
    }
}
