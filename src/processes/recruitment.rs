//! Recruitment as a function of spawning stock biomass
//!
//! Beverton-Holt parameterized by virgin recruitment, steepness and the
//! cumulative spawning-biomass-per-recruit scale (phi):
//!
//!   R(S) = (4 h R0 S) / (R0 phi (1 - h) + (5 h - 1) S)
//!
//! R(0) = 0, R is monotonically non-decreasing in S, and R approaches R0 as
//! spawning biomass grows.

use crate::biology::abundance::StructuredAbundance;
use crate::biology::meristics::Meristics;
use crate::core::error::{PelagosError, Result};
use rand::Rng;

/// Pure recruitment function: spawning biomass in, number of recruits out
#[derive(Debug, Clone)]
pub struct RecruitmentBySpawningBiomass {
    virgin_recruits: f64,
    steepness: f64,
    cumulative_phi: f64,
    /// Which subdivision holds the reproductive sex
    female_subdivision: usize,
    /// Weight spawning biomass by per-bin relative fecundity
    use_relative_fecundity: bool,
    /// Amplitude of uniform multiplicative noise on recruits; 0 = none
    noise: f64,
}

impl RecruitmentBySpawningBiomass {
    pub fn new(
        species_name: &str,
        virgin_recruits: f64,
        steepness: f64,
        cumulative_phi: f64,
        female_subdivision: usize,
        use_relative_fecundity: bool,
        noise: f64,
    ) -> Result<Self> {
        if virgin_recruits <= 0.0 {
            return Err(PelagosError::Scenario(format!(
                "virgin recruits for {} must be positive, got {}",
                species_name, virgin_recruits
            )));
        }
        // Below 0.2 the Beverton-Holt denominator can cross zero and the
        // curve stops being monotonic.
        if steepness <= 0.2 || steepness > 1.0 {
            return Err(PelagosError::Scenario(format!(
                "steepness for {} must be in (0.2, 1.0], got {}",
                species_name, steepness
            )));
        }
        if cumulative_phi <= 0.0 {
            return Err(PelagosError::Scenario(format!(
                "cumulative phi for {} must be positive, got {}",
                species_name, cumulative_phi
            )));
        }
        if !(0.0..=1.0).contains(&noise) {
            return Err(PelagosError::Scenario(format!(
                "recruitment noise for {} must be in [0, 1], got {}",
                species_name, noise
            )));
        }
        Ok(Self {
            virgin_recruits,
            steepness,
            cumulative_phi,
            female_subdivision,
            use_relative_fecundity,
            noise,
        })
    }

    #[inline]
    pub fn virgin_recruits(&self) -> f64 {
        self.virgin_recruits
    }

    #[inline]
    pub fn female_subdivision(&self) -> usize {
        self.female_subdivision
    }

    /// Spawning biomass of one abundance matrix: mature females times weight
    /// (times relative fecundity when configured)
    pub fn spawning_biomass(&self, meristics: &Meristics, abundance: &StructuredAbundance) -> f64 {
        if self.female_subdivision >= abundance.subdivisions() {
            return 0.0;
        }
        let females = abundance.row(self.female_subdivision);
        let mut total = 0.0;
        for (bin, count) in females.iter().enumerate() {
            let weight = meristics.weight(self.female_subdivision, bin);
            if weight <= 0.0 {
                continue;
            }
            let fecundity = if self.use_relative_fecundity {
                meristics.relative_fecundity(bin)
            } else {
                1.0
            };
            total += count * weight * meristics.maturity(bin) * fecundity;
        }
        total
    }

    /// Number of recruits for a given spawning biomass, without noise
    pub fn recruits(&self, spawning_biomass: f64) -> f64 {
        if spawning_biomass <= 0.0 {
            return 0.0;
        }
        let h = self.steepness;
        let r0 = self.virgin_recruits;
        (4.0 * h * r0 * spawning_biomass)
            / (r0 * self.cumulative_phi * (1.0 - h) + (5.0 * h - 1.0) * spawning_biomass)
    }

    /// Recruits with the configured multiplicative noise applied
    pub fn recruits_noisy(&self, spawning_biomass: f64, rng: &mut impl Rng) -> f64 {
        let base = self.recruits(spawning_biomass);
        if self.noise <= 0.0 || base <= 0.0 {
            return base;
        }
        let epsilon: f64 = rng.gen_range(-self.noise..self.noise);
        (base * (1.0 + epsilon)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn function() -> RecruitmentBySpawningBiomass {
        RecruitmentBySpawningBiomass::new("test", 1_000_000.0, 0.8, 1.0, 0, false, 0.0).unwrap()
    }

    #[test]
    fn test_zero_spawning_biomass_means_zero_recruits() {
        let f = function();
        assert_eq!(f.recruits(0.0), 0.0);
        assert_eq!(f.recruits(-5.0), 0.0);
    }

    #[test]
    fn test_monotonically_non_decreasing() {
        let f = function();
        let mut previous = 0.0;
        for i in 0..2000 {
            let biomass = i as f64 * 1000.0;
            let recruits = f.recruits(biomass);
            assert!(
                recruits >= previous,
                "recruits dropped from {} to {} at biomass {}",
                previous,
                recruits,
                biomass
            );
            previous = recruits;
        }
    }

    #[test]
    fn test_saturates_toward_virgin_recruits() {
        let f = function();
        let near_asymptote = f.recruits(1e15);
        assert!(near_asymptote <= f.virgin_recruits() * 1.001);
        assert!(near_asymptote > f.virgin_recruits() * 0.9);
    }

    #[test]
    fn test_spawning_biomass_counts_only_mature_females() {
        let meristics = Meristics::new(
            "test",
            vec![vec![2.0, 3.0], vec![2.0, 3.0]], // male, female
            vec![vec![30.0, 60.0], vec![30.0, 60.0]],
            vec![vec![0.2, 0.2], vec![0.2, 0.2]],
            vec![0.0, 1.0], // only the second bin is mature
            None,
        )
        .unwrap();
        let f =
            RecruitmentBySpawningBiomass::new("test", 1000.0, 0.8, 1.0, 1, false, 0.0).unwrap();
        let abundance =
            StructuredAbundance::from_counts(vec![vec![50.0, 50.0], vec![10.0, 20.0]]);
        // Only female (sub 1), bin 1: 20 fish * 3 kg * maturity 1
        assert_eq!(f.spawning_biomass(&meristics, &abundance), 60.0);
    }

    #[test]
    fn test_noise_stays_within_amplitude() {
        let f =
            RecruitmentBySpawningBiomass::new("test", 1000.0, 0.8, 1.0, 0, false, 0.1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let base = f.recruits(500.0);
        for _ in 0..100 {
            let noisy = f.recruits_noisy(500.0, &mut rng);
            assert!(noisy >= base * 0.9 && noisy <= base * 1.1);
        }
    }

    #[test]
    fn test_invalid_steepness_rejected() {
        assert!(RecruitmentBySpawningBiomass::new("t", 1000.0, 0.1, 1.0, 0, false, 0.0).is_err());
        assert!(RecruitmentBySpawningBiomass::new("t", 1000.0, 1.5, 1.0, 0, false, 0.0).is_err());
    }
}
