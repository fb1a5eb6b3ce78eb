//! Structured abundance: fish counts by subdivision and age bin
//!
//! Counts are non-negative reals (fractional counts represent expected
//! numbers of fish). Biomass is always derived against a meristics table,
//! never stored.

use crate::biology::meristics::Meristics;
use serde::{Deserialize, Serialize};

/// A `[subdivision][bin]` matrix of fish counts for one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAbundance {
    counts: Vec<Vec<f64>>,
}

impl StructuredAbundance {
    /// All-zero abundance with the given shape
    pub fn empty(subdivisions: usize, bins: usize) -> Self {
        Self { counts: vec![vec![0.0; bins]; subdivisions] }
    }

    /// Wrap an existing matrix; rows must be equal length
    pub fn from_counts(counts: Vec<Vec<f64>>) -> Self {
        debug_assert!(counts.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { counts }
    }

    #[inline]
    pub fn subdivisions(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.counts.first().map_or(0, |row| row.len())
    }

    #[inline]
    pub fn get(&self, subdivision: usize, bin: usize) -> f64 {
        self.counts[subdivision][bin]
    }

    #[inline]
    pub fn set(&mut self, subdivision: usize, bin: usize, count: f64) {
        debug_assert!(count >= 0.0, "abundance must stay non-negative");
        self.counts[subdivision][bin] = count;
    }

    #[inline]
    pub fn add(&mut self, subdivision: usize, bin: usize, count: f64) {
        self.counts[subdivision][bin] += count;
    }

    /// Direct row access for hot loops (aging, mortality)
    #[inline]
    pub fn row_mut(&mut self, subdivision: usize) -> &mut [f64] {
        &mut self.counts[subdivision]
    }

    #[inline]
    pub fn row(&self, subdivision: usize) -> &[f64] {
        &self.counts[subdivision]
    }

    /// Total number of fish across all subdivisions and bins
    pub fn total_count(&self) -> f64 {
        self.counts.iter().flatten().sum()
    }

    /// Total biomass in kg against the given meristics
    pub fn biomass(&self, meristics: &Meristics) -> f64 {
        let mut total = 0.0;
        for (sub, row) in self.counts.iter().enumerate() {
            for (bin, count) in row.iter().enumerate() {
                total += count * meristics.weight(sub, bin);
            }
        }
        total
    }

    /// Element-wise sum of many abundances of the same shape
    pub fn sum<'a>(abundances: impl IntoIterator<Item = &'a StructuredAbundance>) -> Option<Self> {
        let mut iter = abundances.into_iter();
        let first = iter.next()?;
        let mut out = first.clone();
        for abundance in iter {
            for (sub, row) in abundance.counts.iter().enumerate() {
                for (bin, count) in row.iter().enumerate() {
                    out.counts[sub][bin] += count;
                }
            }
        }
        Some(out)
    }

    /// Multiply every count by a factor (clamped survival, reallocation share)
    pub fn scale(&mut self, factor: f64) {
        for row in &mut self.counts {
            for count in row.iter_mut() {
                *count *= factor;
            }
        }
    }

    /// Remove up to `target_kg` of biomass, spread proportionally across all
    /// subdivisions and bins. Returns the biomass actually removed.
    ///
    /// With `rounding` set, surviving counts are floored to whole fish and the
    /// removal is re-measured, so the return value stays exact.
    pub fn remove_biomass_proportionally(
        &mut self,
        meristics: &Meristics,
        target_kg: f64,
        rounding: bool,
    ) -> f64 {
        let before = self.biomass(meristics);
        if before <= 0.0 || target_kg <= 0.0 {
            return 0.0;
        }
        let fraction = (target_kg / before).min(1.0);
        let keep = 1.0 - fraction;
        for row in &mut self.counts {
            for count in row.iter_mut() {
                *count *= keep;
                if rounding {
                    *count = count.floor();
                }
            }
        }
        before - self.biomass(meristics)
    }
}
