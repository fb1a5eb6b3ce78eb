//! Per-species static biological parameter tables
//!
//! Weight, length and natural mortality are indexed by [subdivision][bin]
//! (subdivision is typically sex); maturity is per bin. The last bin is a
//! plus group that accumulates all older fish.

use crate::core::error::{PelagosError, Result};
use serde::{Deserialize, Serialize};

/// Immutable biological parameters for one species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meristics {
    subdivisions: usize,
    bins: usize,
    /// Weight in kg at [subdivision][bin]
    weight: Vec<Vec<f64>>,
    /// Length in cm at [subdivision][bin]
    length: Vec<Vec<f64>>,
    /// Yearly proportional natural mortality at [subdivision][bin]
    natural_mortality: Vec<Vec<f64>>,
    /// Probability of being mature at each bin, in [0, 1]
    maturity: Vec<f64>,
    /// Optional relative fecundity weighting per bin (1.0 everywhere if absent)
    relative_fecundity: Option<Vec<f64>>,
}

impl Meristics {
    /// Build and validate a meristics table.
    ///
    /// All matrices must share the same [subdivision][bin] dimensions and the
    /// per-bin arrays must match the bin count; any mismatch is a fatal
    /// configuration error.
    pub fn new(
        species_name: &str,
        weight: Vec<Vec<f64>>,
        length: Vec<Vec<f64>>,
        natural_mortality: Vec<Vec<f64>>,
        maturity: Vec<f64>,
        relative_fecundity: Option<Vec<f64>>,
    ) -> Result<Self> {
        let malformed = |reason: String| PelagosError::MalformedMeristics {
            species: species_name.to_string(),
            reason,
        };

        let subdivisions = weight.len();
        if subdivisions == 0 {
            return Err(malformed("weight table has no subdivisions".into()));
        }
        let bins = weight[0].len();
        if bins == 0 {
            return Err(malformed("weight table has no bins".into()));
        }

        for (label, matrix) in [
            ("weight", &weight),
            ("length", &length),
            ("natural_mortality", &natural_mortality),
        ] {
            if matrix.len() != subdivisions {
                return Err(malformed(format!(
                    "{} has {} subdivisions, expected {}",
                    label,
                    matrix.len(),
                    subdivisions
                )));
            }
            for (sub, row) in matrix.iter().enumerate() {
                if row.len() != bins {
                    return Err(malformed(format!(
                        "{} subdivision {} has {} bins, expected {}",
                        label,
                        sub,
                        row.len(),
                        bins
                    )));
                }
            }
        }

        if maturity.len() != bins {
            return Err(malformed(format!(
                "maturity has {} bins, expected {}",
                maturity.len(),
                bins
            )));
        }
        if let Some(fecundity) = &relative_fecundity {
            if fecundity.len() != bins {
                return Err(malformed(format!(
                    "relative_fecundity has {} bins, expected {}",
                    fecundity.len(),
                    bins
                )));
            }
        }

        Ok(Self {
            subdivisions,
            bins,
            weight,
            length,
            natural_mortality,
            maturity,
            relative_fecundity,
        })
    }

    #[inline]
    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn weight(&self, subdivision: usize, bin: usize) -> f64 {
        self.weight[subdivision][bin]
    }

    #[inline]
    pub fn length(&self, subdivision: usize, bin: usize) -> f64 {
        self.length[subdivision][bin]
    }

    #[inline]
    pub fn natural_mortality(&self, subdivision: usize, bin: usize) -> f64 {
        self.natural_mortality[subdivision][bin]
    }

    #[inline]
    pub fn maturity(&self, bin: usize) -> f64 {
        self.maturity[bin]
    }

    /// Relative fecundity at a bin, defaulting to 1.0 when not configured
    #[inline]
    pub fn relative_fecundity(&self, bin: usize) -> f64 {
        self.relative_fecundity
            .as_ref()
            .map_or(1.0, |f| f[bin])
    }
}
