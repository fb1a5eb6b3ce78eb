//! Time-indexed spatial allocation grids
//!
//! For every indexed day of the annual cycle and every (species, size-group)
//! key there is one weight grid over the full map extent, normalized to sum
//! to 1. Lookups use "most recent at-or-before, wrapping yearly" semantics.

use crate::core::error::{PelagosError, Result};
use crate::core::types::{CellIndex, GridKey, Step};
use crate::spatial::map::MapExtent;
use ahash::{AHashMap, AHashSet};

/// One spatial weight field covering the map extent, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct WeightGrid {
    width: u32,
    height: u32,
    weights: Vec<f64>,
}

impl WeightGrid {
    pub fn zeros(extent: MapExtent) -> Self {
        Self {
            width: extent.width,
            height: extent.height,
            weights: vec![0.0; extent.cell_count()],
        }
    }

    pub fn from_weights(width: u32, height: u32, weights: Vec<f64>) -> Self {
        debug_assert_eq!(weights.len(), width as usize * height as usize);
        Self { width, height, weights }
    }

    /// Uniform grid over the given cells (every listed cell gets equal weight)
    pub fn uniform_over(extent: MapExtent, cells: &[CellIndex]) -> Self {
        let mut grid = Self::zeros(extent);
        if cells.is_empty() {
            return grid;
        }
        let share = 1.0 / cells.len() as f64;
        for cell in cells {
            grid.weights[cell.flat(extent.width)] = share;
        }
        grid
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, cell: CellIndex) -> f64 {
        self.weights[cell.flat(self.width)]
    }

    #[inline]
    pub fn set(&mut self, cell: CellIndex, weight: f64) {
        self.weights[cell.flat(self.width)] = weight;
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Scale so weights sum to 1.0; errors if the total is zero or negative
    fn normalize(&mut self, key: &GridKey, day: u32) -> Result<()> {
        let total = self.sum();
        if total <= 0.0 {
            return Err(PelagosError::ZeroSumGrid { key: key.to_string(), day });
        }
        for w in &mut self.weights {
            *w /= total;
        }
        Ok(())
    }
}

/// One keyed set of grids at a single indexed day
pub type GridSlice = AHashMap<GridKey, WeightGrid>;

/// The full time-indexed grid mapping, immutable after construction
#[derive(Debug)]
pub struct AllocationGrids {
    cycle_length: u32,
    /// Sorted indexed days; days[0] == 0 is guaranteed by construction
    days: Vec<u32>,
    /// Parallel to `days`
    slices: Vec<GridSlice>,
}

impl AllocationGrids {
    /// Build from raw (not necessarily normalized) per-day slices.
    ///
    /// Validates dimensions against the map extent, rejects weight on any
    /// cell outside `water_cells` (reallocation writes only water, so land
    /// weight would silently drop mass), normalizes every grid, checks that
    /// every key present at the first day is present at every day, and
    /// remaps the earliest day to 0 so a floor lookup always exists.
    pub fn new(
        raw: Vec<(u32, GridSlice)>,
        cycle_length: u32,
        extent: MapExtent,
        water_cells: &[CellIndex],
    ) -> Result<Self> {
        if raw.is_empty() {
            return Err(PelagosError::Scenario(
                "allocation grids need at least one indexed day".into(),
            ));
        }

        let water: AHashSet<CellIndex> = water_cells.iter().copied().collect();

        let mut entries = raw;
        entries.sort_by_key(|(day, _)| *day);
        // Guarantee an entry at day 0
        entries[0].0 = 0;

        let mut days = Vec::with_capacity(entries.len());
        let mut slices = Vec::with_capacity(entries.len());
        for (day, mut slice) in entries {
            if day >= cycle_length {
                return Err(PelagosError::Scenario(format!(
                    "indexed day {} is outside the {}-day cycle",
                    day, cycle_length
                )));
            }
            for (key, grid) in slice.iter_mut() {
                if grid.width() != extent.width || grid.height() != extent.height {
                    return Err(PelagosError::GridDimensionMismatch {
                        key: key.to_string(),
                        day,
                        grid_width: grid.width(),
                        grid_height: grid.height(),
                        map_width: extent.width,
                        map_height: extent.height,
                    });
                }
                for cell in extent.cells() {
                    if grid.get(cell) > 0.0 && !water.contains(&cell) {
                        return Err(PelagosError::WeightOnLand {
                            key: key.to_string(),
                            day,
                            x: cell.x,
                            y: cell.y,
                        });
                    }
                }
                grid.normalize(key, day)?;
            }
            days.push(day);
            slices.push(slice);
        }

        // Keys at day 0 must exist at every indexed day
        let first_keys: Vec<GridKey> = slices[0].keys().cloned().collect();
        for (i, slice) in slices.iter().enumerate() {
            for key in &first_keys {
                if !slice.contains_key(key) {
                    return Err(PelagosError::MissingGridSlice {
                        key: key.to_string(),
                        day: days[i],
                    });
                }
            }
        }

        Ok(Self { cycle_length, days, slices })
    }

    #[inline]
    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    /// Indexed days available within one cycle
    pub fn indexed_days(&self) -> &[u32] {
        &self.days
    }

    /// The slice whose indexed day is the greatest one <= step mod cycle.
    ///
    /// Explicit binary search rather than an ordered-map floor, so the yearly
    /// wraparound stays visible: step and step + cycle_length always resolve
    /// to the same slice.
    pub fn at_or_before_step(&self, step: Step) -> &GridSlice {
        let day = (step % self.cycle_length as u64) as u32;
        let pos = self.days.partition_point(|&d| d <= day);
        // days[0] == 0, so pos >= 1 always
        &self.slices[pos - 1]
    }

    /// Grid for a key at a step; `None` means a fatal missing-key condition
    pub fn grid(&self, step: Step, key: &GridKey) -> Option<&WeightGrid> {
        self.at_or_before_step(step).get(key)
    }
}
