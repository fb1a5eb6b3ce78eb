//! The discretized ocean: a raster of cells, each holding local stock state
//!
//! Cell storage is struct-of-arrays: an ordered list of water cell
//! coordinates and a parallel vector of biologies, with a hash index for
//! coordinate lookups.

use crate::biology::local::{BiologyKind, LocalBiology};
use crate::biology::species::SpeciesRegistry;
use crate::core::types::CellIndex;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Width and height of the map raster, used to validate grid files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapExtent {
    pub width: u32,
    pub height: u32,
}

impl MapExtent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Every cell in the extent, row-major
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| CellIndex::new(x, y)))
    }
}

/// The simulated ocean grid
#[derive(Debug)]
pub struct OceanMap {
    extent: MapExtent,
    /// Fishable cells in a fixed, deterministic order
    water_cells: Vec<CellIndex>,
    /// Parallel to `water_cells`
    biologies: Vec<LocalBiology>,
    index_of: AHashMap<CellIndex, usize>,
}

impl OceanMap {
    /// Build a map where every cell in `water_cells` is fishable.
    ///
    /// Out-of-extent coordinates and duplicates are dropped. Cell order is
    /// preserved: it defines the deterministic iteration order used by every
    /// process.
    pub fn new(
        extent: MapExtent,
        water_cells: Vec<CellIndex>,
        kind: BiologyKind,
        registry: &SpeciesRegistry,
    ) -> Self {
        let mut cells = Vec::with_capacity(water_cells.len());
        let mut index_of = AHashMap::with_capacity(water_cells.len());
        for cell in water_cells {
            if extent.contains(cell) && !index_of.contains_key(&cell) {
                index_of.insert(cell, cells.len());
                cells.push(cell);
            }
        }
        let biologies = cells
            .iter()
            .map(|_| LocalBiology::empty(kind, registry))
            .collect();
        Self { extent, water_cells: cells, biologies, index_of }
    }

    /// All-water map covering the full extent
    pub fn all_water(extent: MapExtent, kind: BiologyKind, registry: &SpeciesRegistry) -> Self {
        Self::new(extent, extent.cells().collect(), kind, registry)
    }

    #[inline]
    pub fn extent(&self) -> MapExtent {
        self.extent
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.water_cells.len()
    }

    /// Ordered list of fishable cells
    #[inline]
    pub fn water_cells(&self) -> &[CellIndex] {
        &self.water_cells
    }

    pub fn biology_at(&self, cell: CellIndex) -> Option<&LocalBiology> {
        self.index_of.get(&cell).map(|&i| &self.biologies[i])
    }

    pub fn biology_at_mut(&mut self, cell: CellIndex) -> Option<&mut LocalBiology> {
        self.index_of.get(&cell).map(|&i| &mut self.biologies[i])
    }

    #[inline]
    pub fn biology(&self, index: usize) -> &LocalBiology {
        &self.biologies[index]
    }

    #[inline]
    pub fn biology_mut(&mut self, index: usize) -> &mut LocalBiology {
        &mut self.biologies[index]
    }

    pub fn biologies(&self) -> &[LocalBiology] {
        &self.biologies
    }

    pub fn biologies_mut(&mut self) -> &mut [LocalBiology] {
        &mut self.biologies
    }

    /// Split borrow: cell coordinates and mutable biologies together
    pub fn cells_and_biologies_mut(&mut self) -> (&[CellIndex], &mut [LocalBiology]) {
        (&self.water_cells, &mut self.biologies)
    }
}
