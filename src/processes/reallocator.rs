//! Reallocation: redistribute an aggregate across all cells by grid weight
//!
//! A reallocation is a full overwrite of every cell's value for every species
//! it touches, never an accumulation, so repeated calls cannot double-count.
//! The reallocator holds no state between calls beyond the immutable grids;
//! the aggregate is passed in fresh each time.

use crate::biology::local::LocalBiology;
use crate::biology::species::SpeciesRegistry;
use crate::core::error::{PelagosError, Result};
use crate::core::types::{BinClassifier, GridKey, Step};
use crate::spatial::allocation::AllocationGrids;
use crate::spatial::map::OceanMap;

#[derive(Debug)]
pub struct Reallocator {
    grids: AllocationGrids,
    classifier: BinClassifier,
    conservation_tolerance: f64,
}

impl Reallocator {
    pub fn new(grids: AllocationGrids, classifier: BinClassifier) -> Self {
        Self { grids, classifier, conservation_tolerance: 1e-6 }
    }

    /// Override the relative tolerance of the conservation post-condition
    pub fn with_conservation_tolerance(mut self, tolerance: f64) -> Self {
        self.conservation_tolerance = tolerance;
        self
    }

    pub fn grids(&self) -> &AllocationGrids {
        &self.grids
    }

    /// Overwrite every cell's stock for every species from the aggregate,
    /// using the grid resolved for `step`.
    ///
    /// The abundance variant reallocates each (subdivision, bin) combination
    /// independently through the size-group classifier, since small and large
    /// fish can be distributed differently.
    pub fn reallocate(
        &self,
        step: Step,
        registry: &SpeciesRegistry,
        map: &mut OceanMap,
        aggregate: &LocalBiology,
    ) -> Result<()> {
        match aggregate {
            LocalBiology::Abundance(total) => {
                for species in registry.iter() {
                    let Some(meristics) = species.meristics() else {
                        continue;
                    };
                    for sub in 0..meristics.subdivisions() {
                        for bin in 0..meristics.bins() {
                            let key = self.classifier.key_for(species.id, bin);
                            let grid = self.grid_at(step, &key)?;
                            let aggregate_count = total.abundance(species.id).get(sub, bin);
                            let (cells, biologies) = map.cells_and_biologies_mut();
                            for (cell, biology) in cells.iter().zip(biologies.iter_mut()) {
                                if let LocalBiology::Abundance(local) = biology {
                                    local
                                        .abundance_mut(species.id)
                                        .set(sub, bin, aggregate_count * grid.get(*cell));
                                }
                            }
                        }
                    }
                }
            }
            LocalBiology::Biomass(total) => {
                for species in registry.iter() {
                    let key = GridKey::whole(species.id);
                    let grid = self.grid_at(step, &key)?;
                    let aggregate_kg = total.biomass(species.id);
                    let (cells, biologies) = map.cells_and_biologies_mut();
                    for (cell, biology) in cells.iter().zip(biologies.iter_mut()) {
                        if let LocalBiology::Biomass(local) = biology {
                            local.overwrite_biomass(species.id, aggregate_kg * grid.get(*cell));
                        }
                    }
                }
            }
        }

        debug_assert!(self.conserved(registry, map, aggregate, self.conservation_tolerance));
        Ok(())
    }

    fn grid_at(
        &self,
        step: Step,
        key: &GridKey,
    ) -> Result<&crate::spatial::allocation::WeightGrid> {
        self.grids
            .grid(step, key)
            .ok_or_else(|| PelagosError::MissingGridKey { key: key.to_string(), step })
    }

    /// Post-condition: per-cell values sum back to the aggregate total
    /// within relative tolerance.
    fn conserved(
        &self,
        registry: &SpeciesRegistry,
        map: &OceanMap,
        aggregate: &LocalBiology,
        tolerance: f64,
    ) -> bool {
        registry.iter().all(|species| {
            let expected = aggregate.biomass_of(species);
            let actual: f64 = map
                .biologies()
                .iter()
                .map(|b| b.biomass_of(species))
                .sum();
            let scale = expected.abs().max(1.0);
            (actual - expected).abs() <= tolerance * scale
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biology::local::{BiologyKind, BiomassLocalBiology};
    use crate::biology::meristics::Meristics;
    use crate::biology::species::Species;
    use crate::core::types::{CellIndex, SpeciesId};
    use crate::spatial::allocation::{GridSlice, WeightGrid};
    use crate::spatial::map::MapExtent;

    fn biomass_registry() -> SpeciesRegistry {
        SpeciesRegistry::new(vec![Species::biomass_only(SpeciesId(0), "Yellowfin")])
    }

    fn quarter_three_quarter_grids(extent: MapExtent) -> AllocationGrids {
        let mut slice = GridSlice::default();
        slice.insert(
            GridKey::whole(SpeciesId(0)),
            WeightGrid::from_weights(2, 1, vec![0.25, 0.75]),
        );
        let water: Vec<CellIndex> = extent.cells().collect();
        AllocationGrids::new(vec![(0, slice)], 365, extent, &water).unwrap()
    }

    #[test]
    fn test_biomass_reallocation_splits_by_weight() {
        // Aggregate of 100 kg over weights {0.25, 0.75} -> 25 kg and 75 kg
        let registry = biomass_registry();
        let extent = MapExtent::new(2, 1);
        let mut map = OceanMap::all_water(extent, BiologyKind::Biomass, &registry);

        let mut inner = BiomassLocalBiology::empty(&registry);
        inner.set_biomass(SpeciesId(0), 100.0);
        let aggregate = LocalBiology::Biomass(inner);

        let reallocator =
            Reallocator::new(quarter_three_quarter_grids(extent), BinClassifier::ungrouped());
        reallocator
            .reallocate(0, &registry, &mut map, &aggregate)
            .unwrap();

        let species = registry.get(SpeciesId(0));
        let at = |x| {
            map.biology_at(CellIndex::new(x, 0))
                .unwrap()
                .biomass_of(species)
        };
        assert!((at(0) - 25.0).abs() < 1e-9);
        assert!((at(1) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_reallocation_overwrites_stale_state() {
        let registry = biomass_registry();
        let extent = MapExtent::new(2, 1);
        let mut map = OceanMap::all_water(extent, BiologyKind::Biomass, &registry);

        // Seed stale values that a pure accumulation would double-count
        for biology in map.biologies_mut() {
            if let LocalBiology::Biomass(inner) = biology {
                inner.set_biomass(SpeciesId(0), 999.0);
            }
        }

        let mut inner = BiomassLocalBiology::empty(&registry);
        inner.set_biomass(SpeciesId(0), 40.0);
        let aggregate = LocalBiology::Biomass(inner);

        let reallocator =
            Reallocator::new(quarter_three_quarter_grids(extent), BinClassifier::ungrouped());
        reallocator
            .reallocate(0, &registry, &mut map, &aggregate)
            .unwrap();

        let species = registry.get(SpeciesId(0));
        let total: f64 = map.biologies().iter().map(|b| b.biomass_of(species)).sum();
        assert!((total - 40.0).abs() < 1e-9, "stale 999s must be overwritten");
    }

    #[test]
    fn test_abundance_reallocation_uses_size_group_grids() {
        let meristics = Meristics::new(
            "Skipjack",
            vec![vec![1.0, 1.0]],
            vec![vec![30.0, 60.0]],
            vec![vec![0.2, 0.2]],
            vec![0.0, 1.0],
            None,
        )
        .unwrap();
        let registry =
            SpeciesRegistry::new(vec![Species::age_structured(SpeciesId(0), "Skipjack", meristics)]);
        let extent = MapExtent::new(2, 1);
        let mut map = OceanMap::all_water(extent, BiologyKind::Abundance, &registry);

        // Small fish all go west, large fish all go east
        let mut slice = GridSlice::default();
        slice.insert(
            GridKey::grouped(SpeciesId(0), "small"),
            WeightGrid::from_weights(2, 1, vec![1.0, 0.0]),
        );
        slice.insert(
            GridKey::grouped(SpeciesId(0), "large"),
            WeightGrid::from_weights(2, 1, vec![0.0, 1.0]),
        );
        let water: Vec<CellIndex> = extent.cells().collect();
        let grids = AllocationGrids::new(vec![(0, slice)], 365, extent, &water).unwrap();

        let mut classifier = BinClassifier::ungrouped();
        classifier.insert(SpeciesId(0), vec!["small".into(), "large".into()]);

        let mut aggregate = LocalBiology::empty(BiologyKind::Abundance, &registry);
        if let LocalBiology::Abundance(inner) = &mut aggregate {
            inner.abundance_mut(SpeciesId(0)).set(0, 0, 80.0);
            inner.abundance_mut(SpeciesId(0)).set(0, 1, 20.0);
        }

        Reallocator::new(grids, classifier)
            .reallocate(0, &registry, &mut map, &aggregate)
            .unwrap();

        let west = map.biology_at(CellIndex::new(0, 0)).unwrap();
        let east = map.biology_at(CellIndex::new(1, 0)).unwrap();
        if let (LocalBiology::Abundance(west), LocalBiology::Abundance(east)) = (west, east) {
            assert_eq!(west.abundance(SpeciesId(0)).get(0, 0), 80.0);
            assert_eq!(west.abundance(SpeciesId(0)).get(0, 1), 0.0);
            assert_eq!(east.abundance(SpeciesId(0)).get(0, 0), 0.0);
            assert_eq!(east.abundance(SpeciesId(0)).get(0, 1), 20.0);
        } else {
            panic!("expected abundance biologies");
        }
    }

    #[test]
    fn test_missing_grid_key_is_fatal() {
        let registry = biomass_registry();
        let extent = MapExtent::new(2, 1);
        let mut map = OceanMap::all_water(extent, BiologyKind::Biomass, &registry);

        // Grids keyed for a different species than the registry's
        let mut slice = GridSlice::default();
        slice.insert(
            GridKey::whole(SpeciesId(7)),
            WeightGrid::from_weights(2, 1, vec![1.0, 1.0]),
        );
        let water: Vec<CellIndex> = extent.cells().collect();
        let grids = AllocationGrids::new(vec![(0, slice)], 365, extent, &water).unwrap();

        let aggregate = LocalBiology::Biomass(BiomassLocalBiology::empty(&registry));
        let result = Reallocator::new(grids, BinClassifier::ungrouped()).reallocate(
            0,
            &registry,
            &mut map,
            &aggregate,
        );
        assert!(matches!(result, Err(PelagosError::MissingGridKey { .. })));
    }
}
