//! Aggregation: sum many per-cell biologies into one aggregate
//!
//! Pure summation; inputs are never mutated. Which cells and pools count as
//! aggregable (e.g. excluding biomass held under floating objects) is the
//! caller's concern: pass in exactly the biologies that should participate.

use crate::biology::local::{BiologyKind, LocalBiology};
use crate::biology::species::SpeciesRegistry;
use crate::core::types::SpeciesId;

/// Sum a collection of same-kind biologies into a fresh aggregate.
///
/// Species present in the registry but empty in a given cell contribute
/// zero. Cells of the wrong kind are a programming error upstream and are
/// skipped (debug builds assert).
pub fn aggregate<'a>(
    kind: BiologyKind,
    registry: &SpeciesRegistry,
    cells: impl IntoIterator<Item = &'a LocalBiology>,
) -> LocalBiology {
    let mut total = LocalBiology::empty(kind, registry);
    for cell in cells {
        debug_assert_eq!(cell.kind(), kind, "mixed biology kinds in one aggregation");
        match (&mut total, cell) {
            (LocalBiology::Abundance(sum), LocalBiology::Abundance(cell)) => {
                for species in registry.iter() {
                    let Some(meristics) = species.meristics() else {
                        continue;
                    };
                    let source = cell.abundance(species.id);
                    let target = sum.abundance_mut(species.id);
                    for sub in 0..meristics.subdivisions() {
                        for bin in 0..meristics.bins() {
                            target.add(sub, bin, source.get(sub, bin));
                        }
                    }
                }
            }
            (LocalBiology::Biomass(sum), LocalBiology::Biomass(cell)) => {
                for id in 0..registry.len() {
                    let species = SpeciesId(id);
                    // Aggregates carry totals, not capacities
                    sum.overwrite_biomass(species, sum.biomass(species) + cell.biomass(species));
                }
            }
            _ => {}
        }
    }
    total
}
