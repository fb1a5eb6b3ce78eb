//! Scenario files: TOML in, validated `Simulation` out
//!
//! All fatal configuration checks happen here, before the first simulated
//! day: malformed meristics, over-specified mortality, zero-sum or
//! mis-dimensioned grids, and unknown species names all refuse to start the
//! run with a message naming the offender.

use crate::biology::local::{BiologyKind, LocalBiology};
use crate::biology::meristics::Meristics;
use crate::biology::species::{Species, SpeciesRegistry};
use crate::core::config::SimulationConfig;
use crate::core::error::{PelagosError, Result};
use crate::core::types::{BinClassifier, CellIndex, GridKey, SpeciesId};
use crate::processes::aging::{AgingAndRecruitmentProcess, RecruitAllocationPolicy};
use crate::processes::exogenous::{CatchTarget, ExogenousCatches};
use crate::processes::mortality::{MortalityProcess, MortalitySource};
use crate::processes::reallocator::Reallocator;
use crate::processes::recruitment::RecruitmentBySpawningBiomass;
use crate::simulation::schedule::Simulation;
use crate::spatial::allocation::{AllocationGrids, GridSlice, WeightGrid};
use crate::spatial::loader;
use crate::spatial::map::{MapExtent, OceanMap};
use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    pub kind: BiologyKind,
    #[serde(default)]
    pub config: SimulationConfig,
    pub map: MapSection,
    /// Path to the tabular grid file, relative to the scenario file.
    /// Absent means uniform grids over all water cells.
    pub grid_file: Option<String>,
    pub species: Vec<SpeciesSection>,
    /// Species name (case-insensitive) -> yearly target in kg
    #[serde(default)]
    pub exogenous_catches: AHashMap<String, TargetSpec>,
}

#[derive(Debug, Deserialize)]
pub struct MapSection {
    pub width: u32,
    pub height: u32,
    /// Land cells to exclude; everything else is water
    #[serde(default)]
    pub land: Vec<(u32, u32)>,
}

#[derive(Debug, Deserialize)]
pub struct SpeciesSection {
    pub name: String,
    pub meristics: Option<MeristicsSection>,
    pub recruitment: Option<RecruitmentSection>,
    #[serde(default)]
    pub mortality_sources: Vec<MortalitySourceSection>,
    /// Size-group name per bin, for split allocation grids
    pub bin_groups: Option<Vec<String>>,
    /// Aggregate initial counts [subdivision][bin] (abundance scenarios)
    pub initial_abundance: Option<Vec<Vec<f64>>>,
    /// Aggregate initial stock in kg (biomass scenarios)
    pub initial_biomass: Option<f64>,
    /// Total carrying capacity in kg, spread evenly over water cells
    pub carrying_capacity: Option<f64>,
    /// Yearly instantaneous mortality per elapsed year (biomass scenarios)
    pub instantaneous_mortality: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct MeristicsSection {
    pub weight: Vec<Vec<f64>>,
    pub length: Vec<Vec<f64>>,
    pub natural_mortality: Vec<Vec<f64>>,
    pub maturity: Vec<f64>,
    pub relative_fecundity: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct RecruitmentSection {
    pub virgin_recruits: f64,
    pub steepness: f64,
    pub cumulative_phi: f64,
    #[serde(default)]
    pub female_subdivision: usize,
    #[serde(default)]
    pub use_relative_fecundity: bool,
    #[serde(default)]
    pub noise: f64,
    #[serde(default = "default_allocation")]
    pub allocation: String,
}

fn default_allocation() -> String {
    "spawning_biomass".into()
}

#[derive(Debug, Deserialize)]
pub struct MortalitySourceSection {
    pub name: String,
    /// [period][subdivision][bin] proportional mortality
    pub rates: Vec<Vec<Vec<f64>>>,
}

/// A fixed yearly number or a per-year series
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Fixed(f64),
    Series(Vec<f64>),
}

impl ScenarioFile {
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Validate everything and assemble a ready-to-run simulation.
    ///
    /// `base_dir` anchors the relative grid file path; pass the scenario
    /// file's directory (or any directory for inline scenarios).
    pub fn build(&self, base_dir: &Path, seed: u64) -> Result<Simulation> {
        let registry = self.build_registry()?;
        let classifier = self.build_classifier(&registry);
        let extent = MapExtent::new(self.map.width, self.map.height);
        let mut map = self.build_map(extent, &registry);

        let grids = match &self.grid_file {
            Some(file) => loader::load_from_file(
                &base_dir.join(file),
                &registry,
                extent,
                map.water_cells(),
                self.config.cycle_length_days,
            )?,
            None => self.uniform_grids(&registry, &classifier, extent, map.water_cells())?,
        };

        let mortality = self.build_mortality(&registry)?;
        mortality.validate(&registry)?;
        let aging = self.build_aging(&registry)?;
        let exogenous = self.build_exogenous(&registry)?;

        self.load_initial_stock(&registry, &mut map)?;

        let mut simulation = Simulation::new(
            self.config.clone(),
            registry,
            map,
            self.kind,
            Reallocator::new(grids, classifier)
                .with_conservation_tolerance(self.config.conservation_tolerance),
            mortality,
            aging,
            exogenous,
            ChaCha8Rng::seed_from_u64(seed),
        );
        simulation.distribute_initial_stock()?;
        Ok(simulation)
    }

    fn build_registry(&self) -> Result<SpeciesRegistry> {
        if self.species.is_empty() {
            return Err(PelagosError::Scenario("scenario defines no species".into()));
        }
        let mut species = Vec::with_capacity(self.species.len());
        for (index, section) in self.species.iter().enumerate() {
            let id = SpeciesId(index);
            match (self.kind, &section.meristics) {
                (BiologyKind::Abundance, Some(m)) => {
                    let meristics = Meristics::new(
                        &section.name,
                        m.weight.clone(),
                        m.length.clone(),
                        m.natural_mortality.clone(),
                        m.maturity.clone(),
                        m.relative_fecundity.clone(),
                    )?;
                    species.push(Species::age_structured(id, &section.name, meristics));
                }
                (BiologyKind::Abundance, None) => {
                    return Err(PelagosError::Scenario(format!(
                        "abundance scenario but species {} has no meristics",
                        section.name
                    )));
                }
                (BiologyKind::Biomass, _) => {
                    species.push(Species::biomass_only(id, &section.name));
                }
            }
        }
        Ok(SpeciesRegistry::new(species))
    }

    fn build_classifier(&self, registry: &SpeciesRegistry) -> BinClassifier {
        let mut classifier = BinClassifier::ungrouped();
        for (index, section) in self.species.iter().enumerate() {
            if let Some(groups) = &section.bin_groups {
                let lowered = groups.iter().map(|g| g.to_ascii_lowercase()).collect();
                classifier.insert(registry.get(SpeciesId(index)).id, lowered);
            }
        }
        classifier
    }

    fn build_map(&self, extent: MapExtent, registry: &SpeciesRegistry) -> OceanMap {
        let land: ahash::AHashSet<CellIndex> = self
            .map
            .land
            .iter()
            .map(|&(x, y)| CellIndex::new(x, y))
            .collect();
        let water = (0..extent.height)
            .flat_map(|y| (0..extent.width).map(move |x| CellIndex::new(x, y)))
            .filter(|cell| !land.contains(cell))
            .collect();
        OceanMap::new(extent, water, self.kind, registry)
    }

    /// Uniform grids for every key any pipeline stage will ask for
    fn uniform_grids(
        &self,
        registry: &SpeciesRegistry,
        classifier: &BinClassifier,
        extent: MapExtent,
        water_cells: &[CellIndex],
    ) -> Result<AllocationGrids> {
        let mut slice = GridSlice::default();
        for species in registry.iter() {
            slice.insert(
                GridKey::whole(species.id),
                WeightGrid::uniform_over(extent, water_cells),
            );
            if let Some(meristics) = species.meristics() {
                for bin in 0..meristics.bins() {
                    let key = classifier.key_for(species.id, bin);
                    slice
                        .entry(key)
                        .or_insert_with(|| WeightGrid::uniform_over(extent, water_cells));
                }
            }
        }
        AllocationGrids::new(
            vec![(0, slice)],
            self.config.cycle_length_days,
            extent,
            water_cells,
        )
    }

    fn build_mortality(&self, registry: &SpeciesRegistry) -> Result<MortalityProcess> {
        let mut process = MortalityProcess::new(self.config.cycle_length_days);
        process.set_rounding(self.config.rounding);
        for (index, section) in self.species.iter().enumerate() {
            let id = registry.get(SpeciesId(index)).id;
            for source in &section.mortality_sources {
                process.add_source(
                    id,
                    MortalitySource { name: source.name.clone(), rates: source.rates.clone() },
                );
            }
            if let Some(rates) = &section.instantaneous_mortality {
                if self.kind != BiologyKind::Biomass {
                    return Err(PelagosError::Scenario(format!(
                        "instantaneous mortality on {} only applies to biomass scenarios",
                        section.name
                    )));
                }
                process.set_instantaneous(id, rates.clone());
            }
        }
        Ok(process)
    }

    fn build_aging(&self, registry: &SpeciesRegistry) -> Result<AgingAndRecruitmentProcess> {
        let mut recruitment = AHashMap::new();
        let mut policy = RecruitAllocationPolicy::SpawningBiomass;
        for (index, section) in self.species.iter().enumerate() {
            let Some(r) = &section.recruitment else {
                continue;
            };
            let id = registry.get(SpeciesId(index)).id;
            recruitment.insert(
                id,
                RecruitmentBySpawningBiomass::new(
                    &section.name,
                    r.virgin_recruits,
                    r.steepness,
                    r.cumulative_phi,
                    r.female_subdivision,
                    r.use_relative_fecundity,
                    r.noise,
                )?,
            );
            policy = match r.allocation.as_str() {
                "spawning_biomass" => RecruitAllocationPolicy::SpawningBiomass,
                "total_biomass" => RecruitAllocationPolicy::TotalBiomass,
                "uniform" => RecruitAllocationPolicy::Uniform,
                other => {
                    return Err(PelagosError::Scenario(format!(
                        "unknown recruit allocation policy {:?} for {}",
                        other, section.name
                    )));
                }
            };
        }
        Ok(AgingAndRecruitmentProcess::new(
            recruitment,
            policy,
            self.config.female_fraction_at_birth,
            self.config.rounding,
        ))
    }

    fn build_exogenous(&self, registry: &SpeciesRegistry) -> Result<ExogenousCatches> {
        let mut targets = AHashMap::new();
        for (name, spec) in &self.exogenous_catches {
            let species = registry.by_name(name).ok_or_else(|| {
                PelagosError::Scenario(format!(
                    "exogenous catch target for unknown species {:?}",
                    name
                ))
            })?;
            let target = match spec {
                TargetSpec::Fixed(kg) => CatchTarget::Fixed(*kg),
                TargetSpec::Series(values) => CatchTarget::Series(values.clone()),
            };
            targets.insert(species.id, target);
        }
        Ok(ExogenousCatches::new(
            targets,
            self.config.exogenous_iteration_cap,
            self.config.biomass_epsilon,
            self.config.rounding,
        ))
    }

    /// Park the aggregate initial stock in the first water cell; the initial
    /// reallocation spreads it by the day-0 grids right after.
    fn load_initial_stock(&self, registry: &SpeciesRegistry, map: &mut OceanMap) -> Result<()> {
        if map.cell_count() == 0 {
            return Err(PelagosError::Scenario("map has no water cells".into()));
        }
        let cell_count = map.cell_count() as f64;
        for (index, section) in self.species.iter().enumerate() {
            let species = registry.get(SpeciesId(index));
            match self.kind {
                BiologyKind::Abundance => {
                    let Some(counts) = &section.initial_abundance else {
                        continue;
                    };
                    let meristics = species.meristics().ok_or_else(|| {
                        PelagosError::Scenario(format!("{} has no meristics", species.name))
                    })?;
                    if counts.len() != meristics.subdivisions()
                        || counts.iter().any(|row| row.len() != meristics.bins())
                    {
                        return Err(PelagosError::Scenario(format!(
                            "initial abundance for {} does not match meristics dimensions",
                            species.name
                        )));
                    }
                    if let LocalBiology::Abundance(inner) = map.biology_mut(0) {
                        *inner.abundance_mut(species.id) =
                            crate::biology::abundance::StructuredAbundance::from_counts(
                                counts.clone(),
                            );
                    }
                }
                BiologyKind::Biomass => {
                    // Spread carrying capacity evenly, then park the stock
                    if let Some(total_capacity) = section.carrying_capacity {
                        let per_cell = total_capacity / cell_count;
                        for biology in map.biologies_mut() {
                            if let LocalBiology::Biomass(inner) = biology {
                                inner.set_carrying_capacity(species.id, per_cell);
                            }
                        }
                    }
                    if let Some(kg) = section.initial_biomass {
                        if let LocalBiology::Biomass(inner) = map.biology_mut(0) {
                            inner.overwrite_biomass(species.id, kg);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"
        kind = "abundance"

        [config]
        reallocation_interval_days = 30

        [map]
        width = 2
        height = 2
        land = [[1, 1]]

        [[species]]
        name = "Skipjack"
        initial_abundance = [[1000.0, 500.0], [1000.0, 500.0]]

        [species.meristics]
        weight = [[1.0, 2.5], [1.0, 2.5]]
        length = [[30.0, 60.0], [30.0, 60.0]]
        natural_mortality = [[0.2, 0.2], [0.2, 0.2]]
        maturity = [0.0, 1.0]

        [species.recruitment]
        virgin_recruits = 10000.0
        steepness = 0.8
        cumulative_phi = 1.0
        female_subdivision = 1

        [[species.mortality_sources]]
        name = "fishing"
        rates = [[[0.1, 0.1], [0.1, 0.1]]]

        [exogenous_catches]
        skipjack = 200.0
    "#;

    #[test]
    fn test_demo_scenario_builds() {
        let scenario = ScenarioFile::from_str(DEMO).unwrap();
        let simulation = scenario.build(Path::new("."), 42).unwrap();
        assert_eq!(simulation.map.cell_count(), 3, "one land cell excluded");
        assert_eq!(simulation.registry.len(), 1);
    }

    #[test]
    fn test_initial_stock_spread_by_day_zero_grid() {
        let scenario = ScenarioFile::from_str(DEMO).unwrap();
        let simulation = scenario.build(Path::new("."), 42).unwrap();
        let species = simulation.registry.get(SpeciesId(0));
        // Total biomass: 2 subdivisions * (1000*1.0 + 500*2.5)
        let expected = 2.0 * (1000.0 + 1250.0);
        let per_cell: Vec<f64> = simulation
            .map
            .biologies()
            .iter()
            .map(|b| b.biomass_of(species))
            .collect();
        let total: f64 = per_cell.iter().sum();
        assert!((total - expected).abs() < 1e-6 * expected);
        // Uniform default grid: every water cell holds an equal share
        for kg in &per_cell {
            assert!((kg - expected / 3.0).abs() < 1e-6 * expected);
        }
    }

    #[test]
    fn test_abundance_scenario_without_meristics_refuses_to_start() {
        let text = r#"
            kind = "abundance"
            [map]
            width = 1
            height = 1
            [[species]]
            name = "Skipjack"
        "#;
        let scenario = ScenarioFile::from_str(text).unwrap();
        assert!(scenario.build(Path::new("."), 1).is_err());
    }

    #[test]
    fn test_unknown_exogenous_species_refuses_to_start() {
        let text = r#"
            kind = "biomass"
            [map]
            width = 1
            height = 1
            [[species]]
            name = "Skipjack"
            initial_biomass = 100.0
            [exogenous_catches]
            bigeye = 10.0
        "#;
        let scenario = ScenarioFile::from_str(text).unwrap();
        let err = scenario.build(Path::new("."), 1).unwrap_err();
        assert!(err.to_string().contains("bigeye"));
    }
}
