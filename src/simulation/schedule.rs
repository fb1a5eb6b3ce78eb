//! The daily driver
//!
//! Single-threaded and cooperative: each simulated day runs the pipeline
//! phases in a fixed order, so runs are fully deterministic given a seed.
//!
//!   1. mortality (daily decay; proportional cull on the last day of a year)
//!   2. aging and recruitment, on the last day of a year
//!   3. exogenous catches, on the last day of a year
//!   4. aggregate-then-reallocate, every reallocation interval

use crate::biology::local::BiologyKind;
use crate::biology::species::SpeciesRegistry;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{Step, Year};
use crate::processes::aggregator::aggregate;
use crate::processes::aging::AgingAndRecruitmentProcess;
use crate::processes::exogenous::ExogenousCatches;
use crate::processes::mortality::MortalityProcess;
use crate::processes::reallocator::Reallocator;
use crate::simulation::reporting::Reporter;
use crate::spatial::map::OceanMap;
use rand_chacha::ChaCha8Rng;

#[derive(Debug)]
pub struct Simulation {
    pub config: SimulationConfig,
    pub registry: SpeciesRegistry,
    pub map: OceanMap,
    kind: BiologyKind,
    reallocator: Reallocator,
    mortality: MortalityProcess,
    aging: AgingAndRecruitmentProcess,
    exogenous: ExogenousCatches,
    reporter: Reporter,
    rng: ChaCha8Rng,
    step: Step,
}

impl Simulation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SimulationConfig,
        registry: SpeciesRegistry,
        map: OceanMap,
        kind: BiologyKind,
        reallocator: Reallocator,
        mortality: MortalityProcess,
        aging: AgingAndRecruitmentProcess,
        exogenous: ExogenousCatches,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            config,
            registry,
            map,
            kind,
            reallocator,
            mortality,
            aging,
            exogenous,
            reporter: Reporter::new(),
            rng,
            step: 0,
        }
    }

    #[inline]
    pub fn step_count(&self) -> Step {
        self.step
    }

    #[inline]
    pub fn year(&self) -> Year {
        self.step / self.config.cycle_length_days as u64
    }

    #[inline]
    pub fn day_of_year(&self) -> u32 {
        (self.step % self.config.cycle_length_days as u64) as u32
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Seed the initial spatial distribution from the day-0 grids.
    ///
    /// Call once after construction, with the aggregate initial stock already
    /// loaded into the map (any spatial arrangement; it is overwritten).
    pub fn distribute_initial_stock(&mut self) -> Result<()> {
        self.aggregate_and_reallocate()
    }

    /// Advance the simulation by one day
    pub fn step_day(&mut self) -> Result<()> {
        let year = self.year();
        let year_boundary = self.day_of_year() == self.config.cycle_length_days - 1;

        self.mortality.apply_daily(year, self.map.biologies_mut());

        if year_boundary {
            self.mortality
                .apply_period(year as usize, &self.registry, self.map.biologies_mut());
            self.aging
                .process(year, &self.registry, self.map.biologies_mut(), &mut self.rng);
            self.exogenous
                .step(year, &self.registry, &mut self.map, &mut self.rng);
            self.record_year();
        }

        // Step 0 was already distributed at setup; repeating it here would be
        // an idempotent no-op, so the interval starts counting from step 1.
        if self.step > 0 && self.step % self.config.reallocation_interval_days as u64 == 0 {
            self.aggregate_and_reallocate()?;
        }

        self.step += 1;
        Ok(())
    }

    /// Run whole years; returns the collected report
    pub fn run_years(&mut self, years: u32) -> Result<&Reporter> {
        let days = years as u64 * self.config.cycle_length_days as u64;
        for _ in 0..days {
            self.step_day()?;
        }
        Ok(&self.reporter)
    }

    fn aggregate_and_reallocate(&mut self) -> Result<()> {
        let total = aggregate(self.kind, &self.registry, self.map.biologies().iter());
        self.reallocator
            .reallocate(self.step, &self.registry, &mut self.map, &total)
    }

    fn record_year(&mut self) {
        for species in self.registry.iter() {
            let biomass: f64 = self
                .map
                .biologies()
                .iter()
                .map(|b| b.biomass_of(species))
                .sum();
            self.reporter
                .record(&format!("{} biomass", species.name), biomass);
            self.reporter.record(
                &format!("{} caught", species.name),
                self.exogenous.caught(species.id),
            );
            if species.is_age_structured() {
                self.reporter.record(
                    &format!("{} recruits", species.name),
                    self.aging.last_recruits(species.id),
                );
            }
        }
    }
}
