//! End-to-end simulation runs driven by scenario files
//!
//! Each test builds a small scenario, runs whole years through the daily
//! scheduler, and checks population-level outcomes: biomass stays finite
//! and non-negative, catches never exceed their targets, identical seeds
//! give identical reports, and the year-boundary processes move stock the
//! way the worked examples predict.

use pelagos::biology::abundance::StructuredAbundance;
use pelagos::biology::local::LocalBiology;
use pelagos::biology::meristics::Meristics;
use pelagos::core::types::{CellIndex, SpeciesId};
use pelagos::processes::aging::age_cohorts;
use pelagos::processes::recruitment::RecruitmentBySpawningBiomass;
use pelagos::simulation::scenario::ScenarioFile;
use std::path::Path;

const ABUNDANCE_SCENARIO: &str = r#"
    kind = "abundance"

    [config]
    reallocation_interval_days = 30

    [map]
    width = 3
    height = 3
    land = [[0, 0], [2, 2]]

    [[species]]
    name = "Skipjack"
    bin_groups = ["small", "small", "large"]
    initial_abundance = [[8000.0, 4000.0, 2000.0], [8000.0, 4000.0, 2000.0]]

    [species.meristics]
    weight = [[0.5, 1.8, 4.0], [0.5, 1.8, 4.0]]
    length = [[25.0, 48.0, 70.0], [25.0, 48.0, 70.0]]
    natural_mortality = [[0.3, 0.2, 0.15], [0.3, 0.2, 0.15]]
    maturity = [0.0, 0.5, 1.0]

    [species.recruitment]
    virgin_recruits = 20000.0
    steepness = 0.85
    cumulative_phi = 1.2
    female_subdivision = 1

    [[species.mortality_sources]]
    name = "purse seine"
    rates = [[[0.05, 0.1, 0.1], [0.05, 0.1, 0.1]]]

    [exogenous_catches]
    skipjack = 500.0
"#;

const BIOMASS_SCENARIO: &str = r#"
    kind = "biomass"

    [map]
    width = 4
    height = 2

    [[species]]
    name = "Yellowfin"
    initial_biomass = 100000.0
    carrying_capacity = 200000.0
    instantaneous_mortality = [0.1, 0.1, 0.2]

    [exogenous_catches]
    yellowfin = [1000.0, 2000.0]
"#;

#[test]
fn abundance_scenario_runs_ten_years() {
    let scenario = ScenarioFile::from_str(ABUNDANCE_SCENARIO).unwrap();
    let mut simulation = scenario.build(Path::new("."), 42).unwrap();
    let reporter = simulation.run_years(10).unwrap();

    let biomass = reporter.column("Skipjack biomass").unwrap();
    assert_eq!(biomass.len(), 10, "one biomass sample per year");
    for (year, &kg) in biomass.iter().enumerate() {
        assert!(kg.is_finite() && kg >= 0.0, "year {}: biomass {}", year, kg);
    }

    let recruits = reporter.column("Skipjack recruits").unwrap();
    assert!(
        recruits.iter().all(|&r| r >= 0.0),
        "recruitment can never go negative"
    );
}

#[test]
fn exogenous_catches_never_exceed_the_target() {
    let scenario = ScenarioFile::from_str(ABUNDANCE_SCENARIO).unwrap();
    let mut simulation = scenario.build(Path::new("."), 7).unwrap();
    let reporter = simulation.run_years(5).unwrap();

    for &kg in reporter.column("Skipjack caught").unwrap() {
        assert!(kg <= 500.0 + 1e-6, "caught {} kg against a 500 kg target", kg);
    }
}

#[test]
fn first_day_does_not_repeat_the_setup_redistribution() {
    let scenario = ScenarioFile::from_str(ABUNDANCE_SCENARIO).unwrap();
    let mut simulation = scenario.build(Path::new("."), 42).unwrap();

    // Empty one water cell after setup. If the first day ran the
    // aggregate-then-reallocate pass again, the uniform grids would refill
    // it from its neighbours.
    let cell = CellIndex::new(1, 0);
    if let LocalBiology::Abundance(inner) = simulation.map.biology_at_mut(cell).unwrap() {
        let abundance = inner.abundance_mut(SpeciesId(0));
        for subdivision in 0..2 {
            for bin in 0..3 {
                abundance.set(subdivision, bin, 0.0);
            }
        }
    }

    simulation.step_day().unwrap();

    let species = simulation.registry.get(SpeciesId(0));
    let kg = simulation.map.biology_at(cell).unwrap().biomass_of(species);
    assert_eq!(kg, 0.0, "redistribution must not run again on the first day");
}

#[test]
fn identical_seeds_replay_identically() {
    let scenario = ScenarioFile::from_str(ABUNDANCE_SCENARIO).unwrap();

    let mut first = scenario.build(Path::new("."), 99).unwrap();
    let mut second = scenario.build(Path::new("."), 99).unwrap();
    first.run_years(4).unwrap();
    second.run_years(4).unwrap();

    assert_eq!(
        first.reporter().column("Skipjack biomass"),
        second.reporter().column("Skipjack biomass"),
        "seeded runs must be bit-for-bit reproducible"
    );
    assert_eq!(
        first.reporter().column("Skipjack caught"),
        second.reporter().column("Skipjack caught"),
    );
}

#[test]
fn heavier_fishing_pressure_leaves_less_biomass() {
    let light = ABUNDANCE_SCENARIO.replace(
        "[[[0.05, 0.1, 0.1], [0.05, 0.1, 0.1]]]",
        "[[[0.01, 0.01, 0.01], [0.01, 0.01, 0.01]]]",
    );
    let heavy = ABUNDANCE_SCENARIO.replace(
        "[[[0.05, 0.1, 0.1], [0.05, 0.1, 0.1]]]",
        "[[[0.4, 0.4, 0.4], [0.4, 0.4, 0.4]]]",
    );

    let mut light_run = ScenarioFile::from_str(&light)
        .unwrap()
        .build(Path::new("."), 11)
        .unwrap();
    let mut heavy_run = ScenarioFile::from_str(&heavy)
        .unwrap()
        .build(Path::new("."), 11)
        .unwrap();
    light_run.run_years(8).unwrap();
    heavy_run.run_years(8).unwrap();

    let light_final = *light_run
        .reporter()
        .column("Skipjack biomass")
        .unwrap()
        .last()
        .unwrap();
    let heavy_final = *heavy_run
        .reporter()
        .column("Skipjack biomass")
        .unwrap()
        .last()
        .unwrap();
    assert!(
        heavy_final < light_final,
        "heavy fishing ended at {} kg, light at {} kg",
        heavy_final,
        light_final
    );
}

#[test]
fn biomass_scenario_depletes_and_records_the_series() {
    let scenario = ScenarioFile::from_str(BIOMASS_SCENARIO).unwrap();
    let mut simulation = scenario.build(Path::new("."), 3).unwrap();
    let reporter = simulation.run_years(3).unwrap();

    let biomass = reporter.column("Yellowfin biomass").unwrap();
    assert_eq!(biomass.len(), 3);
    // Daily exponential decay plus catches only remove stock
    assert!(biomass[0] < 100000.0);
    assert!(
        biomass.windows(2).all(|w| w[1] <= w[0] + 1e-6),
        "no recruitment in the biomass scenario, so the stock can only shrink"
    );

    let caught = reporter.column("Yellowfin caught").unwrap();
    assert!(caught[0] <= 1000.0 + 1e-6);
    assert!(caught[1] <= 2000.0 + 1e-6);
    // Series exhausted: the last value holds
    assert!(caught[2] <= 2000.0 + 1e-6);
}

#[test]
fn aging_moves_the_plus_group_per_the_worked_example() {
    // [100, 100] with 50% natural mortality everywhere: bin 1 receives the
    // survivors of bin 0 plus its own survivors, bin 0 empties for recruits.
    let meristics = Meristics::new(
        "Skipjack",
        vec![vec![1.0, 2.0]],
        vec![vec![30.0, 60.0]],
        vec![vec![0.5, 0.5]],
        vec![0.0, 1.0],
        None,
    )
    .unwrap();
    let mut abundance = StructuredAbundance::from_counts(vec![vec![100.0, 100.0]]);
    age_cohorts(&mut abundance, &meristics);
    assert_eq!(abundance.get(0, 0), 0.0, "bin 0 cleared for recruits");
    assert!(
        (abundance.get(0, 1) - 100.0).abs() < 1e-9,
        "plus group holds 50 aged-in plus 50 surviving residents"
    );
}

#[test]
fn beverton_holt_passes_through_virgin_recruitment() {
    // At S = R0 * phi the Beverton-Holt curve returns R0 exactly
    let recruitment =
        RecruitmentBySpawningBiomass::new("Skipjack", 20000.0, 0.85, 1.2, 0, false, 0.0).unwrap();
    let virgin_spawning_biomass = 20000.0 * 1.2;
    let recruits = recruitment.recruits(virgin_spawning_biomass);
    assert!(
        (recruits - 20000.0).abs() < 1e-6,
        "expected 20000 recruits at virgin biomass, got {}",
        recruits
    );
}

#[test]
fn map_keeps_land_cells_out_of_the_stock() {
    let scenario = ScenarioFile::from_str(ABUNDANCE_SCENARIO).unwrap();
    let simulation = scenario.build(Path::new("."), 5).unwrap();
    assert_eq!(simulation.map.cell_count(), 7, "9 cells minus 2 land");
    for biology in simulation.map.biologies() {
        assert!(matches!(biology, LocalBiology::Abundance(_)));
    }
    let species = simulation.registry.get(SpeciesId(0));
    let total: f64 = simulation
        .map
        .biologies()
        .iter()
        .map(|b| b.biomass_of(species))
        .sum();
    assert!(total > 0.0, "initial stock distributed over water cells");
}
