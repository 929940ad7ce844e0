use steppe::{
    bootstrap::{GridBootstrap, Landscape},
    engine::{DaySummary, EngineBuilder},
    scenario::{Scenario, ScenarioLoader},
    Biome, GridPos,
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario() -> Scenario {
    scenario_loader()
        .load("scenarios/siberia_east.yaml")
        .expect("scenario should load")
}

fn build(scenario: &Scenario, seed: u64) -> (Landscape, EngineBuilder) {
    let landscape = GridBootstrap::with_seed(scenario, seed)
        .build()
        .expect("grid should seed");
    let settings = scenario.engine_settings(Some(seed), landscape.config.clone());
    let builder = EngineBuilder::new(settings).with_standard_systems();
    (landscape, builder)
}

fn run(scenario: &Scenario, seed: u64, days: u64) -> Vec<DaySummary> {
    let (landscape, builder) = build(scenario, seed);
    let mut grid = landscape.grid;
    let mut engine = builder.build();
    let mut summaries = Vec::new();
    engine
        .run_with_hook(&mut grid, days, |summary| summaries.push(summary.clone()))
        .expect("run succeeds");
    summaries
}

#[test]
fn scenario_seeds_every_latitude_band() {
    let scenario = scenario();
    let (landscape, _) = build(&scenario, scenario.seed);
    let counts = landscape.grid.biome_counts();
    assert_eq!(landscape.grid.len(), 15);
    assert_eq!(counts.get(&Biome::SouthernTaiga), Some(&3));
    assert_eq!(counts.get(&Biome::NorthernTaiga), Some(&6));
    assert_eq!(counts.get(&Biome::SouthernTundra), Some(&3));
    assert_eq!(counts.get(&Biome::NorthernTundra), Some(&3));
    assert!(landscape.config.reference_ratios.len() == 4);

    let centre = landscape.grid.get(GridPos::new(2, 1)).expect("centre cell");
    assert!(centre.fauna_named("mammoth").is_some());
    assert_eq!(landscape.grid.steppe_cells(), 0);
}

#[test]
fn same_seed_reproduces_every_day() {
    let scenario = scenario();
    let first = run(&scenario, 99, 40);
    let second = run(&scenario, 99, 40);
    assert_eq!(first, second);

    let other = run(&scenario, 100, 40);
    assert_ne!(first.last(), other.last());
}

#[test]
fn hook_receives_consecutive_calendar_days() {
    let scenario = scenario();
    let summaries = run(&scenario, scenario.seed, 12);
    let days: Vec<u16> = summaries.iter().map(|summary| summary.day).collect();
    assert_eq!(days, (1..=12).collect::<Vec<u16>>());
    assert_eq!(summaries.last().map(|summary| summary.elapsed_days), Some(12));
}

#[test]
fn snow_and_biomass_stay_non_negative_through_winter() {
    let scenario = scenario();
    let (landscape, builder) = build(&scenario, scenario.seed);
    let mut grid = landscape.grid;
    let mut engine = builder.build();
    for _ in 0..120 {
        let summary = engine.step(&mut grid).expect("day runs");
        let biomass = summary.biomass;
        for value in [
            biomass.grass,
            biomass.shrub,
            biomass.tree,
            biomass.moss,
            biomass.prey,
            biomass.predator,
        ] {
            assert!(value >= 0.0 && value.is_finite());
        }
        for (_, cell) in grid.cells() {
            assert!(cell.snow_height() >= 0.0);
            assert!(cell.flora().iter().all(|plant| plant.mass() >= 0.0));
            assert!(cell.fauna().iter().all(|animal| animal.mass() >= 0.0));
        }
    }
}

#[test]
fn mammoths_spread_from_the_release_cell() {
    let scenario = scenario();
    let (landscape, builder) = build(&scenario, scenario.seed);
    let mut grid = landscape.grid;
    let mut engine = builder.build();
    engine.run(&mut grid, 60).expect("run succeeds");
    let occupied = grid
        .cells()
        .filter(|(_, cell)| cell.fauna_named("mammoth").is_some())
        .count();
    assert!(occupied > 1, "mammoths stayed on {occupied} cell");
}
