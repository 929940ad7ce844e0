use std::fs;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use steppe::{
    cell::LandCell,
    climate::{ClimateGenerator, ClimateStat, ClimateVariable, CsvStatisticsLoader, StaticStatistics},
    config::{MigrationOdds, MigrationRules},
    ecology::{Fauna, FaunaTraits, FaunaType, Flora, FloraTraits, FloraType, IdealRange},
    Biome, EcologyConfig, GridPos, SpatialGrid,
};

fn calm_weather() -> StaticStatistics {
    let biome = Biome::SouthernTaiga;
    [
        (ClimateVariable::Temperature, 10.0),
        (ClimateVariable::SoilTemperature, 4.0),
        (ClimateVariable::Snowfall, 0.0),
        (ClimateVariable::Rainfall, 2.0),
        (ClimateVariable::Uv, 3.0),
        (ClimateVariable::SolarRadiation, 0.0),
    ]
    .into_iter()
    .fold(StaticStatistics::new(), |stats, (variable, mean)| {
        stats.with_constant(biome, variable, ClimateStat::new(mean, 0.0))
    })
}

fn range(min: f64, max: f64) -> IdealRange {
    IdealRange::new(min, max).expect("valid range")
}

fn cell(id: u64, config: &Arc<EcologyConfig>) -> LandCell {
    let climate = ClimateGenerator::with_seed(
        Biome::SouthernTaiga,
        Arc::new(calm_weather()),
        config,
        id,
    )
    .expect("climate");
    LandCell::new(id, 100.0, 0.0, climate, config.clone()).expect("cell")
}

fn sedge() -> FloraTraits {
    FloraTraits {
        name: "sedge".into(),
        kind: FloraType::Grass,
        description: String::new(),
        avg_mass: 0.01,
        ideal_growth_rate: 0.01,
        temperature: range(0.0, 20.0),
        uv: range(0.0, 6.0),
        hydration: range(0.0, 10.0),
        soil_temperature: range(0.0, 10.0),
        root_depth: 1,
        consumers: Vec::new(),
        canopy_per_tree: 0.0,
    }
}

fn reindeer() -> FaunaTraits {
    FaunaTraits {
        name: "reindeer".into(),
        kind: FaunaType::Prey,
        description: String::new(),
        avg_mass: 100.0,
        ideal_growth_rate: 0.001,
        temperature: range(-40.0, 20.0),
        min_food_per_day: 5.0,
        feeding_rate: 0.0,
        steps_per_day: 0.0,
        foot_area: 0.0,
        tramples_shrubs: false,
        food: vec!["sedge".into()],
        predators: Vec::new(),
        starvation_rate: 0.0,
    }
}

fn wolf() -> FaunaTraits {
    FaunaTraits {
        name: "wolf".into(),
        kind: FaunaType::Predator,
        avg_mass: 40.0,
        ideal_growth_rate: 0.0006,
        temperature: range(-50.0, 30.0),
        min_food_per_day: 3.0,
        feeding_rate: 0.00001,
        food: vec!["reindeer".into()],
        starvation_rate: 0.05,
        ..reindeer()
    }
}

#[test]
fn flora_never_shrinks_without_pressure() {
    let config = Arc::new(EcologyConfig::default());
    let mut cell = cell(1, &config);
    cell.add_flora(Flora::with_mass(sedge(), 500.0).expect("flora"))
        .expect("add");
    let mut previous = 500.0;
    for day in 1..=10 {
        cell.update_snow_height(day).expect("snow");
        cell.update_flora(day).expect("flora");
        let mass = cell.flora_named("sedge").expect("sedge").mass();
        assert!(mass >= previous, "day {day}: {mass} < {previous}");
        previous = mass;
    }
    assert!(previous > 500.0);
}

#[test]
fn predators_without_prey_dwindle() {
    let config = Arc::new(EcologyConfig::default());
    let mut cell = cell(2, &config);
    cell.add_fauna(Fauna::new(wolf(), 200).expect("wolves"))
        .expect("add");
    let start = cell.fauna_named("wolf").expect("wolf").mass();
    let mut previous = start;
    for day in 1..=200u16 {
        cell.update_snow_height(day).expect("snow");
        cell.update_predators(day).expect("predators");
        let mass = cell.fauna_named("wolf").map_or(0.0, Fauna::mass);
        assert!(mass <= previous);
        previous = mass;
    }
    assert!(previous < start * 0.01);
}

#[test]
fn csv_rows_with_negative_variance_fall_back_to_recent_draws() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("temperature.csv"),
        "date,mean_t2m,t2m_var\n2020-01-01,-20.0,0.0\n2020-01-02,-18.0,-1.0\n",
    )
    .expect("write csv");
    let provider = CsvStatisticsLoader::new(dir.path()).with_file(
        Biome::SouthernTundra,
        ClimateVariable::Temperature,
        "temperature.csv",
    );
    let config = EcologyConfig::default();
    let mut climate = ClimateGenerator::with_seed(Biome::SouthernTundra, Arc::new(provider), &config, 4)
        .expect("climate");
    assert_eq!(climate.temperature(1, 0.0).expect("day 1"), -20.0);
    assert_eq!(climate.temperature(2, 0.0).expect("fallback"), -20.0);
    assert!(climate.temperature(3, 0.0).is_ok());
}

#[test]
fn migration_conserves_mass() {
    let config = Arc::new(EcologyConfig::default());
    let mut grid = SpatialGrid::new();
    for col in 0..3 {
        let mut land = cell(col as u64, &config);
        land.add_fauna(Fauna::new(reindeer(), 10 * (col as u64 + 1)).expect("herd"))
            .expect("add");
        grid.insert(GridPos::new(0, col), land);
    }
    let before = grid.fauna_mass("reindeer");
    let rules = MigrationRules {
        interval_days: 1,
        prey: MigrationOdds {
            probability: 1.0,
            mass_fraction: 0.25,
        },
        predator: MigrationOdds {
            probability: 0.0,
            mass_fraction: 0.0,
        },
    };
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut moves = 0;
    for _ in 0..5 {
        moves += grid.migrate(&rules, &mut rng).moves;
    }
    assert_eq!(moves, 15);
    let after = grid.fauna_mass("reindeer");
    assert!((after - before).abs() < 1e-6, "{before} -> {after}");
}
