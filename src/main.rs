use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use steppe::{
    bootstrap::GridBootstrap,
    engine::{EngineBuilder, DAYS_PER_YEAR},
    scenario::ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Mammoth steppe ecosystem runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/siberia_east.yaml")]
    scenario: PathBuf,

    /// Override day count (uses scenario default when omitted)
    #[arg(long)]
    days: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print a summary line every this many days
    #[arg(long, default_value_t = u64::from(DAYS_PER_YEAR))]
    report_every: u64,
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    init_tracing(&scenario.logging.level);

    let seed = cli.seed.unwrap_or(scenario.seed);
    let landscape = GridBootstrap::with_seed(&scenario, seed).build()?;
    let mut grid = landscape.grid;
    let days = scenario.days(cli.days);

    let mut engine = EngineBuilder::new(scenario.engine_settings(Some(seed), landscape.config))
        .with_standard_systems()
        .build();

    let report_every = cli.report_every.max(1);
    engine.run_with_hook(&mut grid, days, |summary| {
        if summary.elapsed_days % report_every == 0 {
            println!(
                "day {:>5} (calendar {:>3}): steppe cells {:>3}, flora {:.3e} kg, prey {:.3e} kg, predators {:.3e} kg",
                summary.elapsed_days,
                summary.day,
                summary.steppe_cells,
                summary.biomass.total_flora(),
                summary.biomass.prey,
                summary.biomass.predator,
            );
        }
    })?;

    println!(
        "Scenario '{}' completed for {} days over {} cells. Biomes: {:?}",
        scenario.name,
        days,
        grid.len(),
        grid.biome_counts()
    );
    Ok(())
}
