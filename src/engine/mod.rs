use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    biome::Biome,
    cell::BiomassTotals,
    config::EcologyConfig,
    grid::{DayPlan, SpatialGrid},
    rng::{RngManager, SystemRng},
    systems::{
        BiomeSystem, CleanupSystem, FaunaSystem, FloraSystem, MigrationSystem, SnowSystem,
    },
};

pub const DAYS_PER_YEAR: u16 = 365;

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    /// Calendar day the run starts on.
    pub start_day: u16,
    pub config: Arc<EcologyConfig>,
}

impl EngineSettings {
    pub fn new(scenario_name: impl Into<String>, seed: u64, config: Arc<EcologyConfig>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            seed,
            start_day: 1,
            config,
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Snow, flora, prey, predators, cleanup, biome, migration.
    pub fn with_standard_systems(self) -> Self {
        self.with_system(SnowSystem::new())
            .with_system(FloraSystem::new())
            .with_system(FaunaSystem::prey())
            .with_system(FaunaSystem::predators())
            .with_system(CleanupSystem::new())
            .with_system(BiomeSystem::new())
            .with_system(MigrationSystem::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            elapsed_days: 0,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    elapsed_days: u64,
    settings: EngineSettings,
}

impl Engine {
    pub fn elapsed_days(&self) -> u64 {
        self.elapsed_days
    }

    /// Calendar day (1..=365) of the next day to run.
    pub fn calendar_day(&self) -> u16 {
        calendar_day(self.settings.start_day, self.elapsed_days)
    }

    pub fn run(&mut self, grid: &mut SpatialGrid, days: u64) -> Result<()> {
        self.run_with_hook(grid, days, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, grid: &mut SpatialGrid, days: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&DaySummary),
    {
        for _ in 0..days {
            let summary = self.step(grid)?;
            hook(&summary);
        }
        Ok(())
    }

    /// Runs every system once for the next day.
    pub fn step(&mut self, grid: &mut SpatialGrid) -> Result<DaySummary> {
        let day = self.calendar_day();
        let plan = DayPlan::for_day(day, self.settings.config.migration.interval_days);
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                day,
                elapsed_days: self.elapsed_days,
                plan,
                config: &self.settings.config,
                scenario_name: &self.settings.scenario_name,
            };
            debug!(system = system.name(), day, "running system");
            system
                .run(&ctx, grid, &mut rng_stream)
                .with_context(|| format!("{} system failed on day {day}", system.name()))?;
        }
        self.elapsed_days += 1;
        let summary = DaySummary::observe(day, self.elapsed_days, grid);
        if day == DAYS_PER_YEAR {
            info!(
                scenario = %self.settings.scenario_name,
                elapsed_days = self.elapsed_days,
                steppe_cells = summary.steppe_cells,
                "simulated year complete"
            );
        }
        Ok(summary)
    }
}

pub fn calendar_day(start_day: u16, elapsed_days: u64) -> u16 {
    let start = u64::from(start_day.clamp(1, DAYS_PER_YEAR)) - 1;
    ((start + elapsed_days) % u64::from(DAYS_PER_YEAR)) as u16 + 1
}

/// State of the grid at the end of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub day: u16,
    pub elapsed_days: u64,
    pub biome_counts: BTreeMap<Biome, usize>,
    pub steppe_cells: usize,
    pub biomass: BiomassTotals,
}

impl DaySummary {
    pub fn observe(day: u16, elapsed_days: u64, grid: &SpatialGrid) -> Self {
        Self {
            day,
            elapsed_days,
            biome_counts: grid.biome_counts(),
            steppe_cells: grid.steppe_cells(),
            biomass: grid.total_biomass(),
        }
    }
}

pub struct SystemContext<'a> {
    /// Calendar day, 1..=365.
    pub day: u16,
    pub elapsed_days: u64,
    pub plan: DayPlan,
    pub config: &'a EcologyConfig,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        grid: &mut SpatialGrid,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
