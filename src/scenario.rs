use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::{
    biome::Biome,
    climate::{ClimateStatisticsProvider, ClimateVariable, CsvStatisticsLoader, SeasonalStatistics},
    config::EcologyConfig,
    ecology::{FaunaTraits, FaunaType, FloraTraits},
    engine::EngineSettings,
};

fn default_days() -> u64 {
    365
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_snow_height() -> f64 {
    0.0
}

fn default_variation() -> f64 {
    0.1
}

fn default_start_day() -> u16 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_days")]
    pub days: u64,
    #[serde(default = "default_start_day")]
    pub start_day: u16,
    #[serde(default)]
    pub logging: LoggingSettings,
    pub region: RegionSpec,
    /// Metres of snow on every cell at the start.
    #[serde(default = "default_snow_height")]
    pub initial_snow_height: f64,
    pub climate: ClimateSource,
    #[serde(default)]
    pub ecology: EcologyConfig,
    pub species: SpeciesCatalog,
    pub rosters: BTreeMap<Biome, Roster>,
    /// Each roster density is scaled by a uniform factor in `1 ± variation`.
    #[serde(default = "default_variation")]
    pub variation: f64,
    #[serde(default)]
    pub introductions: Vec<Introduction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Rectangle of longitude/latitude sampled at `step` degrees, or an explicit
/// list of `[longitude, latitude]` cell centres.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSpec {
    pub step: f64,
    #[serde(default)]
    pub lat_min: f64,
    #[serde(default)]
    pub lat_max: f64,
    #[serde(default)]
    pub lon_min: f64,
    #[serde(default)]
    pub lon_max: f64,
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClimateSource {
    #[serde(default)]
    pub seasonal: Option<SeasonalStatistics>,
    #[serde(default)]
    pub files: Option<ClimateFiles>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClimateFiles {
    /// Resolved against the scenario file's directory.
    #[serde(default)]
    pub base_dir: PathBuf,
    pub tables: BTreeMap<Biome, BTreeMap<ClimateVariable, PathBuf>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesCatalog {
    #[serde(default)]
    pub flora: Vec<FloraTraits>,
    #[serde(default)]
    pub fauna: Vec<FaunaTraits>,
}

impl SpeciesCatalog {
    pub fn flora(&self, name: &str) -> Option<&FloraTraits> {
        self.flora.iter().find(|traits| traits.name == name)
    }

    pub fn fauna(&self, name: &str) -> Option<&FaunaTraits> {
        self.fauna.iter().find(|traits| traits.name == name)
    }
}

/// Starting densities of a base biome, per km^2.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Roster {
    /// kg of biomass per km^2, by species name.
    #[serde(default)]
    pub flora: BTreeMap<String, f64>,
    /// Individuals per km^2, by species name.
    #[serde(default)]
    pub fauna: BTreeMap<String, f64>,
}

/// Fauna released onto one cell at the start of a run. Without a row and
/// column the centre of the grid is used.
#[derive(Debug, Clone, Deserialize)]
pub struct Introduction {
    pub species: String,
    #[serde(default)]
    pub row: Option<i32>,
    #[serde(default)]
    pub col: Option<i32>,
    pub population_per_km2: f64,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let mut scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if let Some(files) = scenario.climate.files.as_mut() {
            let scenario_dir = path.parent().unwrap_or(self.base_dir.as_path());
            files.base_dir = scenario_dir.join(&files.base_dir);
        }
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn days(&self, override_days: Option<u64>) -> u64 {
        override_days.unwrap_or(self.days)
    }

    pub fn engine_settings(&self, seed: Option<u64>, config: Arc<EcologyConfig>) -> EngineSettings {
        EngineSettings {
            start_day: self.start_day,
            ..EngineSettings::new(self.name.clone(), seed.unwrap_or(self.seed), config)
        }
    }

    pub fn statistics_provider(&self) -> Result<Arc<dyn ClimateStatisticsProvider>> {
        match (&self.climate.seasonal, &self.climate.files) {
            (Some(seasonal), None) => Ok(Arc::new(seasonal.clone())),
            (None, Some(files)) => Ok(Arc::new(
                CsvStatisticsLoader::new(&files.base_dir).with_files(files.tables.clone()),
            )),
            (Some(_), Some(_)) => bail!("climate must name either seasonal curves or files, not both"),
            (None, None) => bail!("climate source is missing"),
        }
    }

    /// Fails on anything the simulation cannot recover from later: bad
    /// species, dangling names, impossible densities.
    pub fn validate(&self) -> Result<()> {
        if !(self.region.step.is_finite() && self.region.step > 0.0) {
            bail!("region step must be positive, got {}", self.region.step);
        }
        if !(0.0..1.0).contains(&self.variation) {
            bail!("variation must be in [0, 1), got {}", self.variation);
        }
        if self.initial_snow_height < 0.0 {
            bail!("initial snow height cannot be negative");
        }
        self.statistics_provider()?;

        let mut seen = BTreeSet::new();
        for traits in &self.species.flora {
            traits.validate()?;
            if !seen.insert(traits.name.as_str()) {
                bail!("species '{}' is defined twice", traits.name);
            }
        }
        for traits in &self.species.fauna {
            traits.validate()?;
            if !seen.insert(traits.name.as_str()) {
                bail!("species '{}' is defined twice", traits.name);
            }
        }

        for traits in &self.species.flora {
            for consumer in &traits.consumers {
                if self.species.fauna(consumer).is_none() {
                    bail!("{} is eaten by unknown fauna '{consumer}'", traits.name);
                }
            }
        }
        for traits in &self.species.fauna {
            for food in &traits.food {
                let known = match traits.kind {
                    FaunaType::Prey => self.species.flora(food).is_some(),
                    FaunaType::Predator => self
                        .species
                        .fauna(food)
                        .is_some_and(|prey| prey.kind == FaunaType::Prey),
                };
                if !known {
                    bail!("{} feeds on unknown species '{food}'", traits.name);
                }
            }
            for hunter in &traits.predators {
                let known = self
                    .species
                    .fauna(hunter)
                    .is_some_and(|predator| predator.kind == FaunaType::Predator);
                if !known {
                    bail!("{} is hunted by unknown predator '{hunter}'", traits.name);
                }
            }
        }

        for (biome, roster) in &self.rosters {
            if !biome.is_base() {
                bail!("rosters can only be given for base biomes, not {biome}");
            }
            for (name, density) in &roster.flora {
                if self.species.flora(name).is_none() {
                    bail!("{biome} roster names unknown flora '{name}'");
                }
                if !(density.is_finite() && *density >= 0.0) {
                    bail!("{biome} roster density for {name} must be non-negative");
                }
            }
            for (name, density) in &roster.fauna {
                if self.species.fauna(name).is_none() {
                    bail!("{biome} roster names unknown fauna '{name}'");
                }
                if !(density.is_finite() && *density >= 0.0) {
                    bail!("{biome} roster density for {name} must be non-negative");
                }
            }
        }

        for introduction in &self.introductions {
            if self.species.fauna(&introduction.species).is_none() {
                bail!("cannot introduce unknown fauna '{}'", introduction.species);
            }
            if !(introduction.population_per_km2.is_finite() && introduction.population_per_km2 >= 0.0) {
                bail!("introduction density for {} must be non-negative", introduction.species);
            }
        }
        Ok(())
    }
}
