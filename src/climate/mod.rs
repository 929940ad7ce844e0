//! Day-indexed climate statistics and the stochastic generator built on them.

mod generator;
mod loader;
mod seasonal;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use generator::ClimateGenerator;
pub use loader::CsvStatisticsLoader;
pub use seasonal::{SeasonalCurve, SeasonalStatistics};

use crate::biome::Biome;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateVariable {
    Temperature,
    SoilTemperature,
    Snowfall,
    Rainfall,
    Uv,
    SolarRadiation,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 6] = [
        ClimateVariable::Temperature,
        ClimateVariable::SoilTemperature,
        ClimateVariable::Snowfall,
        ClimateVariable::Rainfall,
        ClimateVariable::Uv,
        ClimateVariable::SolarRadiation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClimateVariable::Temperature => "temperature",
            ClimateVariable::SoilTemperature => "soil_temperature",
            ClimateVariable::Snowfall => "snowfall",
            ClimateVariable::Rainfall => "rainfall",
            ClimateVariable::Uv => "uv",
            ClimateVariable::SolarRadiation => "solar_radiation",
        }
    }

    /// Precipitation and radiation samples are floored at zero.
    pub fn is_non_negative(self) -> bool {
        !matches!(
            self,
            ClimateVariable::Temperature | ClimateVariable::SoilTemperature
        )
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClimateVariable {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ClimateVariable::ALL
            .into_iter()
            .find(|variable| variable.name() == wanted)
            .ok_or_else(|| SimError::UnknownVariable(s.to_string()))
    }
}

/// Mean and variance of one variable on one day of the year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateStat {
    pub mean: f64,
    pub variance: f64,
}

impl ClimateStat {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.variance.is_finite() && self.variance >= 0.0
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Statistics keyed by day of year (1-based). Days may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimateTable {
    days: BTreeMap<u16, ClimateStat>,
}

impl ClimateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row, refusing statistics with a negative or non-finite variance.
    pub fn insert(&mut self, day: u16, stat: ClimateStat) -> bool {
        if !stat.is_valid() {
            warn!(day, mean = stat.mean, variance = stat.variance, "rejecting climate statistic");
            return false;
        }
        self.days.insert(day, stat);
        true
    }

    pub fn get(&self, day: u16) -> Option<ClimateStat> {
        self.days.get(&day).copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = u16> + '_ {
        self.days.keys().copied()
    }
}

impl FromIterator<(u16, ClimateStat)> for ClimateTable {
    fn from_iter<I: IntoIterator<Item = (u16, ClimateStat)>>(iter: I) -> Self {
        let mut table = ClimateTable::new();
        for (day, stat) in iter {
            table.insert(day, stat);
        }
        table
    }
}

/// Source of day-indexed statistics for a base biome.
///
/// Implementations never fail: anything unreadable is reported as an empty
/// table, and the generator decides between fallback and error.
pub trait ClimateStatisticsProvider: Send + Sync {
    fn load(&self, biome: Biome, variable: ClimateVariable) -> ClimateTable;
}

/// In-memory provider, mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticStatistics {
    tables: HashMap<(Biome, ClimateVariable), ClimateTable>,
}

impl StaticStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, biome: Biome, variable: ClimateVariable, table: ClimateTable) -> Self {
        self.tables.insert((biome, variable), table);
        self
    }

    /// Same statistic on every day of the year.
    pub fn with_constant(self, biome: Biome, variable: ClimateVariable, stat: ClimateStat) -> Self {
        let table = (1..=365).map(|day| (day, stat)).collect();
        self.with_table(biome, variable, table)
    }
}

impl ClimateStatisticsProvider for StaticStatistics {
    fn load(&self, biome: Biome, variable: ClimateVariable) -> ClimateTable {
        self.tables
            .get(&(biome, variable))
            .cloned()
            .unwrap_or_default()
    }
}
