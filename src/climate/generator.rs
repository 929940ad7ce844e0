use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::{info, warn};

use super::{ClimateStatisticsProvider, ClimateTable, ClimateVariable};
use crate::biome::{Biome, FloraComposition};
use crate::config::{EcologyConfig, SnowFeedback, SteppeThresholds};
use crate::error::{check_day, SimError, SimResult};

/// Draws daily weather for one cell from its biome's statistics.
///
/// Tables are pulled from the provider the first time a variable is asked
/// for and dropped whenever the biome changes. Each variable keeps a short
/// ring of recent draws that stands in for days the tables do not cover.
pub struct ClimateGenerator {
    biome: Biome,
    original_biome: Option<Biome>,
    provider: Arc<dyn ClimateStatisticsProvider>,
    tables: HashMap<ClimateVariable, ClimateTable>,
    recent: HashMap<ClimateVariable, VecDeque<f64>>,
    fallback_window: usize,
    feedback: SnowFeedback,
    steppe: SteppeThresholds,
    consecutive_frozen_soil_days: u32,
    rng: ChaCha8Rng,
}

impl ClimateGenerator {
    pub fn new(
        biome: Biome,
        provider: Arc<dyn ClimateStatisticsProvider>,
        config: &EcologyConfig,
        rng: ChaCha8Rng,
    ) -> SimResult<Self> {
        if !biome.is_base() {
            return Err(SimError::validation(
                "a climate generator must start in a base biome",
            ));
        }
        if config.fallback_window == 0 {
            return Err(SimError::validation("fallback window must hold at least one day"));
        }
        Ok(Self {
            biome,
            original_biome: None,
            provider,
            tables: HashMap::new(),
            recent: HashMap::new(),
            fallback_window: config.fallback_window,
            feedback: config.feedback.clone(),
            steppe: config.steppe.clone(),
            consecutive_frozen_soil_days: 0,
            rng,
        })
    }

    pub fn with_seed(
        biome: Biome,
        provider: Arc<dyn ClimateStatisticsProvider>,
        config: &EcologyConfig,
        seed: u64,
    ) -> SimResult<Self> {
        Self::new(biome, provider, config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    /// Base biome remembered while the steppe overlay is active.
    pub fn original_biome(&self) -> Option<Biome> {
        self.original_biome
    }

    /// Biome whose statistics drive the weather. Steppe borrows from the
    /// base biome it emerged from.
    pub fn statistics_biome(&self) -> Biome {
        self.original_biome.unwrap_or(self.biome)
    }

    pub fn set_biome(&mut self, biome: Biome) {
        if biome == self.biome {
            return;
        }
        if biome == Biome::MammothSteppe {
            self.original_biome = Some(self.biome);
        } else {
            self.original_biome = None;
        }
        info!(from = %self.biome, to = %biome, "changing climate biome");
        self.biome = biome;
        self.tables.clear();
    }

    pub fn set_biome_named(&mut self, name: &str) -> SimResult<()> {
        self.set_biome(name.parse::<Biome>()?);
        Ok(())
    }

    pub fn consecutive_frozen_soil_days(&self) -> u32 {
        self.consecutive_frozen_soil_days
    }

    pub fn is_permafrost(&self) -> bool {
        self.consecutive_frozen_soil_days >= self.steppe.permafrost_days
    }

    pub fn is_steppe(&self, composition: &FloraComposition) -> bool {
        self.is_permafrost() && self.steppe.composition_matches(composition)
    }

    /// 2 m air temperature; fresh snow cools the air.
    pub fn temperature(&mut self, day: u16, delta_snow: f64) -> SimResult<f64> {
        let offset = self.feedback.air.offset(delta_snow);
        self.sample(ClimateVariable::Temperature, day, offset)
    }

    /// Deep soil temperature; fresh snow insulates the ground.
    pub fn soil_temperature(&mut self, day: u16, delta_snow: f64) -> SimResult<f64> {
        let offset = self.feedback.soil.offset(delta_snow);
        let value = self.sample(ClimateVariable::SoilTemperature, day, offset)?;
        self.record_soil_temperature(value);
        Ok(value)
    }

    pub fn snowfall(&mut self, day: u16) -> SimResult<f64> {
        self.sample(ClimateVariable::Snowfall, day, 0.0)
    }

    pub fn rainfall(&mut self, day: u16) -> SimResult<f64> {
        self.sample(ClimateVariable::Rainfall, day, 0.0)
    }

    pub fn uv(&mut self, day: u16) -> SimResult<f64> {
        self.sample(ClimateVariable::Uv, day, 0.0)
    }

    pub fn solar_radiation(&mut self, day: u16) -> SimResult<f64> {
        self.sample(ClimateVariable::SolarRadiation, day, 0.0)
    }

    pub(crate) fn record_soil_temperature(&mut self, value: f64) {
        if value < 0.0 {
            self.consecutive_frozen_soil_days = self.consecutive_frozen_soil_days.saturating_add(1);
        } else {
            self.consecutive_frozen_soil_days = 0;
        }
    }

    fn sample(&mut self, variable: ClimateVariable, day: u16, offset: f64) -> SimResult<f64> {
        check_day(day)?;
        let Some(stat) = self.table(variable).get(day) else {
            return self.fallback(variable, day);
        };
        let normal = Normal::new(stat.mean + offset, stat.std_dev()).map_err(|err| {
            SimError::validation(format!("bad {variable} statistic on day {day}: {err}"))
        })?;
        let mut value = normal.sample(&mut self.rng);
        if variable.is_non_negative() {
            value = value.max(0.0);
        }
        self.remember(variable, value);
        Ok(value)
    }

    fn table(&mut self, variable: ClimateVariable) -> &ClimateTable {
        let biome = self.statistics_biome();
        let provider = &self.provider;
        self.tables
            .entry(variable)
            .or_insert_with(|| provider.load(biome, variable))
    }

    fn remember(&mut self, variable: ClimateVariable, value: f64) {
        let ring = self.recent.entry(variable).or_default();
        ring.push_back(value);
        while ring.len() > self.fallback_window {
            ring.pop_front();
        }
    }

    fn fallback(&self, variable: ClimateVariable, day: u16) -> SimResult<f64> {
        let value = self
            .recent
            .get(&variable)
            .and_then(|ring| ring.iter().rev().copied().find(|value| value.is_finite()));
        match value {
            Some(value) => {
                warn!(%variable, day, value, "no statistic for day, using recent value");
                Ok(value)
            }
            None => Err(SimError::NoData {
                variable,
                biome: self.statistics_biome(),
                day,
            }),
        }
    }
}
