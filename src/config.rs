//! Immutable tuning values shared by every cell of a simulation.
//!
//! Every field has a default, so a scenario only lists what it overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::biome::{Biome, FloraComposition};
use crate::ecology::{FaunaType, FloraType};

fn default_eta() -> f64 {
    0.75
}

fn default_latent_heat() -> f64 {
    100_000.0
}

fn default_snow_density() -> f64 {
    100.0
}

fn default_compaction() -> f64 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowPhysics {
    /// Fraction of incoming solar radiation that goes into melting.
    #[serde(default = "default_eta")]
    pub melt_efficiency: f64,
    #[serde(default = "default_latent_heat")]
    pub latent_heat_fusion: f64,
    /// kg/m^3
    #[serde(default = "default_snow_density")]
    pub snow_density: f64,
    #[serde(default = "default_compaction")]
    pub compaction_factor: f64,
}

impl Default for SnowPhysics {
    fn default() -> Self {
        Self {
            melt_efficiency: default_eta(),
            latent_heat_fusion: default_latent_heat(),
            snow_density: default_snow_density(),
            compaction_factor: default_compaction(),
        }
    }
}

impl SnowPhysics {
    /// Meltwater in kg/m^2 produced by one day of solar radiation.
    pub fn meltwater_mass(&self, solar_radiation: f64) -> f64 {
        self.melt_efficiency * solar_radiation / self.latent_heat_fusion
    }
}

/// Clamped linear response of a temperature to a change in snow depth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sensitivity {
    pub per_metre: f64,
    pub max_delta: f64,
}

impl Sensitivity {
    pub fn offset(&self, delta_snow: f64) -> f64 {
        (delta_snow * self.per_metre).clamp(-self.max_delta, self.max_delta)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowFeedback {
    /// More snow cools the air.
    pub air: Sensitivity,
    /// More snow insulates and warms the soil.
    pub soil: Sensitivity,
}

impl Default for SnowFeedback {
    fn default() -> Self {
        Self {
            air: Sensitivity {
                per_metre: -2.0,
                max_delta: 1.5,
            },
            soil: Sensitivity {
                per_metre: 5.0,
                max_delta: 3.0,
            },
        }
    }
}

fn default_flora_ceiling() -> f64 {
    1_000_000.0
}

fn default_fauna_ceiling() -> f64 {
    10_000.0
}

/// Density ceilings in kg/km^2 and the mass fraction removed when exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityLimits {
    #[serde(default = "default_flora_ceiling")]
    pub grass: f64,
    #[serde(default = "default_flora_ceiling")]
    pub shrub: f64,
    #[serde(default = "default_flora_ceiling")]
    pub tree: f64,
    #[serde(default = "default_flora_ceiling")]
    pub moss: f64,
    #[serde(default = "default_fauna_ceiling")]
    pub prey: f64,
    #[serde(default = "default_fauna_ceiling")]
    pub predator: f64,
    #[serde(default = "default_flora_reduction")]
    pub flora_reduction: f64,
    #[serde(default = "default_prey_reduction")]
    pub prey_reduction: f64,
    #[serde(default = "default_predator_reduction")]
    pub predator_reduction: f64,
}

fn default_flora_reduction() -> f64 {
    0.10
}

fn default_prey_reduction() -> f64 {
    0.10
}

fn default_predator_reduction() -> f64 {
    0.20
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            grass: default_flora_ceiling(),
            shrub: default_flora_ceiling(),
            tree: default_flora_ceiling(),
            moss: default_flora_ceiling(),
            prey: default_fauna_ceiling(),
            predator: default_fauna_ceiling(),
            flora_reduction: default_flora_reduction(),
            prey_reduction: default_prey_reduction(),
            predator_reduction: default_predator_reduction(),
        }
    }
}

impl CapacityLimits {
    pub fn flora_ceiling(&self, kind: FloraType) -> f64 {
        match kind {
            FloraType::Grass => self.grass,
            FloraType::Shrub => self.shrub,
            FloraType::Tree => self.tree,
            FloraType::Moss => self.moss,
        }
    }

    pub fn fauna_ceiling(&self, kind: FaunaType) -> f64 {
        match kind {
            FaunaType::Prey => self.prey,
            FaunaType::Predator => self.predator,
        }
    }

    pub fn fauna_reduction(&self, kind: FaunaType) -> f64 {
        match kind {
            FaunaType::Prey => self.prey_reduction,
            FaunaType::Predator => self.predator_reduction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trampling {
    /// Applied to the share of the cell trampled by shrub-trampling species.
    pub shrub_rate: f64,
    /// Applied to the share of the cell trampled by all fauna.
    pub tree_rate: f64,
}

impl Default for Trampling {
    fn default() -> Self {
        Self {
            shrub_rate: 0.85,
            tree_rate: 0.08,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteppeThresholds {
    pub min_grass_ratio: f64,
    pub max_shrub_ratio: f64,
    pub ratio_sum_tolerance: f64,
    pub permafrost_days: u32,
}

impl Default for SteppeThresholds {
    fn default() -> Self {
        Self {
            min_grass_ratio: 0.85,
            max_shrub_ratio: 0.15,
            ratio_sum_tolerance: 0.01,
            permafrost_days: 720,
        }
    }
}

impl SteppeThresholds {
    pub fn composition_matches(&self, composition: &FloraComposition) -> bool {
        (composition.sum() - 1.0).abs() <= self.ratio_sum_tolerance
            && composition.grass >= self.min_grass_ratio
            && (0.0..=self.max_shrub_ratio).contains(&composition.shrub)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MigrationOdds {
    pub probability: f64,
    pub mass_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRules {
    pub interval_days: u16,
    pub prey: MigrationOdds,
    pub predator: MigrationOdds,
}

impl Default for MigrationRules {
    fn default() -> Self {
        Self {
            interval_days: 5,
            prey: MigrationOdds {
                probability: 0.5,
                mass_fraction: 0.3,
            },
            predator: MigrationOdds {
                probability: 0.2,
                mass_fraction: 0.3,
            },
        }
    }
}

impl MigrationRules {
    pub fn odds(&self, kind: FaunaType) -> MigrationOdds {
        match kind {
            FaunaType::Prey => self.prey,
            FaunaType::Predator => self.predator,
        }
    }
}

fn default_fallback_window() -> usize {
    7
}

fn default_deep_root_level() -> u8 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcologyConfig {
    #[serde(default)]
    pub snow: SnowPhysics,
    #[serde(default)]
    pub feedback: SnowFeedback,
    #[serde(default)]
    pub capacity: CapacityLimits,
    #[serde(default)]
    pub trampling: Trampling,
    #[serde(default)]
    pub steppe: SteppeThresholds,
    #[serde(default)]
    pub migration: MigrationRules,
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
    /// Flora rooted at or below this soil level feel soil temperature.
    #[serde(default = "default_deep_root_level")]
    pub deep_root_level: u8,
    /// Archetypal grass/shrub/tree/moss split of each base biome.
    #[serde(default)]
    pub reference_ratios: BTreeMap<Biome, FloraComposition>,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            snow: SnowPhysics::default(),
            feedback: SnowFeedback::default(),
            capacity: CapacityLimits::default(),
            trampling: Trampling::default(),
            steppe: SteppeThresholds::default(),
            migration: MigrationRules::default(),
            fallback_window: default_fallback_window(),
            deep_root_level: default_deep_root_level(),
            reference_ratios: BTreeMap::new(),
        }
    }
}

impl EcologyConfig {
    /// Base biome whose reference composition is closest to `composition`.
    pub fn closest_base_biome(&self, composition: &FloraComposition) -> Option<Biome> {
        self.reference_ratios
            .iter()
            .filter(|(biome, _)| biome.is_base())
            .map(|(biome, reference)| (*biome, composition.distance(reference)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(biome, _)| biome)
    }

    pub fn with_reference_ratios(mut self, ratios: BTreeMap<Biome, FloraComposition>) -> Self {
        self.reference_ratios = ratios;
        self
    }
}
