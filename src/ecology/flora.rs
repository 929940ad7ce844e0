use serde::{Deserialize, Serialize};

use super::{
    check_name, check_non_negative, check_positive, population_for, FloraType, IdealRange,
    FLORA_PENALTY_CAP,
};
use crate::error::{SimError, SimResult};

fn default_root_depth() -> u8 {
    1
}

/// Species description shared by every instance of a flora species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloraTraits {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FloraType,
    #[serde(default)]
    pub description: String,
    /// kg per individual plant.
    pub avg_mass: f64,
    /// Fractional mass change per day under ideal conditions.
    pub ideal_growth_rate: f64,
    pub temperature: IdealRange,
    pub uv: IdealRange,
    /// Rainfall plus meltwater, kg/m^2 per day.
    pub hydration: IdealRange,
    pub soil_temperature: IdealRange,
    /// Soil level 1 (surface) to 4 (deepest).
    #[serde(default = "default_root_depth")]
    pub root_depth: u8,
    /// Fauna species that graze on this one.
    #[serde(default)]
    pub consumers: Vec<String>,
    /// Trees only: km^2 shaded by one individual.
    #[serde(default)]
    pub canopy_per_tree: f64,
}

impl FloraTraits {
    pub fn validate(&self) -> SimResult<()> {
        check_name(&self.name)?;
        check_positive(self.avg_mass, "average flora mass")?;
        if !self.ideal_growth_rate.is_finite() {
            return Err(SimError::validation(format!(
                "{}: ideal growth rate must be finite",
                self.name
            )));
        }
        if !(1..=4).contains(&self.root_depth) {
            return Err(SimError::validation(format!(
                "{}: root depth must be between 1 and 4, got {}",
                self.name, self.root_depth
            )));
        }
        check_non_negative(self.canopy_per_tree, "tree canopy cover")?;
        if self.consumers.iter().any(|consumer| consumer.trim().is_empty()) {
            return Err(SimError::validation(format!(
                "{}: consumer names cannot be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// Environment seen by one plant on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloraConditions {
    pub temperature: f64,
    pub uv: f64,
    pub hydration: f64,
    /// Present only for deep-rooted species.
    pub soil_temperature: Option<f64>,
}

impl FloraConditions {
    /// UV reaching the understorey scales with the covered share of the cell.
    pub fn shaded(self, canopy_ratio: f64) -> Self {
        Self {
            uv: self.uv * canopy_ratio.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Post-growth adjustments imposed by the cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FloraPressures {
    /// Share of mass removed when the type's density ceiling is exceeded.
    pub capacity_reduction: Option<f64>,
    /// Share of shrub mass lost to trampling by shrub-trampling species.
    pub shrub_trampling: f64,
    /// Share of tree mass lost to trampling by all fauna.
    pub tree_trampling: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flora {
    traits: FloraTraits,
    mass: f64,
    population: u64,
}

impl Flora {
    pub fn new(traits: FloraTraits, mass: f64, population: u64) -> SimResult<Self> {
        traits.validate()?;
        check_non_negative(mass, "flora mass")?;
        Ok(Self {
            traits,
            mass,
            population,
        })
    }

    /// Builds an instance whose population is derived from `mass`.
    pub fn with_mass(traits: FloraTraits, mass: f64) -> SimResult<Self> {
        let population = population_for(mass, traits.avg_mass);
        Self::new(traits, mass, population)
    }

    pub fn name(&self) -> &str {
        &self.traits.name
    }

    pub fn kind(&self) -> FloraType {
        self.traits.kind
    }

    pub fn traits(&self) -> &FloraTraits {
        &self.traits
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass.max(0.0);
    }

    pub fn consumers(&self) -> &[String] {
        &self.traits.consumers
    }

    pub fn is_extinct(&self) -> bool {
        self.mass <= 0.0
    }

    /// km^2 of canopy this species spreads over the cell.
    pub fn canopy_cover(&self) -> f64 {
        match self.traits.kind {
            FloraType::Tree => self.traits.canopy_per_tree * self.population as f64,
            _ => 0.0,
        }
    }

    /// Everything below the canopy loses UV to it.
    pub fn is_shaded(&self) -> bool {
        self.traits.kind != FloraType::Tree
    }

    pub fn has_deep_roots(&self, deep_root_level: u8) -> bool {
        self.traits.root_depth >= deep_root_level
    }

    /// Mean of the per-variable penalties, in `[-2, 0]`.
    pub fn environmental_penalty(&self, conditions: &FloraConditions) -> f64 {
        let traits = &self.traits;
        let mut penalties = vec![
            traits.temperature.penalty(conditions.temperature, FLORA_PENALTY_CAP),
            traits.uv.penalty(conditions.uv, FLORA_PENALTY_CAP),
            traits.hydration.penalty(conditions.hydration, FLORA_PENALTY_CAP),
        ];
        if let Some(soil) = conditions.soil_temperature {
            penalties.push(traits.soil_temperature.penalty(soil, FLORA_PENALTY_CAP));
        }
        penalties.iter().sum::<f64>() / penalties.len() as f64
    }

    pub fn growth_rate(&self, conditions: &FloraConditions) -> f64 {
        self.traits.ideal_growth_rate * (1.0 + self.environmental_penalty(conditions))
    }

    /// One day of growth less grazing. `consumption_rate` is the summed
    /// `population * feeding_rate` of this species' consumers on the cell.
    pub fn grow(&mut self, conditions: &FloraConditions, consumption_rate: f64) {
        let rate = self.growth_rate(conditions) - consumption_rate;
        self.set_mass(self.mass + self.mass * rate);
    }

    pub fn apply_pressures(&mut self, pressures: &FloraPressures) {
        if let Some(reduction) = pressures.capacity_reduction {
            self.set_mass(self.mass * (1.0 - reduction));
        }
        match self.traits.kind {
            FloraType::Shrub => {
                self.set_mass(self.mass * (1.0 - pressures.shrub_trampling).max(0.0));
                self.population = population_for(self.mass, self.traits.avg_mass);
            }
            FloraType::Tree => {
                self.set_mass(self.mass * (1.0 - pressures.tree_trampling).max(0.0));
                self.population = population_for(self.mass, self.traits.avg_mass);
            }
            FloraType::Grass | FloraType::Moss => {}
        }
    }
}
