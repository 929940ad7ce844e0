use serde::{Deserialize, Serialize};

use super::{
    check_name, check_non_negative, check_positive, food_shortage_penalty, population_for,
    FaunaType, IdealRange, FAUNA_PENALTY_CAP,
};
use crate::error::{SimError, SimResult};

/// Species description shared by every herd or pack of a fauna species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaunaTraits {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FaunaType,
    #[serde(default)]
    pub description: String,
    /// kg per individual.
    pub avg_mass: f64,
    pub ideal_growth_rate: f64,
    pub temperature: IdealRange,
    /// kg of food per day below which the species starts to suffer.
    pub min_food_per_day: f64,
    /// Fraction of the food species' mass one individual eats per day.
    pub feeding_rate: f64,
    pub steps_per_day: f64,
    /// km^2 covered by one footprint set.
    pub foot_area: f64,
    /// Heavy enough to flatten shrubs.
    #[serde(default)]
    pub tramples_shrubs: bool,
    /// Species eaten: flora for prey, prey for predators.
    #[serde(default)]
    pub food: Vec<String>,
    /// Species that hunt this one. Prey only.
    #[serde(default)]
    pub predators: Vec<String>,
    /// Daily mass fraction lost at a complete food shortage. Zero keeps the
    /// plain growth curve.
    #[serde(default)]
    pub starvation_rate: f64,
}

impl FaunaTraits {
    pub fn validate(&self) -> SimResult<()> {
        check_name(&self.name)?;
        check_positive(self.avg_mass, "average fauna mass")?;
        check_non_negative(self.min_food_per_day, "minimum food per day")?;
        check_non_negative(self.feeding_rate, "feeding rate")?;
        check_non_negative(self.steps_per_day, "steps per day")?;
        check_non_negative(self.foot_area, "foot area")?;
        check_non_negative(self.starvation_rate, "starvation rate")?;
        if !self.ideal_growth_rate.is_finite() {
            return Err(SimError::validation(format!(
                "{}: ideal growth rate must be finite",
                self.name
            )));
        }
        if self.kind == FaunaType::Predator && !self.predators.is_empty() {
            return Err(SimError::validation(format!(
                "{}: predators are not hunted in this model",
                self.name
            )));
        }
        let mut names = self.food.iter().chain(self.predators.iter());
        if names.any(|name| name.trim().is_empty()) {
            return Err(SimError::validation(format!(
                "{}: food and predator names cannot be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// A herd or pack; total mass is the primary quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Fauna {
    traits: FaunaTraits,
    mass: f64,
    population: u64,
}

impl Fauna {
    pub fn new(traits: FaunaTraits, population: u64) -> SimResult<Self> {
        traits.validate()?;
        let mass = population as f64 * traits.avg_mass;
        Ok(Self {
            traits,
            mass,
            population,
        })
    }

    pub fn with_mass(traits: FaunaTraits, mass: f64) -> SimResult<Self> {
        traits.validate()?;
        check_non_negative(mass, "fauna mass")?;
        let population = population_for(mass, traits.avg_mass);
        Ok(Self {
            traits,
            mass,
            population,
        })
    }

    pub fn name(&self) -> &str {
        &self.traits.name
    }

    pub fn kind(&self) -> FaunaType {
        self.traits.kind
    }

    pub fn traits(&self) -> &FaunaTraits {
        &self.traits
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn food(&self) -> &[String] {
        &self.traits.food
    }

    pub fn predators(&self) -> &[String] {
        &self.traits.predators
    }

    pub fn is_extinct(&self) -> bool {
        self.mass <= 0.0
    }

    /// Sets mass (floored at zero) and recounts individuals.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass.max(0.0);
        self.population = population_for(self.mass, self.traits.avg_mass);
    }

    /// Rate at which this group eats whatever it feeds on.
    pub fn consumption_rate(&self) -> f64 {
        self.population as f64 * self.traits.feeding_rate
    }

    /// km^2 walked over per day.
    pub fn trampled_area(&self) -> f64 {
        self.traits.foot_area * self.traits.steps_per_day * self.population as f64
    }

    /// Mean of the temperature and food penalties, in `[-1, 0]`.
    pub fn environmental_penalty(&self, temperature: f64, food: f64) -> f64 {
        let temp = self.traits.temperature.penalty(temperature, FAUNA_PENALTY_CAP);
        let food = food_shortage_penalty(food, self.traits.min_food_per_day);
        (temp + food) / 2.0
    }

    pub fn growth_rate(&self, temperature: f64, food: f64) -> f64 {
        let g = self.traits.ideal_growth_rate;
        let scaled = g * (1.0 + self.environmental_penalty(temperature, food) / 2.0);
        let starvation =
            self.traits.starvation_rate * -food_shortage_penalty(food, self.traits.min_food_per_day);
        match self.traits.kind {
            FaunaType::Prey => g + scaled - starvation,
            FaunaType::Predator => scaled - starvation,
        }
    }

    /// One day of growth. `predation` is the summed consumption rate of the
    /// predators present and is ignored for predators themselves.
    pub fn grow(&mut self, temperature: f64, food: f64, predation: f64) {
        let mut rate = self.growth_rate(temperature, food);
        if self.traits.kind == FaunaType::Prey {
            rate -= predation;
        }
        self.set_mass(self.mass + self.mass * rate);
    }

    pub fn reduce(&mut self, fraction: f64) {
        self.set_mass(self.mass * (1.0 - fraction));
    }

    /// Moves `mass` out of this group into a new one of the same species.
    pub fn split_off(&mut self, mass: f64) -> Fauna {
        let moved = mass.clamp(0.0, self.mass);
        self.set_mass(self.mass - moved);
        Fauna {
            traits: self.traits.clone(),
            mass: moved,
            population: population_for(moved, self.traits.avg_mass),
        }
    }

    pub fn absorb(&mut self, mass: f64) {
        self.set_mass(self.mass + mass);
    }
}
