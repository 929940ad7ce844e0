//! Flora and fauna growth rules.
//!
//! Organisms never hold references to each other. Anything a species eats or
//! is eaten by is named, and the owning cell resolves those names against its
//! own organism lists when it builds the inputs for an update.

mod fauna;
mod flora;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fauna::{Fauna, FaunaTraits};
pub use flora::{Flora, FloraConditions, FloraPressures, FloraTraits};

use crate::error::{SimError, SimResult};

/// Penalty cap applied to flora environmental distances.
pub const FLORA_PENALTY_CAP: f64 = 2.0;
/// Penalty cap applied to fauna temperature and food distances.
pub const FAUNA_PENALTY_CAP: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloraType {
    Grass,
    Shrub,
    Tree,
    Moss,
}

impl FloraType {
    pub const ALL: [FloraType; 4] = [
        FloraType::Grass,
        FloraType::Shrub,
        FloraType::Tree,
        FloraType::Moss,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FloraType::Grass => "grass",
            FloraType::Shrub => "shrub",
            FloraType::Tree => "tree",
            FloraType::Moss => "moss",
        }
    }
}

impl fmt::Display for FloraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaunaType {
    Prey,
    Predator,
}

impl FaunaType {
    pub const ALL: [FaunaType; 2] = [FaunaType::Prey, FaunaType::Predator];

    pub fn name(self) -> &'static str {
        match self {
            FaunaType::Prey => "prey",
            FaunaType::Predator => "predator",
        }
    }
}

impl fmt::Display for FaunaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed interval of values an organism thrives in. Written `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct IdealRange {
    min: f64,
    max: f64,
}

impl IdealRange {
    pub fn new(min: f64, max: f64) -> SimResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(SimError::validation(format!(
                "ideal range bounds must be finite, got [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(SimError::validation(format!(
                "ideal range minimum {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// See [`distance_from_ideal`].
    pub fn penalty(&self, value: f64, cap: f64) -> f64 {
        distance_from_ideal(value, self, cap)
    }
}

impl TryFrom<[f64; 2]> for IdealRange {
    type Error = SimError;

    fn try_from([min, max]: [f64; 2]) -> Result<Self, Self::Error> {
        IdealRange::new(min, max)
    }
}

impl From<IdealRange> for [f64; 2] {
    fn from(range: IdealRange) -> Self {
        [range.min, range.max]
    }
}

/// Zero inside the range, otherwise the distance from the midpoint in units
/// of the half-width, negated and capped at `-cap`. A degenerate range
/// (`min == max`) never penalises.
pub fn distance_from_ideal(value: f64, range: &IdealRange, cap: f64) -> f64 {
    if range.min == range.max || range.contains(value) {
        return 0.0;
    }
    let mid = (range.min + range.max) / 2.0;
    let half_width = (range.max - range.min) / 2.0;
    -((value - mid).abs() / half_width).min(cap)
}

/// Penalty for a food supply below the daily minimum, in `[-1, 0]`.
pub fn food_shortage_penalty(available: f64, min_per_day: f64) -> f64 {
    if min_per_day <= 0.0 || available >= min_per_day {
        return 0.0;
    }
    -((min_per_day - available) / min_per_day).min(FAUNA_PENALTY_CAP)
}

pub(crate) fn check_name(name: &str) -> SimResult<()> {
    if name.trim().is_empty() {
        return Err(SimError::validation("species name cannot be empty"));
    }
    Ok(())
}

pub(crate) fn check_non_negative(value: f64, what: &str) -> SimResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::validation(format!(
            "{what} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn check_positive(value: f64, what: &str) -> SimResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::validation(format!(
            "{what} must be positive, got {value}"
        )));
    }
    Ok(())
}

/// Whole individuals represented by `mass`.
pub(crate) fn population_for(mass: f64, avg_mass: f64) -> u64 {
    if avg_mass <= 0.0 || mass <= 0.0 {
        return 0;
    }
    (mass / avg_mass).floor() as u64
}
