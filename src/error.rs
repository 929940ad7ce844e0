use thiserror::Error;

use crate::biome::Biome;
use crate::climate::ClimateVariable;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown biome '{0}'")]
    UnknownBiome(String),
    #[error("unknown climate variable '{0}'")]
    UnknownVariable(String),
    #[error("no {variable} data for {biome} on day {day} and no fallback value available")]
    NoData {
        variable: ClimateVariable,
        biome: Biome,
        day: u16,
    },
}

impl SimError {
    pub fn validation(message: impl Into<String>) -> Self {
        SimError::Validation(message.into())
    }
}

/// Rejects any day outside the 1..=365 calendar the climate tables use.
pub fn check_day(day: u16) -> SimResult<()> {
    if (1..=365).contains(&day) {
        Ok(())
    } else {
        Err(SimError::validation(format!(
            "day must be between 1 and 365, got {day}"
        )))
    }
}
