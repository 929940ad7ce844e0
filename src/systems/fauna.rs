use anyhow::{Context, Result};

use crate::{
    ecology::FaunaType,
    engine::{System, SystemContext},
    grid::SpatialGrid,
    rng::SystemRng,
};

/// Grows one trophic level of fauna on the days the schedule gives it.
pub struct FaunaSystem {
    kind: FaunaType,
}

impl FaunaSystem {
    pub fn new(kind: FaunaType) -> Self {
        Self { kind }
    }

    pub fn prey() -> Self {
        Self::new(FaunaType::Prey)
    }

    pub fn predators() -> Self {
        Self::new(FaunaType::Predator)
    }
}

impl System for FaunaSystem {
    fn name(&self) -> &str {
        match self.kind {
            FaunaType::Prey => "prey",
            FaunaType::Predator => "predator",
        }
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        grid: &mut SpatialGrid,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        match self.kind {
            FaunaType::Prey if ctx.plan.prey => grid
                .update_prey(ctx.day)
                .context("failed to update prey mass"),
            FaunaType::Predator if ctx.plan.predators => grid
                .update_predators(ctx.day)
                .context("failed to update predator mass"),
            _ => Ok(()),
        }
    }
}
