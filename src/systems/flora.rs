use anyhow::{Context, Result};

use crate::{
    engine::{System, SystemContext},
    grid::SpatialGrid,
    rng::SystemRng,
};

/// Grows every plant species on odd days.
pub struct FloraSystem;

impl FloraSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FloraSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for FloraSystem {
    fn name(&self) -> &str {
        "flora"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        grid: &mut SpatialGrid,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if !ctx.plan.flora {
            return Ok(());
        }
        grid.update_flora(ctx.day)
            .context("failed to update flora mass")
    }
}
