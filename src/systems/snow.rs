use anyhow::{Context, Result};

use crate::{
    engine::{System, SystemContext},
    grid::SpatialGrid,
    rng::SystemRng,
};

/// Daily physical step: snowfall, melt and compaction on every cell.
pub struct SnowSystem;

impl SnowSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SnowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SnowSystem {
    fn name(&self) -> &str {
        "snow"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        grid: &mut SpatialGrid,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        grid.update_snow(ctx.day)
            .context("failed to update snow height")
    }
}
