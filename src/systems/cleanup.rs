use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    grid::SpatialGrid,
    rng::SystemRng,
};

/// Removes organisms whose mass has reached zero.
pub struct CleanupSystem;

impl CleanupSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleanupSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CleanupSystem {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        grid: &mut SpatialGrid,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let removed = grid.remove_extinct();
        if removed > 0 {
            debug!(day = ctx.day, removed, "removed extinct organisms");
        }
        Ok(())
    }
}
