use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    grid::SpatialGrid,
    rng::SystemRng,
};

/// Moves fauna between neighbouring cells every few days.
pub struct MigrationSystem;

impl MigrationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MigrationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MigrationSystem {
    fn name(&self) -> &str {
        "migration"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        grid: &mut SpatialGrid,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if !ctx.plan.migration {
            return Ok(());
        }
        let report = grid.migrate(&ctx.config.migration, rng);
        debug!(
            day = ctx.day,
            attempts = report.attempts,
            moves = report.moves,
            blocked = report.blocked,
            mass_moved = report.mass_moved,
            "migration finished"
        );
        Ok(())
    }
}
