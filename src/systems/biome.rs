use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    grid::SpatialGrid,
    rng::SystemRng,
};

/// Reclassifies cells after the day's growth and cleanup.
pub struct BiomeSystem {
    transitions: u64,
}

impl BiomeSystem {
    pub fn new() -> Self {
        Self { transitions: 0 }
    }

    /// Biome changes seen since the system was created.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl Default for BiomeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BiomeSystem {
    fn name(&self) -> &str {
        "biome"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        grid: &mut SpatialGrid,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        self.transitions += grid.update_biomes().len() as u64;
        Ok(())
    }
}
