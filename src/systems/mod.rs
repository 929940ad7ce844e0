mod biome;
mod cleanup;
mod fauna;
mod flora;
mod migration;
mod snow;

pub use biome::BiomeSystem;
pub use cleanup::CleanupSystem;
pub use fauna::FaunaSystem;
pub use flora::FloraSystem;
pub use migration::MigrationSystem;
pub use snow::SnowSystem;
