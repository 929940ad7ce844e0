pub mod biome;
pub mod bootstrap;
pub mod cell;
pub mod climate;
pub mod config;
pub mod ecology;
pub mod engine;
pub mod error;
pub mod grid;
pub mod rng;
pub mod scenario;
pub mod systems;

pub use biome::{Biome, FloraComposition};
pub use config::EcologyConfig;
pub use engine::{DaySummary, Engine, EngineBuilder, EngineSettings};
pub use error::{SimError, SimResult};
pub use grid::{GridPos, SpatialGrid};
pub use scenario::{Scenario, ScenarioLoader};
