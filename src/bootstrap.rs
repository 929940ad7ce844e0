//! Turns a scenario into a populated grid.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::{
    biome::{Biome, FloraComposition},
    cell::LandCell,
    climate::{ClimateGenerator, ClimateStatisticsProvider},
    config::EcologyConfig,
    ecology::{Fauna, FaunaTraits, Flora, FloraType},
    grid::{GridPos, SpatialGrid},
    rng::RngManager,
    scenario::{RegionSpec, Roster, Scenario},
};

/// km per degree of latitude.
pub const KM_PER_DEGREE_LAT: f64 = 111.0;
/// km per degree of longitude around 65N.
pub const KM_PER_DEGREE_LON: f64 = 47.0;
/// Largest grid a generated region may produce.
pub const MAX_REGION_CELLS: usize = 1_000_000;

/// A grid ready to run, with the configuration its cells share.
pub struct Landscape {
    pub grid: SpatialGrid,
    pub config: Arc<EcologyConfig>,
}

pub struct GridBootstrap<'a> {
    scenario: &'a Scenario,
    rng: RngManager,
}

impl<'a> GridBootstrap<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        Self::with_seed(scenario, scenario.seed)
    }

    pub fn with_seed(scenario: &'a Scenario, seed: u64) -> Self {
        Self {
            scenario,
            rng: RngManager::new(seed),
        }
    }

    pub fn build(&self) -> Result<Landscape> {
        let scenario = self.scenario;
        let provider = scenario.statistics_provider()?;

        let mut config = scenario.ecology.clone();
        if config.reference_ratios.is_empty() {
            config.reference_ratios = reference_ratios(scenario);
        }
        let config = Arc::new(config);

        let area = cell_area(scenario.region.step);
        let mut grid = SpatialGrid::new();
        for (id, (pos, latitude, longitude)) in place_cells(&scenario.region)?.into_iter().enumerate() {
            let id = id as u64;
            let cell = self
                .seed_cell(id, area, latitude, longitude, provider.clone(), &config)
                .with_context(|| format!("Failed to seed cell {pos} at {latitude}N {longitude}E"))?;
            if grid.insert(pos, cell).is_some() {
                bail!("two region coordinates fall on grid position {pos}");
            }
        }

        for introduction in &scenario.introductions {
            let pos = match (introduction.row, introduction.col) {
                (Some(row), Some(col)) => GridPos::new(row, col),
                (None, None) => centre(&grid)?,
                _ => bail!("introduction of {} needs both row and col", introduction.species),
            };
            let traits = scenario
                .species
                .fauna(&introduction.species)
                .ok_or_else(|| anyhow!("unknown fauna '{}'", introduction.species))?;
            introduce_fauna(&mut grid, pos, traits, introduction.population_per_km2)?;
        }

        info!(
            scenario = %scenario.name,
            cells = grid.len(),
            area_km2 = area,
            "grid seeded"
        );
        Ok(Landscape { grid, config })
    }

    fn seed_cell(
        &self,
        id: u64,
        area: f64,
        latitude: f64,
        longitude: f64,
        provider: Arc<dyn ClimateStatisticsProvider>,
        config: &Arc<EcologyConfig>,
    ) -> Result<LandCell> {
        let scenario = self.scenario;
        let biome = Biome::from_latitude(latitude);
        let climate = ClimateGenerator::new(biome, provider, config, self.rng.cell_rng(id))?;
        let mut cell = LandCell::new(id, area, scenario.initial_snow_height, climate, config.clone())?
            .with_coordinates(latitude, longitude);

        let Some(roster) = scenario.rosters.get(&biome) else {
            warn!(cell = id, %biome, "no roster for biome, cell starts bare");
            return Ok(cell);
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.rng.indexed_seed("bootstrap", id));
        let mut jitter = || {
            if scenario.variation > 0.0 {
                1.0 + rng.gen_range(-scenario.variation..=scenario.variation)
            } else {
                1.0
            }
        };

        for (name, per_km2) in &roster.flora {
            let traits = scenario
                .species
                .flora(name)
                .ok_or_else(|| anyhow!("unknown flora '{name}'"))?;
            let mass = per_km2 * area * jitter();
            cell.add_flora(Flora::with_mass(traits.clone(), mass)?)?;
        }
        for (name, per_km2) in &roster.fauna {
            let traits = scenario
                .species
                .fauna(name)
                .ok_or_else(|| anyhow!("unknown fauna '{name}'"))?;
            let population = (per_km2 * area * jitter()).round() as u64;
            if population == 0 {
                continue;
            }
            cell.add_fauna(Fauna::new(traits.clone(), population)?)?;
        }
        Ok(cell)
    }
}

/// Releases `per_km2` individuals per km^2 of the cell at `pos`, merging
/// with any group of the same species already there. Returns the number
/// released.
pub fn introduce_fauna(
    grid: &mut SpatialGrid,
    pos: GridPos,
    traits: &FaunaTraits,
    per_km2: f64,
) -> Result<u64> {
    let cell = grid
        .get_mut(pos)
        .ok_or_else(|| anyhow!("no cell at grid position {pos}"))?;
    let population = (per_km2 * cell.area()).floor() as u64;
    if population == 0 {
        warn!(species = %traits.name, %pos, "introduction too sparse for this cell");
        return Ok(0);
    }
    cell.receive_fauna(Fauna::new(traits.clone(), population)?);
    cell.recalculate_biomass();
    info!(species = %traits.name, %pos, population, "fauna introduced");
    Ok(population)
}

pub fn cell_area(step: f64) -> f64 {
    (step * KM_PER_DEGREE_LAT) * (step * KM_PER_DEGREE_LON)
}

/// Cell centres as `(latitude, longitude)`, south to north then west to east.
pub fn region_centres(region: &RegionSpec) -> Result<Vec<(f64, f64)>> {
    if !region.coordinates.is_empty() {
        return Ok(region
            .coordinates
            .iter()
            .map(|[longitude, latitude]| (*latitude, *longitude))
            .collect());
    }
    if !(region.step.is_finite() && region.step > 0.0) {
        bail!("region step must be positive, got {}", region.step);
    }
    if region.lat_max < region.lat_min || region.lon_max < region.lon_min {
        bail!("region bounds are inverted");
    }
    let steps = |min: f64, max: f64| -> Result<usize> {
        let count = ((max - min) / region.step + 1e-9).floor() + 1.0;
        if !count.is_finite() || count > MAX_REGION_CELLS as f64 {
            bail!("region spans too many cells at step {}", region.step);
        }
        Ok(count as usize)
    };
    let lat_steps = steps(region.lat_min, region.lat_max)?;
    let lon_steps = steps(region.lon_min, region.lon_max)?;
    let cells = lat_steps
        .checked_mul(lon_steps)
        .filter(|cells| *cells <= MAX_REGION_CELLS)
        .ok_or_else(|| {
            anyhow!("region of {lat_steps} x {lon_steps} cells exceeds {MAX_REGION_CELLS}")
        })?;
    let mut centres = Vec::with_capacity(cells);
    for i in 0..lat_steps {
        let latitude = region.lat_min + i as f64 * region.step;
        for j in 0..lon_steps {
            centres.push((latitude, region.lon_min + j as f64 * region.step));
        }
    }
    Ok(centres)
}

/// Rows follow sorted distinct latitudes and columns sorted distinct
/// longitudes.
fn place_cells(region: &RegionSpec) -> Result<Vec<(GridPos, f64, f64)>> {
    let centres = region_centres(region)?;
    if centres.is_empty() {
        bail!("region contains no cells");
    }
    if centres
        .iter()
        .any(|(latitude, longitude)| !latitude.is_finite() || !longitude.is_finite())
    {
        bail!("region coordinates must be finite");
    }
    let key = |value: f64| (value * 1e6).round() as i64;
    let latitudes: BTreeSet<i64> = centres.iter().map(|(lat, _)| key(*lat)).collect();
    let longitudes: BTreeSet<i64> = centres.iter().map(|(_, lon)| key(*lon)).collect();
    let rows: BTreeMap<i64, i32> = latitudes.into_iter().zip(0..).collect();
    let cols: BTreeMap<i64, i32> = longitudes.into_iter().zip(0..).collect();

    let mut placed: Vec<_> = centres
        .into_iter()
        .map(|(latitude, longitude)| {
            let pos = GridPos::new(rows[&key(latitude)], cols[&key(longitude)]);
            (pos, latitude, longitude)
        })
        .collect();
    placed.sort_by_key(|(pos, _, _)| *pos);
    Ok(placed)
}

fn centre(grid: &SpatialGrid) -> Result<GridPos> {
    let bounds = grid.bounds().ok_or_else(|| anyhow!("grid is empty"))?;
    let wanted = GridPos::new(
        (bounds.min_row + bounds.max_row) / 2,
        (bounds.min_col + bounds.max_col) / 2,
    );
    if grid.get(wanted).is_some() {
        return Ok(wanted);
    }
    grid.positions()
        .min_by_key(|pos| (pos.row - wanted.row).abs() + (pos.col - wanted.col).abs())
        .ok_or_else(|| anyhow!("grid is empty"))
}

/// Flora shares of each base biome's starting roster.
pub fn reference_ratios(scenario: &Scenario) -> BTreeMap<Biome, FloraComposition> {
    scenario
        .rosters
        .iter()
        .filter(|(biome, _)| biome.is_base())
        .filter_map(|(biome, roster)| {
            let masses = roster_masses(scenario, roster);
            let composition = FloraComposition::from_masses(
                masses[&FloraType::Grass],
                masses[&FloraType::Shrub],
                masses[&FloraType::Tree],
                masses[&FloraType::Moss],
            );
            (composition.sum() > 0.0).then_some((*biome, composition))
        })
        .collect()
}

fn roster_masses(scenario: &Scenario, roster: &Roster) -> BTreeMap<FloraType, f64> {
    let mut masses: BTreeMap<FloraType, f64> = FloraType::ALL.into_iter().map(|kind| (kind, 0.0)).collect();
    for (name, per_km2) in &roster.flora {
        if let Some(traits) = scenario.species.flora(name) {
            *masses.entry(traits.kind).or_default() += per_km2;
        }
    }
    masses
}
