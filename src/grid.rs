//! Sparse grid of land cells and the operations that sweep across it.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::biome::Biome;
use crate::cell::{BiomassTotals, BiomeChange, LandCell};
use crate::config::MigrationRules;
use crate::ecology::FaunaType;
use crate::error::SimResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Inclusive row/column extent of the occupied cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridBounds {
    pub min_row: i32,
    pub max_row: i32,
    pub min_col: i32,
    pub max_col: i32,
}

/// Which phases run on a given calendar day.
///
/// Flora grows on odd days, prey on even days and predators on odd days
/// after the first, so each trophic level sees the previous level's result
/// from the day before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPlan {
    pub day: u16,
    pub flora: bool,
    pub prey: bool,
    pub predators: bool,
    pub migration: bool,
}

impl DayPlan {
    pub fn for_day(day: u16, migration_interval: u16) -> Self {
        let odd = day % 2 == 1;
        Self {
            day,
            flora: odd,
            prey: !odd,
            predators: odd && day > 1,
            migration: migration_interval > 0 && day % migration_interval == 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    /// Groups that rolled to move.
    pub attempts: usize,
    pub moves: usize,
    /// Moves refused because the neighbour was over capacity.
    pub blocked: usize,
    pub mass_moved: f64,
}

#[derive(Default)]
pub struct SpatialGrid {
    cells: BTreeMap<GridPos, LandCell>,
    bounds: Option<GridBounds>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `cell` at `pos`, returning whatever was there before.
    pub fn insert(&mut self, pos: GridPos, cell: LandCell) -> Option<LandCell> {
        self.bounds = Some(match self.bounds {
            None => GridBounds {
                min_row: pos.row,
                max_row: pos.row,
                min_col: pos.col,
                max_col: pos.col,
            },
            Some(b) => GridBounds {
                min_row: b.min_row.min(pos.row),
                max_row: b.max_row.max(pos.row),
                min_col: b.min_col.min(pos.col),
                max_col: b.max_col.max(pos.col),
            },
        });
        self.cells.insert(pos, cell)
    }

    pub fn get(&self, pos: GridPos) -> Option<&LandCell> {
        self.cells.get(&pos)
    }

    pub fn get_mut(&mut self, pos: GridPos) -> Option<&mut LandCell> {
        self.cells.get_mut(&pos)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn bounds(&self) -> Option<GridBounds> {
        self.bounds
    }

    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells.keys().copied()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (GridPos, &LandCell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Occupied cells among the eight surrounding `pos`.
    pub fn neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        let mut found = Vec::with_capacity(8);
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let candidate = GridPos::new(pos.row + dr, pos.col + dc);
                if self.cells.contains_key(&candidate) {
                    found.push(candidate);
                }
            }
        }
        found
    }

    fn try_each(&mut self, mut f: impl FnMut(&mut LandCell) -> SimResult<()>) -> SimResult<()> {
        self.cells.values_mut().try_for_each(|cell| f(cell))
    }

    pub fn update_snow(&mut self, day: u16) -> SimResult<()> {
        self.try_each(|cell| cell.update_snow_height(day))
    }

    pub fn update_flora(&mut self, day: u16) -> SimResult<()> {
        self.try_each(|cell| cell.update_flora(day))
    }

    pub fn update_prey(&mut self, day: u16) -> SimResult<()> {
        self.try_each(|cell| cell.update_prey(day))
    }

    pub fn update_predators(&mut self, day: u16) -> SimResult<()> {
        self.try_each(|cell| cell.update_predators(day))
    }

    pub fn remove_extinct(&mut self) -> usize {
        self.cells.values_mut().map(LandCell::remove_extinct).sum()
    }

    pub fn update_biomes(&mut self) -> Vec<(GridPos, BiomeChange)> {
        self.cells
            .iter_mut()
            .filter_map(|(pos, cell)| cell.update_biome().map(|change| (*pos, change)))
            .collect()
    }

    /// Every living fauna group may send part of its mass to one random
    /// neighbour. Cells are visited in row-major order, groups in list order.
    pub fn migrate<R: Rng + ?Sized>(&mut self, rules: &MigrationRules, rng: &mut R) -> MigrationReport {
        let mut report = MigrationReport::default();
        let positions: Vec<GridPos> = self.cells.keys().copied().collect();
        for pos in positions {
            let neighbors = self.neighbors(pos);
            if neighbors.is_empty() {
                continue;
            }
            let groups: Vec<(String, FaunaType)> = match self.cells.get(&pos) {
                Some(cell) => cell
                    .fauna()
                    .iter()
                    .filter(|animal| !animal.is_extinct())
                    .map(|animal| (animal.name().to_string(), animal.kind()))
                    .collect(),
                None => continue,
            };
            for (name, kind) in groups {
                let target = neighbors[rng.gen_range(0..neighbors.len())];
                let odds = rules.odds(kind);
                if rng.gen::<f64>() >= odds.probability {
                    continue;
                }
                report.attempts += 1;
                if self
                    .cells
                    .get(&target)
                    .map_or(true, |cell| cell.at_fauna_capacity(kind))
                {
                    report.blocked += 1;
                    continue;
                }
                let moved = self.cells.get_mut(&pos).and_then(|source| {
                    let mass = source.fauna_named(&name)?.mass() * odds.mass_fraction;
                    source.withdraw_fauna(&name, mass)
                });
                let Some(moved) = moved.filter(|group| group.mass() > 0.0) else {
                    continue;
                };
                let mass = moved.mass();
                if let Some(destination) = self.cells.get_mut(&target) {
                    destination.receive_fauna(moved);
                    report.moves += 1;
                    report.mass_moved += mass;
                    debug!(species = %name, from = %pos, to = %target, mass, "fauna migrated");
                }
            }
        }
        report
    }

    pub fn biome_counts(&self) -> BTreeMap<Biome, usize> {
        let mut counts = BTreeMap::new();
        for cell in self.cells.values() {
            *counts.entry(cell.biome()).or_insert(0) += 1;
        }
        counts
    }

    /// Cells where steppe conditions hold right now.
    pub fn steppe_cells(&self) -> usize {
        self.cells.values().filter(|cell| cell.is_steppe()).count()
    }

    pub fn total_biomass(&self) -> BiomassTotals {
        let mut totals = BiomassTotals::default();
        for cell in self.cells.values() {
            totals.accumulate(&cell.current_biomass());
        }
        totals
    }

    /// Summed mass of one fauna species across the grid.
    pub fn fauna_mass(&self, name: &str) -> f64 {
        self.cells
            .values()
            .filter_map(|cell| cell.fauna_named(name))
            .map(|animal| animal.mass())
            .sum()
    }
}

impl fmt::Debug for SpatialGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialGrid")
            .field("cells", &self.cells.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}
