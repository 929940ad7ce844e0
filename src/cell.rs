use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::biome::{Biome, FloraComposition};
use crate::climate::{ClimateGenerator, ClimateVariable};
use crate::config::EcologyConfig;
use crate::ecology::{
    Fauna, FaunaType, Flora, FloraConditions, FloraPressures, FloraType,
};
use crate::error::{check_day, SimError, SimResult};

/// Total biomass per organism type on a cell, in kg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BiomassTotals {
    pub grass: f64,
    pub shrub: f64,
    pub tree: f64,
    pub moss: f64,
    pub prey: f64,
    pub predator: f64,
}

impl BiomassTotals {
    pub fn of(flora: &[Flora], fauna: &[Fauna]) -> Self {
        let mut totals = Self::default();
        for plant in flora {
            *totals.flora_mut(plant.kind()) += plant.mass();
        }
        for animal in fauna {
            match animal.kind() {
                FaunaType::Prey => totals.prey += animal.mass(),
                FaunaType::Predator => totals.predator += animal.mass(),
            }
        }
        totals
    }

    pub fn flora(&self, kind: FloraType) -> f64 {
        match kind {
            FloraType::Grass => self.grass,
            FloraType::Shrub => self.shrub,
            FloraType::Tree => self.tree,
            FloraType::Moss => self.moss,
        }
    }

    fn flora_mut(&mut self, kind: FloraType) -> &mut f64 {
        match kind {
            FloraType::Grass => &mut self.grass,
            FloraType::Shrub => &mut self.shrub,
            FloraType::Tree => &mut self.tree,
            FloraType::Moss => &mut self.moss,
        }
    }

    pub fn fauna(&self, kind: FaunaType) -> f64 {
        match kind {
            FaunaType::Prey => self.prey,
            FaunaType::Predator => self.predator,
        }
    }

    pub fn total_flora(&self) -> f64 {
        self.grass + self.shrub + self.tree + self.moss
    }

    pub fn composition(&self) -> FloraComposition {
        FloraComposition::from_masses(self.grass, self.shrub, self.tree, self.moss)
    }

    pub fn accumulate(&mut self, other: &BiomassTotals) {
        self.grass += other.grass;
        self.shrub += other.shrub;
        self.tree += other.tree;
        self.moss += other.moss;
        self.prey += other.prey;
        self.predator += other.predator;
    }
}

/// Biome switch reported by [`LandCell::update_biome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiomeChange {
    pub from: Biome,
    pub to: Biome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Climate draws already taken today.
#[derive(Debug, Default)]
struct DailyReadings {
    day: Option<u16>,
    values: BTreeMap<ClimateVariable, f64>,
}

/// Name to list position for both organism lists.
#[derive(Debug, Default)]
struct SpeciesIndex {
    flora: HashMap<String, usize>,
    fauna: HashMap<String, usize>,
}

impl SpeciesIndex {
    fn build(flora: &[Flora], fauna: &[Fauna]) -> Self {
        Self {
            flora: flora
                .iter()
                .enumerate()
                .map(|(i, plant)| (plant.name().to_string(), i))
                .collect(),
            fauna: fauna
                .iter()
                .enumerate()
                .map(|(i, animal)| (animal.name().to_string(), i))
                .collect(),
        }
    }
}

/// One square of land: its snowpack, its organisms and its weather.
pub struct LandCell {
    id: u64,
    area: f64,
    coordinates: Option<Coordinates>,
    snow_height: f64,
    previous_snow_height: f64,
    flora: Vec<Flora>,
    fauna: Vec<Fauna>,
    climate: ClimateGenerator,
    config: Arc<EcologyConfig>,
    biomass: BiomassTotals,
    readings: DailyReadings,
    index: SpeciesIndex,
}

impl LandCell {
    /// `area` is in km^2 and `snow_height` in metres.
    pub fn new(
        id: u64,
        area: f64,
        snow_height: f64,
        climate: ClimateGenerator,
        config: Arc<EcologyConfig>,
    ) -> SimResult<Self> {
        if !area.is_finite() || area <= 0.0 {
            return Err(SimError::validation(format!(
                "cell {id}: area must be positive, got {area}"
            )));
        }
        if !snow_height.is_finite() || snow_height < 0.0 {
            return Err(SimError::validation(format!(
                "cell {id}: snow height must be non-negative, got {snow_height}"
            )));
        }
        Ok(Self {
            id,
            area,
            coordinates: None,
            snow_height,
            previous_snow_height: snow_height,
            flora: Vec::new(),
            fauna: Vec::new(),
            climate,
            config,
            biomass: BiomassTotals::default(),
            readings: DailyReadings::default(),
            index: SpeciesIndex::default(),
        })
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    pub fn add_flora(&mut self, flora: Flora) -> SimResult<()> {
        if self.flora.iter().any(|plant| plant.name() == flora.name()) {
            return Err(SimError::validation(format!(
                "cell {}: flora '{}' already present",
                self.id,
                flora.name()
            )));
        }
        self.flora.push(flora);
        self.rebuild_index();
        Ok(())
    }

    pub fn add_fauna(&mut self, fauna: Fauna) -> SimResult<()> {
        if self.fauna.iter().any(|animal| animal.name() == fauna.name()) {
            return Err(SimError::validation(format!(
                "cell {}: fauna '{}' already present",
                self.id,
                fauna.name()
            )));
        }
        self.fauna.push(fauna);
        self.rebuild_index();
        Ok(())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn biome(&self) -> Biome {
        self.climate.biome()
    }

    pub fn climate(&self) -> &ClimateGenerator {
        &self.climate
    }

    pub fn climate_mut(&mut self) -> &mut ClimateGenerator {
        &mut self.climate
    }

    pub fn snow_height(&self) -> f64 {
        self.snow_height
    }

    pub fn previous_snow_height(&self) -> f64 {
        self.previous_snow_height
    }

    /// Change in snow depth over the last update; drives the climate feedback.
    pub fn delta_snow_height(&self) -> f64 {
        self.snow_height - self.previous_snow_height
    }

    pub fn flora(&self) -> &[Flora] {
        &self.flora
    }

    pub fn fauna(&self) -> &[Fauna] {
        &self.fauna
    }

    pub fn flora_named(&self, name: &str) -> Option<&Flora> {
        self.flora.iter().find(|plant| plant.name() == name)
    }

    pub fn fauna_named(&self, name: &str) -> Option<&Fauna> {
        self.fauna.iter().find(|animal| animal.name() == name)
    }

    /// Biomass computed from the organism lists as they are now.
    pub fn current_biomass(&self) -> BiomassTotals {
        BiomassTotals::of(&self.flora, &self.fauna)
    }

    /// Biomass as of the last [`LandCell::recalculate_biomass`].
    pub fn cached_biomass(&self) -> BiomassTotals {
        self.biomass
    }

    pub fn recalculate_biomass(&mut self) {
        self.biomass = self.current_biomass();
    }

    /// Uses the cached totals; call [`LandCell::recalculate_biomass`] first.
    pub fn over_flora_capacity(&self, kind: FloraType) -> bool {
        self.biomass.flora(kind) > self.config.capacity.flora_ceiling(kind) * self.area
    }

    /// Uses the cached totals; call [`LandCell::recalculate_biomass`] first.
    pub fn over_fauna_capacity(&self, kind: FaunaType) -> bool {
        self.biomass.fauna(kind) > self.config.capacity.fauna_ceiling(kind) * self.area
    }

    /// Flora ratios of the living plants, all zero on bare ground.
    pub fn flora_composition(&self) -> FloraComposition {
        self.current_biomass().composition()
    }

    /// Permafrost holds and the flora looks like steppe.
    pub fn is_steppe(&self) -> bool {
        self.climate.is_steppe(&self.flora_composition())
    }

    /// Share of the cell walked over today, in `[0, 1]`.
    pub fn trampled_area_ratio(&self) -> f64 {
        self.trampled_ratio_by(|_| true)
    }

    /// Share of the cell walked over by species heavy enough to flatten shrubs.
    pub fn shrub_trampled_area_ratio(&self) -> f64 {
        self.trampled_ratio_by(|animal| animal.traits().tramples_shrubs)
    }

    fn trampled_ratio_by(&self, include: impl Fn(&Fauna) -> bool) -> f64 {
        let walked: f64 = self
            .fauna
            .iter()
            .filter(|animal| !animal.is_extinct() && include(animal))
            .map(Fauna::trampled_area)
            .sum();
        walked.min(self.area) / self.area
    }

    /// Share of the cell under tree canopy, capped at 1.
    pub fn canopy_cover_ratio(&self) -> f64 {
        let canopy: f64 = self.flora.iter().map(Flora::canopy_cover).sum();
        (canopy / self.area).min(1.0)
    }

    /// Forgets yesterday's climate draws.
    pub fn begin_day(&mut self, day: u16) {
        if self.readings.day != Some(day) {
            self.readings.day = Some(day);
            self.readings.values.clear();
        }
    }

    /// Today's value of `variable`, drawn at most once per day.
    pub fn reading(&mut self, day: u16, variable: ClimateVariable) -> SimResult<f64> {
        check_day(day)?;
        self.begin_day(day);
        if let Some(value) = self.readings.values.get(&variable) {
            return Ok(*value);
        }
        let delta = self.delta_snow_height();
        let value = match variable {
            ClimateVariable::Temperature => self.climate.temperature(day, delta)?,
            ClimateVariable::SoilTemperature => self.climate.soil_temperature(day, delta)?,
            ClimateVariable::Snowfall => self.climate.snowfall(day)?,
            ClimateVariable::Rainfall => self.climate.rainfall(day)?,
            ClimateVariable::Uv => self.climate.uv(day)?,
            ClimateVariable::SolarRadiation => self.climate.solar_radiation(day)?,
        };
        self.readings.values.insert(variable, value);
        Ok(value)
    }

    /// Meltwater produced today, kg/m^2.
    pub fn meltwater_mass(&mut self, day: u16) -> SimResult<f64> {
        let radiation = self.reading(day, ClimateVariable::SolarRadiation)?;
        Ok(self.config.snow.meltwater_mass(radiation))
    }

    /// Snow depth lost to melt today, metres.
    pub fn melt_height_loss(&mut self, day: u16) -> SimResult<f64> {
        let meltwater = self.meltwater_mass(day)?;
        let area_m2 = self.area * 1_000_000.0;
        Ok(meltwater / (self.config.snow.snow_density * area_m2))
    }

    /// Fresh snow, then melt, then compaction under foot. Also takes the
    /// day's soil temperature so frozen days are counted once per day.
    pub fn update_snow_height(&mut self, day: u16) -> SimResult<()> {
        check_day(day)?;
        self.begin_day(day);
        self.previous_snow_height = self.snow_height;

        let mut height = self.snow_height + self.reading(day, ClimateVariable::Snowfall)?;
        height -= self.melt_height_loss(day)?;
        let compaction = self.config.snow.compaction_factor * self.trampled_area_ratio() * height;
        height -= compaction;
        self.snow_height = height.max(0.0);

        self.reading(day, ClimateVariable::SoilTemperature)?;
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = SpeciesIndex::build(&self.flora, &self.fauna);
    }

    fn flora_grazing(&self, plant: &Flora) -> f64 {
        plant
            .consumers()
            .iter()
            .filter_map(|name| self.index.fauna.get(name))
            .map(|&i| self.fauna[i].consumption_rate())
            .sum()
    }

    fn available_flora(&self, animal: &Fauna) -> f64 {
        animal
            .food()
            .iter()
            .filter_map(|name| self.index.flora.get(name))
            .map(|&i| self.flora[i].mass())
            .sum()
    }

    fn available_prey(&self, animal: &Fauna) -> f64 {
        animal
            .food()
            .iter()
            .filter_map(|name| self.index.fauna.get(name))
            .map(|&i| &self.fauna[i])
            .filter(|prey| prey.kind() == FaunaType::Prey)
            .map(Fauna::mass)
            .sum()
    }

    fn predation(&self, animal: &Fauna) -> f64 {
        animal
            .predators()
            .iter()
            .filter_map(|name| self.index.fauna.get(name))
            .map(|&i| &self.fauna[i])
            .filter(|hunter| hunter.kind() == FaunaType::Predator)
            .map(Fauna::consumption_rate)
            .sum()
    }

    /// One flora step for every plant species, in list order.
    pub fn update_flora(&mut self, day: u16) -> SimResult<()> {
        if self.flora.is_empty() {
            return Ok(());
        }
        self.rebuild_index();
        let temperature = self.reading(day, ClimateVariable::Temperature)?;
        let uv = self.reading(day, ClimateVariable::Uv)?;
        let hydration = self.reading(day, ClimateVariable::Rainfall)? + self.meltwater_mass(day)?;
        let deep_root_level = self.config.deep_root_level;
        let soil_temperature = if self.flora.iter().any(|plant| plant.has_deep_roots(deep_root_level)) {
            Some(self.reading(day, ClimateVariable::SoilTemperature)?)
        } else {
            None
        };
        let shrub_trampling =
            self.config.trampling.shrub_rate * self.shrub_trampled_area_ratio();
        let tree_trampling = self.config.trampling.tree_rate * self.trampled_area_ratio();

        for i in 0..self.flora.len() {
            let plant = &self.flora[i];
            let mut conditions = FloraConditions {
                temperature,
                uv,
                hydration,
                soil_temperature: soil_temperature
                    .filter(|_| plant.has_deep_roots(deep_root_level)),
            };
            if plant.is_shaded() {
                conditions = conditions.shaded(self.canopy_cover_ratio());
            }
            let grazing = self.flora_grazing(plant);
            self.flora[i].grow(&conditions, grazing);

            self.recalculate_biomass();
            let kind = self.flora[i].kind();
            let pressures = FloraPressures {
                capacity_reduction: self
                    .over_flora_capacity(kind)
                    .then_some(self.config.capacity.flora_reduction),
                shrub_trampling,
                tree_trampling,
            };
            self.flora[i].apply_pressures(&pressures);
        }
        self.recalculate_biomass();
        Ok(())
    }

    /// One growth step for every fauna group of `kind`, in list order.
    pub fn update_fauna(&mut self, day: u16, kind: FaunaType) -> SimResult<()> {
        if !self.fauna.iter().any(|animal| animal.kind() == kind) {
            return Ok(());
        }
        self.rebuild_index();
        let temperature = self.reading(day, ClimateVariable::Temperature)?;
        let reduction = self.config.capacity.fauna_reduction(kind);

        for i in 0..self.fauna.len() {
            let animal = &self.fauna[i];
            if animal.kind() != kind {
                continue;
            }
            let (food, predation) = match kind {
                FaunaType::Prey => (self.available_flora(animal), self.predation(animal)),
                FaunaType::Predator => (self.available_prey(animal), 0.0),
            };
            self.fauna[i].grow(temperature, food, predation);

            self.recalculate_biomass();
            if self.over_fauna_capacity(kind) {
                self.fauna[i].reduce(reduction);
            }
        }
        self.recalculate_biomass();
        Ok(())
    }

    pub fn update_prey(&mut self, day: u16) -> SimResult<()> {
        self.update_fauna(day, FaunaType::Prey)
    }

    pub fn update_predators(&mut self, day: u16) -> SimResult<()> {
        self.update_fauna(day, FaunaType::Predator)
    }

    /// Drops every organism whose mass has reached zero; returns how many.
    pub fn remove_extinct(&mut self) -> usize {
        let before = self.flora.len() + self.fauna.len();
        let id = self.id;
        self.flora.retain(|plant| {
            let alive = !plant.is_extinct();
            if !alive {
                debug!(cell = id, species = plant.name(), "flora died out");
            }
            alive
        });
        self.fauna.retain(|animal| {
            let alive = !animal.is_extinct();
            if !alive {
                debug!(cell = id, species = animal.name(), "fauna died out");
            }
            alive
        });
        let removed = before - self.flora.len() - self.fauna.len();
        if removed > 0 {
            self.rebuild_index();
            self.recalculate_biomass();
        }
        removed
    }

    /// Moves the cell between base biomes and the steppe overlay according
    /// to its current flora. Nothing happens on bare ground.
    pub fn update_biome(&mut self) -> Option<BiomeChange> {
        self.recalculate_biomass();
        if self.biomass.total_flora() <= 0.0 {
            return None;
        }
        let composition = self.biomass.composition();
        let current = self.climate.biome();
        let steppe = self.climate.is_steppe(&composition);

        let candidate = if steppe {
            (current != Biome::MammothSteppe).then_some(Biome::MammothSteppe)
        } else {
            self.config
                .closest_base_biome(&composition)
                .filter(|closest| *closest != current)
        };
        let next = candidate?;

        self.climate.set_biome(next);
        info!(cell = self.id, from = %current, to = %next, "biome reclassified");
        Some(BiomeChange {
            from: current,
            to: next,
        })
    }

    /// Takes `mass` kg of the named fauna out of this cell.
    pub(crate) fn withdraw_fauna(&mut self, name: &str, mass: f64) -> Option<Fauna> {
        let animal = self.fauna.iter_mut().find(|animal| animal.name() == name)?;
        Some(animal.split_off(mass))
    }

    /// Merges into a same-named group or settles as a new one.
    pub(crate) fn receive_fauna(&mut self, incoming: Fauna) {
        match self
            .fauna
            .iter_mut()
            .find(|animal| animal.name() == incoming.name())
        {
            Some(resident) => resident.absorb(incoming.mass()),
            None => {
                self.fauna.push(incoming);
                self.rebuild_index();
            }
        }
    }

    /// Capacity check against live totals, for organisms arriving from
    /// elsewhere.
    pub fn at_fauna_capacity(&self, kind: FaunaType) -> bool {
        self.current_biomass().fauna(kind) > self.config.capacity.fauna_ceiling(kind) * self.area
    }
}

impl std::fmt::Debug for LandCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandCell")
            .field("id", &self.id)
            .field("area", &self.area)
            .field("biome", &self.climate.biome())
            .field("snow_height", &self.snow_height)
            .field("flora", &self.flora.len())
            .field("fauna", &self.fauna.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::climate::{ClimateStat, ClimateStatisticsProvider, StaticStatistics};
    use crate::ecology::{FaunaTraits, FloraTraits, IdealRange};

    pub(crate) fn calm_weather(biome: Biome) -> StaticStatistics {
        let constant = |variable, mean| (variable, ClimateStat::new(mean, 0.0));
        [
            constant(ClimateVariable::Temperature, 10.0),
            constant(ClimateVariable::SoilTemperature, 2.0),
            constant(ClimateVariable::Snowfall, 0.0),
            constant(ClimateVariable::Rainfall, 5.0),
            constant(ClimateVariable::Uv, 3.0),
            constant(ClimateVariable::SolarRadiation, 0.0),
        ]
        .into_iter()
        .fold(StaticStatistics::new(), |stats, (variable, stat)| {
            stats.with_constant(biome, variable, stat)
        })
    }

    pub(crate) fn cell_with(stats: StaticStatistics, config: EcologyConfig, area: f64) -> LandCell {
        let provider: Arc<dyn ClimateStatisticsProvider> = Arc::new(stats);
        let climate =
            ClimateGenerator::with_seed(Biome::SouthernTaiga, provider, &config, 11).unwrap();
        LandCell::new(1, area, 0.0, climate, Arc::new(config)).unwrap()
    }

    pub(crate) fn flora_traits(name: &str, kind: FloraType) -> FloraTraits {
        FloraTraits {
            name: name.into(),
            kind,
            description: String::new(),
            avg_mass: 1.0,
            ideal_growth_rate: 0.02,
            temperature: IdealRange::new(0.0, 20.0).unwrap(),
            uv: IdealRange::new(0.0, 5.0).unwrap(),
            hydration: IdealRange::new(0.0, 10.0).unwrap(),
            soil_temperature: IdealRange::new(0.0, 10.0).unwrap(),
            root_depth: 1,
            consumers: Vec::new(),
            canopy_per_tree: 0.0,
        }
    }

    pub(crate) fn prey_traits(name: &str) -> FaunaTraits {
        FaunaTraits {
            name: name.into(),
            kind: FaunaType::Prey,
            description: String::new(),
            avg_mass: 100.0,
            ideal_growth_rate: 0.001,
            temperature: IdealRange::new(-40.0, 20.0).unwrap(),
            min_food_per_day: 10.0,
            feeding_rate: 0.0001,
            steps_per_day: 1_000.0,
            foot_area: 1e-6,
            tramples_shrubs: false,
            food: vec!["sedge".into()],
            predators: Vec::new(),
            starvation_rate: 0.0,
        }
    }

    fn calm_cell() -> LandCell {
        cell_with(calm_weather(Biome::SouthernTaiga), EcologyConfig::default(), 100.0)
    }

    #[test]
    fn snowfall_accumulates_and_delta_tracks_it() {
        let stats = calm_weather(Biome::SouthernTaiga).with_constant(
            Biome::SouthernTaiga,
            ClimateVariable::Snowfall,
            ClimateStat::new(0.1, 0.0),
        );
        let mut cell = cell_with(stats, EcologyConfig::default(), 100.0);
        cell.update_snow_height(1).unwrap();
        cell.update_snow_height(2).unwrap();
        assert!((cell.snow_height() - 0.2).abs() < 1e-12);
        assert!((cell.delta_snow_height() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn melt_never_leaves_negative_snow() {
        let stats = calm_weather(Biome::SouthernTaiga).with_constant(
            Biome::SouthernTaiga,
            ClimateVariable::SolarRadiation,
            ClimateStat::new(1e15, 0.0),
        );
        let mut cell = cell_with(stats, EcologyConfig::default(), 1.0);
        cell.update_snow_height(40).unwrap();
        assert_eq!(cell.snow_height(), 0.0);
        assert!(cell.meltwater_mass(40).unwrap() > 0.0);
    }

    #[test]
    fn trampling_compacts_snow() {
        let stats = calm_weather(Biome::SouthernTaiga).with_constant(
            Biome::SouthernTaiga,
            ClimateVariable::Snowfall,
            ClimateStat::new(1.0, 0.0),
        );
        let mut cell = cell_with(stats, EcologyConfig::default(), 10.0);
        // 50 animals * 1000 steps * 1e-6 km^2 = 0.05 km^2 of 10 km^2
        cell.add_fauna(Fauna::new(prey_traits("reindeer"), 50).unwrap())
            .unwrap();
        assert!((cell.trampled_area_ratio() - 0.005).abs() < 1e-12);
        cell.update_snow_height(10).unwrap();
        assert!((cell.snow_height() - (1.0 - 0.7 * 0.005)).abs() < 1e-12);
    }

    #[test]
    fn trampled_ratio_is_capped_at_whole_cell() {
        let mut cell = calm_cell();
        let mut stampede = prey_traits("bison");
        stampede.foot_area = 1.0;
        cell.add_fauna(Fauna::new(stampede, 10_000).unwrap()).unwrap();
        assert_eq!(cell.trampled_area_ratio(), 1.0);
        assert_eq!(cell.shrub_trampled_area_ratio(), 0.0);
    }

    #[test]
    fn one_draw_per_variable_per_day() {
        let stats = calm_weather(Biome::SouthernTaiga).with_constant(
            Biome::SouthernTaiga,
            ClimateVariable::Uv,
            ClimateStat::new(3.0, 4.0),
        );
        let mut cell = cell_with(stats, EcologyConfig::default(), 1.0);
        let first = cell.reading(7, ClimateVariable::Uv).unwrap();
        assert_eq!(cell.reading(7, ClimateVariable::Uv).unwrap(), first);
        assert!(matches!(
            cell.reading(0, ClimateVariable::Uv),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn flora_grows_under_ideal_conditions() {
        let mut cell = calm_cell();
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 1_000.0).unwrap())
            .unwrap();
        cell.update_flora(1).unwrap();
        assert!((cell.flora()[0].mass() - 1_020.0).abs() < 1e-9);
    }

    #[test]
    fn grazing_is_matched_by_name() {
        let mut cell = calm_cell();
        let mut sedge = flora_traits("sedge", FloraType::Grass);
        sedge.consumers = vec!["reindeer".into(), "absent".into()];
        cell.add_flora(Flora::with_mass(sedge, 1_000.0).unwrap()).unwrap();
        cell.add_fauna(Fauna::new(prey_traits("reindeer"), 100).unwrap())
            .unwrap();
        cell.update_flora(1).unwrap();
        // 0.02 growth - 100 * 0.0001 grazing
        assert!((cell.flora()[0].mass() - 1_010.0).abs() < 1e-9);
    }

    #[test]
    fn crowded_flora_loses_a_tenth() {
        let mut cell = cell_with(calm_weather(Biome::SouthernTaiga), EcologyConfig::default(), 1.0);
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 2_000_000.0).unwrap())
            .unwrap();
        cell.update_flora(1).unwrap();
        assert!((cell.flora()[0].mass() - 2_040_000.0 * 0.9).abs() < 1e-6);
    }

    #[test]
    fn canopy_shades_understorey() {
        let mut cell = cell_with(calm_weather(Biome::SouthernTaiga), EcologyConfig::default(), 1.0);
        let mut larch = flora_traits("larch", FloraType::Tree);
        larch.canopy_per_tree = 0.001;
        larch.avg_mass = 100.0;
        cell.add_flora(Flora::with_mass(larch, 50_000.0).unwrap()).unwrap();
        let mut shade_lover = flora_traits("fern", FloraType::Moss);
        shade_lover.uv = IdealRange::new(1.0, 2.0).unwrap();
        cell.add_flora(Flora::with_mass(shade_lover, 100.0).unwrap()).unwrap();
        assert!((cell.canopy_cover_ratio() - 0.5).abs() < 1e-12);
        cell.update_flora(1).unwrap();
        // shaded uv 1.5 sits inside [1, 2]
        assert!((cell.flora()[1].mass() - 102.0).abs() < 1e-9);
    }

    #[test]
    fn prey_eat_available_flora() {
        let mut cell = calm_cell();
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 1_000.0).unwrap())
            .unwrap();
        cell.add_fauna(Fauna::new(prey_traits("reindeer"), 10).unwrap())
            .unwrap();
        cell.update_prey(2).unwrap();
        assert!((cell.fauna()[0].mass() - 1_000.0 * 1.002).abs() < 1e-9);
    }

    #[test]
    fn crowded_prey_lose_a_tenth() {
        let mut cell = cell_with(calm_weather(Biome::SouthernTaiga), EcologyConfig::default(), 1.0);
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 1_000.0).unwrap())
            .unwrap();
        cell.add_fauna(Fauna::new(prey_traits("reindeer"), 200).unwrap())
            .unwrap();
        cell.update_prey(2).unwrap();
        assert!((cell.fauna()[0].mass() - 20_000.0 * 1.002 * 0.9).abs() < 1e-6);
    }

    fn herd(name: &str, tramples_shrubs: bool, population: u64) -> Fauna {
        let mut traits = prey_traits(name);
        traits.foot_area = 1e-5;
        traits.tramples_shrubs = tramples_shrubs;
        Fauna::new(traits, population).unwrap()
    }

    fn woodland_cell() -> LandCell {
        let mut cell = calm_cell();
        for (name, kind) in [
            ("willow", FloraType::Shrub),
            ("larch", FloraType::Tree),
            ("sedge", FloraType::Grass),
        ] {
            cell.add_flora(Flora::with_mass(flora_traits(name, kind), 1_000.0).unwrap())
                .unwrap();
        }
        cell
    }

    #[test]
    fn heavy_herds_flatten_shrubs() {
        let mut cell = woodland_cell();
        // 1000 * 1000 steps * 1e-5 km^2 walks a tenth of 100 km^2
        cell.add_fauna(herd("mammoth", true, 1_000)).unwrap();
        assert!((cell.shrub_trampled_area_ratio() - 0.1).abs() < 1e-12);
        cell.update_flora(1).unwrap();
        let mass = |name| cell.flora_named(name).unwrap().mass();
        assert!((mass("willow") - 1_020.0 * (1.0 - 0.85 * 0.1)).abs() < 1e-9);
        assert!((mass("larch") - 1_020.0 * (1.0 - 0.08 * 0.1)).abs() < 1e-9);
        assert!((mass("sedge") - 1_020.0).abs() < 1e-9);
    }

    #[test]
    fn light_herds_only_wear_down_trees() {
        let mut cell = woodland_cell();
        cell.add_fauna(herd("reindeer", false, 1_000)).unwrap();
        assert!((cell.trampled_area_ratio() - 0.1).abs() < 1e-12);
        assert_eq!(cell.shrub_trampled_area_ratio(), 0.0);
        cell.update_flora(1).unwrap();
        let mass = |name| cell.flora_named(name).unwrap().mass();
        assert!((mass("willow") - 1_020.0).abs() < 1e-9);
        assert!((mass("larch") - 1_020.0 * (1.0 - 0.08 * 0.1)).abs() < 1e-9);
    }

    fn wolf_pack(population: u64) -> Fauna {
        let mut wolf = prey_traits("wolf");
        wolf.kind = FaunaType::Predator;
        wolf.avg_mass = 40.0;
        wolf.feeding_rate = 0.001;
        wolf.food = vec!["reindeer".into()];
        Fauna::new(wolf, population).unwrap()
    }

    #[test]
    fn predators_hunt_only_the_prey_that_names_them() {
        let mut cell = calm_cell();
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 1_000.0).unwrap())
            .unwrap();
        let mut reindeer = prey_traits("reindeer");
        reindeer.predators = vec!["wolf".into()];
        cell.add_fauna(Fauna::new(reindeer, 10).unwrap()).unwrap();
        cell.add_fauna(Fauna::new(prey_traits("hare"), 10).unwrap())
            .unwrap();
        cell.add_fauna(wolf_pack(200)).unwrap();
        cell.update_prey(2).unwrap();
        // 0.002 growth - 200 * 0.001 predation
        assert!((cell.fauna_named("reindeer").unwrap().mass() - 802.0).abs() < 1e-9);
        assert!((cell.fauna_named("hare").unwrap().mass() - 1_002.0).abs() < 1e-9);
        assert_eq!(cell.fauna_named("wolf").unwrap().mass(), 8_000.0);
    }

    #[test]
    fn crowded_predators_lose_a_fifth() {
        let mut cell = cell_with(calm_weather(Biome::SouthernTaiga), EcologyConfig::default(), 1.0);
        cell.add_fauna(wolf_pack(500)).unwrap();
        cell.update_predators(3).unwrap();
        // no prey: penalty -0.5 halves to 0.001 * 0.75
        assert!((cell.fauna()[0].mass() - 20_000.0 * 1.000_75 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut cell = calm_cell();
        cell.add_fauna(Fauna::new(prey_traits("reindeer"), 1).unwrap())
            .unwrap();
        assert!(cell
            .add_fauna(Fauna::new(prey_traits("reindeer"), 1).unwrap())
            .is_err());
    }

    #[test]
    fn extinct_organisms_are_removed() {
        let mut cell = calm_cell();
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 0.0).unwrap())
            .unwrap();
        cell.add_fauna(Fauna::new(prey_traits("reindeer"), 3).unwrap())
            .unwrap();
        assert_eq!(cell.remove_extinct(), 1);
        assert!(cell.flora().is_empty());
        assert_eq!(cell.fauna().len(), 1);
    }

    #[test]
    fn bare_ground_keeps_its_biome() {
        let mut cell = calm_cell();
        assert_eq!(cell.update_biome(), None);
        assert_eq!(cell.biome(), Biome::SouthernTaiga);
        assert_eq!(cell.flora_composition(), FloraComposition::default());
    }

    fn reference_config() -> EcologyConfig {
        let mut ratios = BTreeMap::new();
        ratios.insert(Biome::SouthernTaiga, FloraComposition::new(0.1, 0.2, 0.6, 0.1));
        ratios.insert(Biome::NorthernTundra, FloraComposition::new(0.4, 0.3, 0.0, 0.3));
        EcologyConfig::default().with_reference_ratios(ratios)
    }

    #[test]
    fn reclassifies_to_closest_base_biome() {
        let mut cell = cell_with(calm_weather(Biome::SouthernTaiga), reference_config(), 10.0);
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 400.0).unwrap())
            .unwrap();
        cell.add_flora(Flora::with_mass(flora_traits("moss", FloraType::Moss), 300.0).unwrap())
            .unwrap();
        cell.add_flora(Flora::with_mass(flora_traits("willow", FloraType::Shrub), 300.0).unwrap())
            .unwrap();
        assert_eq!(
            cell.update_biome(),
            Some(BiomeChange {
                from: Biome::SouthernTaiga,
                to: Biome::NorthernTundra
            })
        );
        assert_eq!(cell.update_biome(), None);
    }

    #[test]
    fn steppe_emerges_and_reverts() {
        let mut cell = cell_with(calm_weather(Biome::SouthernTaiga), reference_config(), 10.0);
        cell.add_flora(Flora::with_mass(flora_traits("sedge", FloraType::Grass), 900.0).unwrap())
            .unwrap();
        cell.add_flora(Flora::with_mass(flora_traits("willow", FloraType::Shrub), 100.0).unwrap())
            .unwrap();
        for _ in 0..720 {
            cell.climate_mut().record_soil_temperature(-5.0);
        }
        assert!(cell.is_steppe());
        let change = cell.update_biome().unwrap();
        assert_eq!(change.to, Biome::MammothSteppe);
        assert_eq!(cell.climate().original_biome(), Some(change.from));
        assert_eq!(cell.update_biome(), None);

        cell.climate_mut().record_soil_temperature(1.0);
        assert!(!cell.is_steppe());
        let back = cell.update_biome().unwrap();
        assert_eq!(back.from, Biome::MammothSteppe);
        assert!(back.to.is_base());
    }
}
