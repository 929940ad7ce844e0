use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, error, warn};

use super::{ClimateStat, ClimateStatisticsProvider, ClimateTable, ClimateVariable};
use crate::biome::Biome;

/// Reads per-day statistics from CSV files, one file per (biome, variable).
///
/// Expected header: a `date` (`YYYY-MM-DD`) or `day` column, a column whose
/// name starts with `mean`, and one whose name ends with `var`/`variance`.
#[derive(Debug, Clone, Default)]
pub struct CsvStatisticsLoader {
    base_dir: PathBuf,
    files: BTreeMap<Biome, BTreeMap<ClimateVariable, PathBuf>>,
}

impl CsvStatisticsLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(
        mut self,
        biome: Biome,
        variable: ClimateVariable,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.files
            .entry(biome)
            .or_default()
            .insert(variable, path.into());
        self
    }

    pub fn with_files(mut self, files: BTreeMap<Biome, BTreeMap<ClimateVariable, PathBuf>>) -> Self {
        for (biome, variables) in files {
            self.files.entry(biome).or_default().extend(variables);
        }
        self
    }

    pub fn load_file(&self, path: &Path) -> ClimateTable {
        let path = self.base_dir.join(path);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let table = parse_table(&text, &path);
                debug!(path = %path.display(), rows = table.len(), "loaded climate statistics");
                table
            }
            Err(err) => {
                error!(path = %path.display(), %err, "failed to read climate statistics");
                ClimateTable::new()
            }
        }
    }
}

impl ClimateStatisticsProvider for CsvStatisticsLoader {
    fn load(&self, biome: Biome, variable: ClimateVariable) -> ClimateTable {
        match self.files.get(&biome).and_then(|files| files.get(&variable)) {
            Some(path) => self.load_file(path),
            None => {
                error!(%biome, %variable, "no statistics file configured");
                ClimateTable::new()
            }
        }
    }
}

struct Columns {
    day: usize,
    is_date: bool,
    mean: usize,
    variance: usize,
}

impl Columns {
    fn locate(header: &str) -> Option<Self> {
        let names: Vec<String> = header
            .split(',')
            .map(|name| name.trim().trim_matches('"').to_ascii_lowercase())
            .collect();
        let date = names.iter().position(|name| name == "date");
        let day = names
            .iter()
            .position(|name| name == "day" || name == "day_of_year");
        let mean = names.iter().position(|name| name.starts_with("mean"))?;
        let variance = names
            .iter()
            .position(|name| name.ends_with("var") || name.ends_with("variance"))?;
        match (date, day) {
            (Some(index), _) => Some(Self {
                day: index,
                is_date: true,
                mean,
                variance,
            }),
            (None, Some(index)) => Some(Self {
                day: index,
                is_date: false,
                mean,
                variance,
            }),
            (None, None) => None,
        }
    }
}

pub(crate) fn parse_table(text: &str, source: &Path) -> ClimateTable {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        error!(path = %source.display(), "climate statistics file is empty");
        return ClimateTable::new();
    };
    let Some(columns) = Columns::locate(header) else {
        error!(path = %source.display(), header, "missing day/mean/variance columns");
        return ClimateTable::new();
    };

    let mut table = ClimateTable::new();
    for (index, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(|field| field.trim().trim_matches('"')).collect();
        let row = index + 2;
        let day = fields
            .get(columns.day)
            .and_then(|raw| parse_day(raw, columns.is_date));
        let Some(day) = day else {
            warn!(path = %source.display(), row, "skipping row with unusable day");
            continue;
        };
        let mean = fields.get(columns.mean).and_then(|raw| parse_number(raw));
        let variance = fields.get(columns.variance).and_then(|raw| parse_number(raw));
        match (mean, variance) {
            (Some(mean), Some(variance)) if variance >= 0.0 => {
                table.insert(day, ClimateStat::new(mean, variance));
            }
            (Some(_), Some(variance)) => {
                warn!(path = %source.display(), row, day, variance, "skipping row with negative variance");
            }
            _ => {
                warn!(path = %source.display(), row, day, "skipping row with missing mean or variance");
            }
        }
    }
    table
}

fn parse_number(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Day of year on a 365-day calendar; 29 February is dropped.
fn parse_day(raw: &str, is_date: bool) -> Option<u16> {
    if !is_date {
        return raw
            .parse::<u16>()
            .ok()
            .filter(|day| (1..=365).contains(day));
    }
    let date = NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()?;
    let ordinal = date.ordinal() as u16;
    let leap = NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some();
    match (leap, ordinal) {
        (true, 60) => None,
        (true, day) if day > 60 => Some(day - 1),
        (_, day) => Some(day),
    }
}
