use std::collections::BTreeMap;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::{ClimateStat, ClimateStatisticsProvider, ClimateTable, ClimateVariable};
use crate::biome::Biome;

fn default_peak_day() -> u16 {
    196
}

/// Annual cosine cycle of a variable's daily mean with a constant variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalCurve {
    pub annual_mean: f64,
    #[serde(default)]
    pub amplitude: f64,
    /// Day of year on which the mean peaks.
    #[serde(default = "default_peak_day")]
    pub peak_day: u16,
    #[serde(default)]
    pub variance: f64,
}

impl SeasonalCurve {
    pub fn stat(&self, day: u16) -> ClimateStat {
        let phase = TAU * (f64::from(day) - f64::from(self.peak_day)) / 365.0;
        ClimateStat::new(self.annual_mean + self.amplitude * phase.cos(), self.variance)
    }

    pub fn table(&self) -> ClimateTable {
        (1..=365).map(|day| (day, self.stat(day))).collect()
    }
}

/// Parametric statistics for scenarios that ship without reanalysis tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonalStatistics {
    curves: BTreeMap<Biome, BTreeMap<ClimateVariable, SeasonalCurve>>,
}

impl SeasonalStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curve(mut self, biome: Biome, variable: ClimateVariable, curve: SeasonalCurve) -> Self {
        self.curves.entry(biome).or_default().insert(variable, curve);
        self
    }
}

impl ClimateStatisticsProvider for SeasonalStatistics {
    fn load(&self, biome: Biome, variable: ClimateVariable) -> ClimateTable {
        self.curves
            .get(&biome)
            .and_then(|curves| curves.get(&variable))
            .map(SeasonalCurve::table)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_peaks_on_peak_day() {
        let curve = SeasonalCurve {
            annual_mean: -5.0,
            amplitude: 20.0,
            peak_day: 196,
            variance: 4.0,
        };
        assert!((curve.stat(196).mean - 15.0).abs() < 1e-9);
        assert!(curve.stat(14).mean < -20.0);
        assert_eq!(curve.stat(1).variance, 4.0);
        assert_eq!(curve.table().len(), 365);
    }

    #[test]
    fn negative_variance_curve_produces_no_rows() {
        let curve = SeasonalCurve {
            annual_mean: 1.0,
            amplitude: 0.0,
            peak_day: 1,
            variance: -0.1,
        };
        assert!(curve.table().is_empty());
    }

    #[test]
    fn curves_built_in_code_match_yaml() {
        let yaml = "northern tundra:\n  snowfall:\n    annual_mean: 0.002\n    amplitude: -0.002\n";
        let parsed: SeasonalStatistics = serde_yaml::from_str(yaml).unwrap();
        let built = SeasonalStatistics::new().with_curve(
            Biome::NorthernTundra,
            ClimateVariable::Snowfall,
            SeasonalCurve {
                annual_mean: 0.002,
                amplitude: -0.002,
                peak_day: 196,
                variance: 0.0,
            },
        );
        let load = |stats: &SeasonalStatistics| stats.load(Biome::NorthernTundra, ClimateVariable::Snowfall);
        assert_eq!(load(&built), load(&parsed));
        assert!(built
            .load(Biome::SouthernTaiga, ClimateVariable::Snowfall)
            .is_empty());
    }

    #[test]
    fn deserializes_from_yaml() {
        let yaml = "southern taiga:\n  temperature:\n    annual_mean: 0.5\n    amplitude: 20.0\n";
        let stats: SeasonalStatistics = serde_yaml::from_str(yaml).unwrap();
        let table = stats.load(Biome::SouthernTaiga, ClimateVariable::Temperature);
        assert_eq!(table.len(), 365);
        assert!(stats
            .load(Biome::SouthernTaiga, ClimateVariable::Uv)
            .is_empty());
    }
}
