use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Classification state of a land cell. `MammothSteppe` is an overlay that
/// only exists on top of one of the four base biomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Biome {
    #[serde(rename = "southern taiga")]
    SouthernTaiga,
    #[serde(rename = "northern taiga")]
    NorthernTaiga,
    #[serde(rename = "southern tundra")]
    SouthernTundra,
    #[serde(rename = "northern tundra")]
    NorthernTundra,
    #[serde(rename = "mammoth steppe")]
    MammothSteppe,
}

impl Biome {
    pub const BASE: [Biome; 4] = [
        Biome::SouthernTaiga,
        Biome::NorthernTaiga,
        Biome::SouthernTundra,
        Biome::NorthernTundra,
    ];

    pub const ALL: [Biome; 5] = [
        Biome::SouthernTaiga,
        Biome::NorthernTaiga,
        Biome::SouthernTundra,
        Biome::NorthernTundra,
        Biome::MammothSteppe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Biome::SouthernTaiga => "southern taiga",
            Biome::NorthernTaiga => "northern taiga",
            Biome::SouthernTundra => "southern tundra",
            Biome::NorthernTundra => "northern tundra",
            Biome::MammothSteppe => "mammoth steppe",
        }
    }

    pub fn is_base(self) -> bool {
        self != Biome::MammothSteppe
    }

    /// Latitude bands used when seeding a grid over northern Siberia.
    pub fn from_latitude(latitude: f64) -> Biome {
        if latitude < 60.0 {
            Biome::SouthernTaiga
        } else if latitude < 70.0 {
            Biome::NorthernTaiga
        } else if latitude < 75.0 {
            Biome::SouthernTundra
        } else {
            Biome::NorthernTundra
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Biome {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        Biome::ALL
            .into_iter()
            .find(|biome| biome.name() == wanted)
            .ok_or_else(|| SimError::UnknownBiome(s.to_string()))
    }
}

/// Share of total flora biomass held by each flora type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloraComposition {
    pub grass: f64,
    pub shrub: f64,
    pub tree: f64,
    pub moss: f64,
}

impl FloraComposition {
    pub fn new(grass: f64, shrub: f64, tree: f64, moss: f64) -> Self {
        Self {
            grass,
            shrub,
            tree,
            moss,
        }
    }

    /// Normalises raw masses into ratios; all zeros when there is no flora.
    pub fn from_masses(grass: f64, shrub: f64, tree: f64, moss: f64) -> Self {
        let total = grass + shrub + tree + moss;
        if total <= 0.0 {
            return Self::default();
        }
        Self::new(grass / total, shrub / total, tree / total, moss / total)
    }

    pub fn sum(&self) -> f64 {
        self.grass + self.shrub + self.tree + self.moss
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.grass, self.shrub, self.tree, self.moss]
    }

    pub fn distance(&self, other: &FloraComposition) -> f64 {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
