use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Largest width or height. Event ids hold longitude and latitude in three
/// decimal digits each.
pub const MAX_GRID_SIDE: u32 = 999;

/// Configuration for world generation. Stored in snapshots so terrain can
/// be regenerated on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    /// RNG seed for deterministic generation and every simulation stream.
    pub seed: u64,
    /// Cells around the planet.
    pub width: u32,
    /// Cells from pole to pole.
    pub height: u32,
    /// Number of continent centres to raise land around.
    pub num_continents: u32,
    /// Continent radius as a fraction of the map width.
    pub continent_radius: f64,
    /// Peak altitude of a continent centre, in metres.
    pub max_altitude: f64,
    /// Depth of the open ocean, in metres.
    pub ocean_depth: f64,
    /// Biome skill of the founding culture (0.0–1.0).
    pub starting_skill: f64,
}

impl WorldGenConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        let fits = |side: u32| (1..=MAX_GRID_SIDE).contains(&side);
        if fits(self.width) && fits(self.height) {
            Ok(())
        } else {
            Err(SimError::GridSize {
                width: self.width,
                height: self.height,
                max: MAX_GRID_SIDE,
            })
        }
    }
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 80,
            height: 40,
            num_continents: 5,
            continent_radius: 0.12,
            max_altitude: 4_000.0,
            ocean_depth: 3_000.0,
            starting_skill: 0.5,
        }
    }
}
