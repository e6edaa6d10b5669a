use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::config::WorldGenConfig;
use crate::model::{Biome, Terrain, TerrainCell, WorldPosition};

// --- Constants ---

/// Temperature at the equator at sea level, in degrees Celsius.
const EQUATOR_TEMPERATURE: f64 = 30.0;
/// Temperature at the poles at sea level.
const POLE_TEMPERATURE: f64 = -35.0;
/// Degrees lost per metre of altitude.
const LAPSE_RATE: f64 = 0.0065;

const MAX_RAINFALL: f64 = 3_500.0;

/// Random jitter applied to altitude, as a fraction of `max_altitude`.
const ALTITUDE_NOISE: f64 = 0.15;
const RAINFALL_NOISE: f64 = 400.0;
const TEMPERATURE_NOISE: f64 = 3.0;

/// Climate envelope of a land biome: `(biome, (min_t, max_t), (min_rain, max_rain))`.
/// Presence peaks in the middle of both ranges.
const LAND_BIOMES: [(Biome, (f64, f64), (f64, f64)); 7] = [
    (Biome::IceCap, (-80.0, -8.0), (0.0, 4_000.0)),
    (Biome::Tundra, (-22.0, 4.0), (0.0, 1_500.0)),
    (Biome::Taiga, (-12.0, 12.0), (300.0, 3_000.0)),
    (Biome::Grassland, (0.0, 32.0), (150.0, 1_600.0)),
    (Biome::Forest, (4.0, 30.0), (700.0, 3_500.0)),
    (Biome::Desert, (8.0, 50.0), (-400.0, 450.0)),
    (Biome::Rainforest, (18.0, 45.0), (1_600.0, 5_000.0)),
];

/// Ocean colder than this freezes over.
const SEA_ICE_TEMPERATURE: f64 = -10.0;

/// Generate a planet grid from the config seed.
///
/// Land is raised around randomly placed continent centres. Temperature
/// falls with latitude and altitude; rainfall peaks at the equator and
/// thins inland. Biome presences are a blend weighted by how central the
/// cell's climate is to each biome's envelope.
pub fn generate_terrain(config: &WorldGenConfig) -> Terrain {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let width = config.width.max(1);
    let height = config.height.max(1);

    let continents: Vec<(f64, f64, f64)> = (0..config.num_continents)
        .map(|_| {
            let lon = rng.random_range(0.0..width as f64);
            let lat = rng.random_range(height as f64 * 0.2..height as f64 * 0.8);
            let strength = rng.random_range(0.6..1.0);
            (lon, lat, strength)
        })
        .collect();
    let radius = (config.continent_radius * width as f64).max(1.0);

    let mut cells = Vec::with_capacity((width * height) as usize);
    for lat in 0..height {
        for lon in 0..width {
            let land = continents
                .iter()
                .map(|&(clon, clat, strength)| {
                    let dlon = {
                        let d = (lon as f64 + 0.5 - clon).abs();
                        d.min(width as f64 - d)
                    };
                    let dlat = lat as f64 + 0.5 - clat;
                    let dist = (dlon * dlon + dlat * dlat).sqrt();
                    strength * (1.0 - dist / radius).max(0.0)
                })
                .fold(0.0, f64::max);

            let noise = rng.random_range(-ALTITUDE_NOISE..ALTITUDE_NOISE);
            let altitude = if land > 0.0 {
                (land + noise).max(0.01) * config.max_altitude
            } else {
                -(1.0 + noise) * config.ocean_depth
            };

            let latitude_factor = ((lat as f64 + 0.5) / height as f64 - 0.5) * PI;
            let warmth = latitude_factor.cos();
            let temperature = POLE_TEMPERATURE
                + (EQUATOR_TEMPERATURE - POLE_TEMPERATURE) * warmth
                - altitude.max(0.0) * LAPSE_RATE
                + rng.random_range(-TEMPERATURE_NOISE..TEMPERATURE_NOISE);
            let rainfall = (MAX_RAINFALL * warmth.powi(2) * (1.0 - land * 0.6)
                + rng.random_range(-RAINFALL_NOISE..RAINFALL_NOISE))
            .max(0.0);

            let presences = biome_presences(altitude, temperature, rainfall);
            cells.push(TerrainCell::new(
                WorldPosition::new(lon, lat),
                altitude,
                rainfall,
                temperature,
                presences,
            ));
        }
    }
    Terrain::from_cells(width, height, cells)
}

/// Presence share of each biome for a climate. Shares sum to 1.
pub fn biome_presences(altitude: f64, temperature: f64, rainfall: f64) -> Vec<(Biome, f64)> {
    if altitude < 0.0 {
        let biome = if temperature < SEA_ICE_TEMPERATURE {
            Biome::IceCap
        } else {
            Biome::Ocean
        };
        return vec![(biome, 1.0)];
    }

    let weights: Vec<(Biome, f64)> = LAND_BIOMES
        .iter()
        .map(|&(biome, t, r)| (biome, envelope(temperature, t) * envelope(rainfall, r)))
        .filter(|(_, w)| *w > 0.0)
        .collect();
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        let fallback = if temperature < 0.0 {
            Biome::IceCap
        } else {
            Biome::Desert
        };
        return vec![(fallback, 1.0)];
    }
    weights.into_iter().map(|(b, w)| (b, w / total)).collect()
}

/// 1 at the middle of `[min, max]`, falling linearly to 0 at either end.
fn envelope(value: f64, (min, max): (f64, f64)) -> f64 {
    let span = max - min;
    if span <= 0.0 {
        return 0.0;
    }
    (1.0 - (2.0 * (value - min) / span - 1.0).abs()).max(0.0)
}
