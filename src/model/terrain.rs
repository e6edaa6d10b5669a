use std::collections::BTreeSet;
use std::f64::consts::PI;

use super::biome::Biome;
use super::date::WorldDate;
use super::position::{Direction, WorldPosition};
use crate::id::{GroupId, RegionId, RouteId};
use crate::rng;

// --- Constants ---

/// Planet radius in kilometres.
pub const PLANET_RADIUS: f64 = 6371.0;

/// Altitude, in metres, above which nothing can live.
pub const MAX_POSSIBLE_ALTITUDE: f64 = 15_000.0;

// ---------------------------------------------------------------------------
// TerrainCell
// ---------------------------------------------------------------------------

/// One cell of the planet grid.
///
/// Physical attributes are immutable after generation. The back-references
/// (`group`, `region`, `crossing_routes`) are id lookups into the world arenas
/// and are rebuilt when a snapshot is resolved.
#[derive(Debug, Clone)]
pub struct TerrainCell {
    pub position: WorldPosition,
    /// Metres above sea level; negative under water.
    pub altitude: f64,
    /// Millimetres per year.
    pub rainfall: f64,
    /// Mean degrees Celsius.
    pub temperature: f64,
    /// Square kilometres.
    pub area: f64,
    /// Presence fraction per biome, in `Biome::ALL` order, summing to at most 1.
    pub biome_presences: Vec<(Biome, f64)>,
    pub is_part_of_coastline: bool,
    /// Neighbours in clockwise `Direction` order; missing past the poles.
    pub neighbors: Vec<(Direction, WorldPosition)>,
    /// Distance in kilometres to each entry of `neighbors`.
    pub neighbor_distances: Vec<f64>,

    pub group: Option<GroupId>,
    pub region: Option<RegionId>,
    pub crossing_routes: BTreeSet<RouteId>,
}

impl TerrainCell {
    pub fn new(
        position: WorldPosition,
        altitude: f64,
        rainfall: f64,
        temperature: f64,
        biome_presences: Vec<(Biome, f64)>,
    ) -> Self {
        let mut biome_presences: Vec<(Biome, f64)> = biome_presences
            .into_iter()
            .filter(|(_, p)| *p > 0.0)
            .collect();
        biome_presences.sort_by_key(|(b, _)| *b);
        Self {
            position,
            altitude,
            rainfall,
            temperature,
            area: 0.0,
            biome_presences,
            is_part_of_coastline: false,
            neighbors: Vec::new(),
            neighbor_distances: Vec::new(),
            group: None,
            region: None,
            crossing_routes: BTreeSet::new(),
        }
    }

    pub fn biome_presence(&self, biome: Biome) -> f64 {
        self.biome_presences
            .iter()
            .find(|(b, _)| *b == biome)
            .map_or(0.0, |(_, p)| *p)
    }

    /// The biome with the largest presence; ties go to the earlier biome.
    pub fn most_present_biome(&self) -> Option<Biome> {
        let mut best: Option<(Biome, f64)> = None;
        for &(biome, presence) in &self.biome_presences {
            if best.is_none_or(|(_, p)| presence > p) {
                best = Some((biome, presence));
            }
        }
        best.map(|(b, _)| b)
    }

    pub fn water_presence(&self) -> f64 {
        self.biome_presences
            .iter()
            .filter(|(b, _)| b.is_water())
            .map(|(_, p)| p)
            .sum()
    }

    /// Presence-weighted survivability of the bare terrain.
    pub fn survivability(&self) -> f64 {
        self.biome_presences
            .iter()
            .map(|(b, p)| b.survivability() * p)
            .sum()
    }

    /// Presence-weighted foraging capacity of the bare terrain.
    pub fn foraging_capacity(&self) -> f64 {
        self.biome_presences
            .iter()
            .map(|(b, p)| b.foraging_capacity() * p)
            .sum()
    }

    pub fn neighbor(&self, direction: Direction) -> Option<WorldPosition> {
        self.neighbors
            .iter()
            .find(|(d, _)| *d == direction)
            .map(|(_, p)| *p)
    }

    pub fn distance_to(&self, target: WorldPosition) -> Option<f64> {
        self.neighbors
            .iter()
            .position(|(_, p)| *p == target)
            .map(|i| self.neighbor_distances[i])
    }

    pub fn rng_key(&self) -> u64 {
        rng::cell_key(self.position.longitude, self.position.latitude)
    }

    /// Next value of this cell's random stream.
    pub fn random_float(&self, world_seed: u64, date: WorldDate, offset: u32) -> f64 {
        rng::local_random_float(world_seed, self.rng_key(), date, offset)
    }

    pub fn random_int(&self, world_seed: u64, date: WorldDate, offset: u32, max: u32) -> u32 {
        rng::local_random_int(world_seed, self.rng_key(), date, offset, max)
    }
}

// ---------------------------------------------------------------------------
// Terrain grid
// ---------------------------------------------------------------------------

/// Planet grid of `width * height` cells, stored row-major by latitude.
#[derive(Debug, Clone)]
pub struct Terrain {
    pub width: u32,
    pub height: u32,
    /// Area of the largest cell (the equatorial band).
    pub max_area: f64,
    cells: Vec<TerrainCell>,
}

impl Terrain {
    /// Build a grid from cells given in row-major order. Computes areas,
    /// neighbour links and distances, and coastline flags.
    ///
    /// # Panics
    /// Panics if `cells.len() != width * height` or a cell's position does not
    /// match its index.
    pub fn from_cells(width: u32, height: u32, mut cells: Vec<TerrainCell>) -> Self {
        assert_eq!(
            cells.len(),
            (width * height) as usize,
            "terrain grid size mismatch"
        );
        for (i, cell) in cells.iter().enumerate() {
            let expected = WorldPosition::new(i as u32 % width, i as u32 / width);
            assert_eq!(cell.position, expected, "terrain cell out of order");
        }

        let lon_span = 2.0 * PI * PLANET_RADIUS / width as f64;
        let lat_span = PI * PLANET_RADIUS / height as f64;
        let lat_cos = |lat: u32| (((lat as f64 + 0.5) / height as f64 - 0.5) * PI).cos();

        let mut max_area: f64 = 0.0;
        for cell in cells.iter_mut() {
            cell.area = lon_span * lat_cos(cell.position.latitude) * lat_span;
            max_area = max_area.max(cell.area);
        }

        for i in 0..cells.len() {
            let pos = cells[i].position;
            let mut neighbors = Vec::with_capacity(8);
            let mut distances = Vec::with_capacity(8);
            for dir in Direction::ALL {
                let Some(npos) = offset_position(width, height, pos, dir) else {
                    continue;
                };
                if npos == pos {
                    continue;
                }
                let (dx, dy) = dir.delta();
                let mid_cos = (lat_cos(pos.latitude) + lat_cos(npos.latitude)) / 2.0;
                let x = dx.abs() as f64 * lon_span * mid_cos;
                let y = dy.abs() as f64 * lat_span;
                neighbors.push((dir, npos));
                distances.push((x * x + y * y).sqrt());
            }
            cells[i].neighbors = neighbors;
            cells[i].neighbor_distances = distances;
        }

        let water: Vec<f64> = cells.iter().map(|c| c.water_presence()).collect();
        for i in 0..cells.len() {
            let own = water[i];
            let coast = cells[i].neighbors.iter().any(|(_, npos)| {
                let other = water[(npos.latitude * width + npos.longitude) as usize];
                (own > 0.0 && other < 1.0) || (own < 1.0 && other > 0.0)
            });
            cells[i].is_part_of_coastline = coast;
        }

        Self {
            width,
            height,
            max_area,
            cells,
        }
    }

    fn index(&self, pos: WorldPosition) -> Option<usize> {
        (pos.longitude < self.width && pos.latitude < self.height)
            .then(|| (pos.latitude * self.width + pos.longitude) as usize)
    }

    pub fn cell(&self, pos: WorldPosition) -> Option<&TerrainCell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, pos: WorldPosition) -> Option<&mut TerrainCell> {
        self.index(pos).map(|i| &mut self.cells[i])
    }

    pub fn cells(&self) -> impl Iterator<Item = &TerrainCell> {
        self.cells.iter()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut TerrainCell> {
        self.cells.iter_mut()
    }

    pub fn neighbor(&self, pos: WorldPosition, direction: Direction) -> Option<WorldPosition> {
        self.cell(pos).and_then(|c| c.neighbor(direction))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Step one cell in `dir`, wrapping longitude and stopping at the poles.
fn offset_position(
    width: u32,
    height: u32,
    pos: WorldPosition,
    dir: Direction,
) -> Option<WorldPosition> {
    let (dx, dy) = dir.delta();
    let lat = pos.latitude as i64 + dy;
    if lat < 0 || lat >= height as i64 {
        return None;
    }
    let lon = (pos.longitude as i64 + dx).rem_euclid(width as i64);
    Some(WorldPosition::new(lon as u32, lat as u32))
}
