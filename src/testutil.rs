//! Hand-built worlds for unit tests.

use crate::id::GroupId;
use crate::model::group::optimal_population;
use crate::model::{Biome, CellGroup, Culture, Terrain, TerrainCell, World, WorldPosition};
use crate::worldgen::WorldGenConfig;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

fn grid(width: u32, height: u32, cell: impl Fn(WorldPosition) -> TerrainCell) -> Terrain {
    let cells = (0..height)
        .flat_map(|lat| (0..width).map(move |lon| WorldPosition::new(lon, lat)))
        .map(cell)
        .collect();
    Terrain::from_cells(width, height, cells)
}

fn land(pos: WorldPosition, biome: Biome) -> TerrainCell {
    TerrainCell::new(pos, 100.0, 1_000.0, 15.0, vec![(biome, 1.0)])
}

fn ocean(pos: WorldPosition) -> TerrainCell {
    TerrainCell::new(pos, -1_000.0, 1_000.0, 15.0, vec![(Biome::Ocean, 1.0)])
}

pub fn grass_terrain(width: u32, height: u32) -> Terrain {
    grid(width, height, |pos| land(pos, Biome::Grassland))
}

/// Grassland west of longitude `split`, forest from `split` eastward.
pub fn striped_terrain(width: u32, height: u32, split: u32) -> Terrain {
    grid(width, height, |pos| {
        if pos.longitude < split {
            land(pos, Biome::Grassland)
        } else {
            land(pos, Biome::Forest)
        }
    })
}

/// 12x8 ocean with two grassland islands: longitudes 2..=3 and 8..=9, both
/// spanning latitudes 3..=5.
pub fn island_terrain() -> Terrain {
    grid(12, 8, |pos| {
        let on_island = (3..=5).contains(&pos.latitude)
            && ((2..=3).contains(&pos.longitude) || (8..=9).contains(&pos.longitude));
        if on_island {
            land(pos, Biome::Grassland)
        } else {
            ocean(pos)
        }
    })
}

/// 8x6 ocean around a single grassland cell at (3, 3).
pub fn lone_island_terrain() -> Terrain {
    grid(8, 6, |pos| {
        if pos == WorldPosition::new(3, 3) {
            land(pos, Biome::Grassland)
        } else {
            ocean(pos)
        }
    })
}

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

fn world_with(terrain: Terrain) -> World {
    let config = WorldGenConfig {
        seed: 42,
        width: terrain.width,
        height: terrain.height,
        ..WorldGenConfig::default()
    };
    World::new(config, terrain)
}

pub fn grass_world(width: u32, height: u32) -> World {
    world_with(grass_terrain(width, height))
}

pub fn striped_world(width: u32, height: u32, split: u32) -> World {
    world_with(striped_terrain(width, height, split))
}

pub fn island_world() -> World {
    world_with(island_terrain())
}

pub fn lone_island_world() -> World {
    world_with(lone_island_terrain())
}

/// Add a founding-culture group at `pos` with its carrying capacity set.
/// No events are queued and `next_update_date` is left at the current date.
pub fn place_group(world: &mut World, pos: WorldPosition, population: u64) -> GroupId {
    let cell = world.cell(pos).expect("position on the grid");
    let culture = Culture::founding(cell, 0.5, None);
    let optimal = optimal_population(&culture, cell);
    let id = world.new_group_id();
    let mut group = CellGroup::new(id, pos, population, culture, world.current_date);
    group.optimal_population = optimal;
    world.add_group(group).expect("cell is free");
    id
}

// ---------------------------------------------------------------------------
// Assertion helpers
// ---------------------------------------------------------------------------

/// Assert that two f64 values are within tolerance.
pub fn assert_approx(actual: f64, expected: f64, tolerance: f64, msg: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{msg}: expected {expected}, got {actual} (tolerance {tolerance})"
    );
}
