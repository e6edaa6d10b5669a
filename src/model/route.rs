use serde::{Deserialize, Serialize};

use super::biome::Biome;
use super::date::WorldDate;
use super::position::{Direction, WorldPosition};
use super::terrain::Terrain;
use crate::error::SimError;
use crate::id::RouteId;
use crate::rng::{self, offsets};

// --- Constants ---

/// Added to the coastline weight every time the walk touches a coast.
pub const COAST_PREFERENCE_INCREMENT: f64 = 400.0;

/// Added to the end-route preference on every coastal step and landfall.
pub const END_ROUTE_PREFERENCE_INCREMENT: f64 = 0.1;

/// A sea route from a coastal cell to the landfall cell it reaches.
///
/// `cells` is ordered from `first_cell`. `last_cell` is `None` when the walk
/// ran out of viable cells before reaching land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub first_cell: WorldPosition,
    pub last_cell: Option<WorldPosition>,
    pub cells: Vec<WorldPosition>,
    /// Kilometres travelled.
    pub length: f64,
    /// Direction of the final step onto land.
    pub migration_direction: Option<Direction>,
    pub consolidated: bool,
}

struct RouteWalk<'a> {
    terrain: &'a Terrain,
    world_seed: u64,
    date: WorldDate,
    first_key: u64,
    traversing_sea: bool,
    traverse_direction: Direction,
    direction_offset: f64,
    coast_preference: f64,
    end_route_preference: f64,
}

impl RouteWalk<'_> {
    fn random(&self, offset: u32) -> f64 {
        rng::local_random_float(self.world_seed, self.first_key, self.date, offset)
    }

    fn choose_next(&mut self, route: &Route, current: WorldPosition, step: u32) -> Option<(Direction, WorldPosition)> {
        if self.traversing_sea {
            self.choose_next_depth_sea_cell(route, current, step)
        } else {
            self.choose_next_coastal_cell(route, current, step)
        }
    }

    /// Biased walk around the persisted heading until a coastline is reached.
    fn choose_next_depth_sea_cell(
        &mut self,
        route: &Route,
        current: WorldPosition,
        step: u32,
    ) -> Option<(Direction, WorldPosition)> {
        let mut deviation = 2.0 * self.random(offsets::ROUTE_CHOOSE_NEXT_DEPTH_SEA_CELL + step) - 1.0;
        deviation = (deviation * deviation + 1.0) / 2.0;
        deviation = self.direction_offset - deviation;

        let direction = if deviation >= 0.5 {
            self.traverse_direction.rotate(1)
        } else if deviation < -0.5 {
            self.traverse_direction.rotate(6)
        } else if deviation < 0.0 {
            self.traverse_direction.rotate(7)
        } else {
            self.traverse_direction
        };

        let next = self.terrain.neighbor(current, direction)?;
        if route.cells.contains(&next) {
            return None;
        }
        if self.terrain.cell(next)?.is_part_of_coastline {
            self.coast_preference += COAST_PREFERENCE_INCREMENT;
            self.end_route_preference += END_ROUTE_PREFERENCE_INCREMENT;
            self.traversing_sea = false;
        }
        Some((direction, next))
    }

    /// Weighted pick among unvisited neighbours, favouring coastal ocean
    /// and, increasingly, land.
    fn choose_next_coastal_cell(
        &mut self,
        route: &Route,
        current: WorldPosition,
        step: u32,
    ) -> Option<(Direction, WorldPosition)> {
        let cell = self.terrain.cell(current)?;
        let mut candidates = Vec::with_capacity(cell.neighbors.len());
        let mut weights = Vec::with_capacity(cell.neighbors.len());
        for &(direction, npos) in &cell.neighbors {
            if route.cells.contains(&npos) {
                continue;
            }
            let Some(ncell) = self.terrain.cell(npos) else { continue };
            let ocean = ncell.biome_presence(Biome::Ocean);
            let mut weight = ocean;
            if ncell.is_part_of_coastline {
                weight *= self.coast_preference;
            }
            weight += (1.0 - ocean) * self.end_route_preference;
            candidates.push((direction, npos));
            weights.push(weight);
        }

        let score = self.random(offsets::ROUTE_CHOOSE_NEXT_COASTAL_CELL + step);
        let (direction, target) = candidates[rng::weighted_selection(score, &weights)?];

        if !self.terrain.cell(target)?.is_part_of_coastline {
            self.traversing_sea = true;
            self.traverse_direction = direction;
            self.direction_offset = self.random(offsets::ROUTE_CHOOSE_NEXT_COASTAL_CELL_2 + step);
        }
        self.end_route_preference += END_ROUTE_PREFERENCE_INCREMENT;

        Some((direction, target))
    }
}

impl Route {
    /// Walk from `first_cell` across the sea. Deterministic in
    /// `(world_seed, first_cell, date)`. Terminates because no cell is
    /// visited twice.
    pub fn build(
        id: RouteId,
        terrain: &Terrain,
        world_seed: u64,
        date: WorldDate,
        first_cell: WorldPosition,
    ) -> Self {
        let mut route = Route {
            id,
            first_cell,
            last_cell: None,
            cells: vec![first_cell],
            length: 0.0,
            migration_direction: None,
            consolidated: false,
        };
        let mut walk = RouteWalk {
            terrain,
            world_seed,
            date,
            first_key: rng::cell_key(first_cell.longitude, first_cell.latitude),
            traversing_sea: false,
            traverse_direction: Direction::North,
            direction_offset: 0.0,
            coast_preference: COAST_PREFERENCE_INCREMENT,
            end_route_preference: 0.0,
        };

        let mut current = first_cell;
        let mut step: u32 = 0;
        loop {
            let Some((direction, next)) = walk.choose_next(&route, current, step) else {
                break;
            };
            step += 1;

            let distance = terrain
                .cell(current)
                .and_then(|c| c.distance_to(next))
                .unwrap_or_default();
            route.length += distance;
            route.cells.push(next);

            let landed = terrain
                .cell(next)
                .is_some_and(|c| c.biome_presence(Biome::Ocean) <= 0.0);
            if landed {
                route.last_cell = Some(next);
                route.migration_direction = Some(direction);
                break;
            }
            current = next;
        }

        route
    }

    /// Register the route with every cell it crosses. Idempotent.
    pub fn consolidate(&mut self, terrain: &mut Terrain) {
        if self.consolidated {
            return;
        }
        for pos in &self.cells {
            if let Some(cell) = terrain.cell_mut(*pos) {
                cell.crossing_routes.insert(self.id);
            }
        }
        self.consolidated = true;
    }

    /// Unregister from crossed cells and forget the path.
    pub fn reset(&mut self, terrain: &mut Terrain) {
        if !self.consolidated {
            return;
        }
        self.destroy(terrain);
        self.cells.clear();
        self.last_cell = None;
        self.migration_direction = None;
        self.length = 0.0;
        self.consolidated = false;
    }

    /// Unregister from crossed cells.
    pub fn destroy(&self, terrain: &mut Terrain) {
        if !self.consolidated {
            return;
        }
        for pos in &self.cells {
            if let Some(cell) = terrain.cell_mut(*pos) {
                cell.crossing_routes.remove(&self.id);
            }
        }
    }

    /// Re-register a loaded route with its cells. Only consolidated routes
    /// are persisted.
    pub fn finalize_load(&self, terrain: &mut Terrain) -> Result<(), SimError> {
        if !self.consolidated {
            return Err(SimError::invariant(
                self.id,
                0,
                "route finalize_load",
                "route is not consolidated",
            ));
        }
        if self.cells.is_empty() {
            return Err(SimError::invariant(self.id, 0, "route finalize_load", "route has no cells"));
        }
        for pos in &self.cells {
            let cell = terrain.cell_mut(*pos).ok_or(SimError::MissingCell(*pos))?;
            cell.crossing_routes.insert(self.id);
        }
        Ok(())
    }
}
