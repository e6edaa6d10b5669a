use tracing::debug;

use super::context::EventContext;
use super::event::{EventKind, WorldEvent};
use super::{group_update, polity};
use crate::error::SimError;
use crate::id::{GroupId, RouteId};
use crate::model::group::calculate_adaption;
use crate::model::terrain::MAX_POSSIBLE_ALTITUDE;
use crate::model::{
    CellGroup, DiscoveryKind, MigratingGroup, Route, World, WorldPosition, date_after,
};
use crate::rng::{self, offsets};

// --- Constants ---

/// Multiplier and bonus applied to the value of staying put.
pub const NO_MIGRATION_PREFERENCE: f64 = 3.0;

/// Largest share of a group that leaves in one migration.
pub const MAX_MIGRATION_PERCENTAGE: f64 = 0.25;

pub const TRAVEL_TIME_FACTOR: f64 = 1.0;

/// Attractiveness of `target` for `group`. The group's own cell gets the
/// no-migration bonus.
fn migration_value(world: &World, group: &CellGroup, target: WorldPosition) -> f64 {
    let Some(cell) = world.terrain.cell(target) else {
        return 0.0;
    };
    let area_factor = if world.terrain.max_area > 0.0 {
        cell.area / world.terrain.max_area
    } else {
        0.0
    };
    let altitude_factor = 1.0 - cell.altitude.max(0.0) / MAX_POSSIBLE_ALTITUDE;

    let stress = cell
        .group
        .and_then(|g| world.groups.get(&g))
        .map_or(0.0, |g| g.population_stress());
    let stress_factor = (1.0 - stress).powi(4);

    let (foraging, survivability) = calculate_adaption(&group.culture, cell);
    let adaption_factor = survivability * foraging;

    let mut value = adaption_factor * altitude_factor * area_factor * stress_factor;
    if target == group.position {
        value = value * NO_MIGRATION_PREFERENCE + NO_MIGRATION_PREFERENCE;
    }
    value.max(0.0)
}

/// Cells a group could move to: its own cell, its neighbours, and the
/// landfall of its sea route if it has one.
fn migration_candidates(world: &World, group: &CellGroup) -> Vec<WorldPosition> {
    let Some(cell) = world.terrain.cell(group.position) else {
        return Vec::new();
    };
    let mut candidates: Vec<WorldPosition> = cell.neighbors.iter().map(|(_, p)| *p).collect();
    candidates.push(group.position);

    let landfall = group
        .sea_route
        .and_then(|r| world.routes.get(&r))
        .and_then(|r| r.last_cell);
    if let Some(landfall) = landfall
        && !candidates.contains(&landfall)
    {
        candidates.push(landfall);
    }
    candidates
}

/// Pick a destination and, unless the group stays, schedule a migration
/// event. Does nothing while a migration is already pending.
pub fn consider_migration(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let group = world.group(id)?;
    if group.pending_migration.is_some() {
        return Ok(());
    }
    let cell = world.cell(group.position)?;
    let date = world.current_date;
    let percentage = MAX_MIGRATION_PERCENTAGE * cell.random_float(world.seed, date, offsets::MIGRATION_PERCENT);
    let score = cell.random_float(world.seed, date, offsets::MIGRATION_SCORE);

    let candidates = migration_candidates(world, group);
    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| migration_value(world, group, *c))
        .collect();

    let Some(chosen) = rng::weighted_selection(score, &weights) else {
        return Ok(());
    };
    let target = candidates[chosen];
    if target == group.position {
        return Ok(());
    }

    let target_cell = world.cell(target)?;
    let (_, survivability) = calculate_adaption(&group.culture, target_cell);
    if survivability <= 0.0 {
        return Ok(());
    }
    let travel_time = (TRAVEL_TIME_FACTOR / survivability.powi(3)).ceil();
    let Some(trigger_date) = date_after(date, travel_time) else {
        debug!(%id, travel_time, "migration travel time out of range");
        return Ok(());
    };
    let Some(event) = WorldEvent::for_group(
        EventKind::MigrateGroup { group: id },
        group.position,
        date,
        trigger_date,
    ) else {
        return Ok(());
    };

    world.group_mut(id)?.pending_migration = Some(MigratingGroup {
        target,
        percentage,
        trigger_date,
    });
    world.insert_event(event)
}

pub fn can_migrate(world: &World, id: GroupId) -> bool {
    world
        .groups
        .get(&id)
        .and_then(|g| g.pending_migration.as_ref())
        .is_some_and(|m| world.terrain.cell(m.target).is_some())
}

/// Split the migrating share off the source group and settle it in the
/// target cell, merging with any group already there.
pub fn migrate_group(ctx: &mut EventContext<'_>, id: GroupId) -> Result<(), SimError> {
    let world = &mut *ctx.world;
    let Some(migration) = world.group(id)?.pending_migration.clone() else {
        return Ok(());
    };

    group_update::advance_group(world, id)?;
    let source = world.group_mut(id)?;
    let migrants = (source.population as f64 * migration.percentage).floor() as u64;
    if migrants == 0 {
        return Ok(());
    }
    source.population -= migrants;
    let culture = source.culture.clone();
    let origin = source.position;
    let prominences: Vec<_> = source.prominences.values().cloned().collect();
    world.note_population_change(id);

    let distance = world
        .cell(origin)?
        .distance_to(migration.target)
        .or_else(|| {
            world
                .groups
                .get(&id)
                .and_then(|g| g.sea_route)
                .and_then(|r| world.routes.get(&r))
                .map(|r| r.length)
        })
        .unwrap_or_default();

    let existing = world
        .cell(migration.target)?
        .group
        .filter(|g| world.group_is_present(*g));
    match existing {
        Some(target) => {
            group_update::merge_group(world, ctx.content, target, migrants, &culture, &prominences)?;
        }
        None => {
            let new_id = world.new_group_id();
            let group = CellGroup::new(new_id, migration.target, migrants, culture, world.current_date);
            group_update::spawn_group(world, ctx.content, group)?;
            for p in &prominences {
                polity::set_prominence(world, new_id, p.polity, p.value, p.core_distance + distance)?;
            }
            debug!(source = %id, group = %new_id, migrants, target = %migration.target, "group founded by migration");
        }
    }

    group_update::reschedule(world, ctx.content, id)
}

/// Build a sea route for coastal groups that can sail and lack one.
pub fn ensure_sea_route(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let group = world.group(id)?;
    if group.sea_route.is_some() || !group.culture.has_discovery(DiscoveryKind::Sailing) {
        return Ok(());
    }
    let position = group.position;
    if !world.cell(position)?.is_part_of_coastline {
        return Ok(());
    }

    // The id is only taken once the walk reaches land.
    let pending_id = RouteId(world.id_gen.peek());
    let mut route = Route::build(pending_id, &world.terrain, world.seed, world.current_date, position);
    if route.last_cell.is_none() {
        return Ok(());
    }
    let route_id = world.new_route_id();
    route.id = route_id;
    route.consolidate(&mut world.terrain);
    debug!(%id, route = %route_id, cells = route.cells.len(), "sea route built");
    world.routes.insert(route_id, route);
    world.group_mut(id)?.sea_route = Some(route_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ContentRegistry;
    use crate::testutil::{assert_approx, grass_world, island_world, lone_island_world, place_group};

    fn sailors(world: &mut World, pos: WorldPosition) -> GroupId {
        let id = place_group(world, pos, 1_000);
        world.group_mut(id).unwrap().culture.gain_discovery(DiscoveryKind::Sailing);
        id
    }

    fn send(world: &mut World, id: GroupId, target: WorldPosition, percentage: f64) {
        world.group_mut(id).unwrap().pending_migration = Some(MigratingGroup {
            target,
            percentage,
            trigger_date: world.current_date,
        });
    }

    #[test]
    fn failed_route_walk_takes_no_id() {
        let mut world = lone_island_world();
        let id = sailors(&mut world, WorldPosition::new(3, 3));
        let next_id = world.id_gen.peek();
        for date in 1..50 {
            world.current_date = date;
            ensure_sea_route(&mut world, id).unwrap();
        }
        assert!(world.group(id).unwrap().sea_route.is_none());
        assert!(world.routes.is_empty());
        assert_eq!(world.id_gen.peek(), next_id);
    }

    #[test]
    fn built_route_takes_the_next_id() {
        let mut world = island_world();
        let id = sailors(&mut world, WorldPosition::new(3, 4));
        for date in 1..200 {
            world.current_date = date;
            let next_id = world.id_gen.peek();
            ensure_sea_route(&mut world, id).unwrap();
            if let Some(route) = world.group(id).unwrap().sea_route {
                assert_eq!(route.raw(), next_id);
                assert_eq!(world.id_gen.peek(), next_id + 1);
                assert_eq!(world.routes[&route].id, route);
                assert!(world.routes[&route].consolidated);
                return;
            }
            assert_eq!(world.id_gen.peek(), next_id);
        }
    }

    #[test]
    fn lone_cell_never_migrates() {
        let mut world = grass_world(1, 1);
        let id = place_group(&mut world, WorldPosition::new(0, 0), 10_000);
        for date in 1..30 {
            world.current_date = date;
            consider_migration(&mut world, id).unwrap();
        }
        assert!(world.group(id).unwrap().pending_migration.is_none());
        assert!(world.queue.is_empty());
    }

    #[test]
    fn crowded_group_looks_for_room() {
        let mut world = grass_world(5, 5);
        let origin = WorldPosition::new(2, 2);
        let id = place_group(&mut world, origin, 1_000_000);
        for date in 1..60 {
            world.current_date = date;
            consider_migration(&mut world, id).unwrap();
            if world.group(id).unwrap().pending_migration.is_some() {
                break;
            }
        }
        let migration = world.group(id).unwrap().pending_migration.clone().unwrap();
        assert_ne!(migration.target, origin);
        assert!(world.cell(origin).unwrap().distance_to(migration.target).is_some());
        assert!(migration.trigger_date > world.current_date);
        assert!((0.0..MAX_MIGRATION_PERCENTAGE).contains(&migration.percentage));
        assert!(world.queue.iter().any(|e| e.kind == EventKind::MigrateGroup { group: id }));
        assert!(can_migrate(&world, id));
    }

    #[test]
    fn migrants_found_a_new_group() {
        let mut world = grass_world(3, 3);
        let content = ContentRegistry::new();
        let id = place_group(&mut world, WorldPosition::new(1, 1), 1_000);
        let target = WorldPosition::new(2, 1);
        send(&mut world, id, target, 0.2);

        let mut ctx = EventContext::new(&mut world, &content);
        migrate_group(&mut ctx, id).unwrap();

        assert_eq!(world.total_population(), 1_000);
        assert_eq!(world.group(id).unwrap().population, 800);
        let settler = world.cell(target).unwrap().group.unwrap();
        let settler = world.group(settler).unwrap();
        assert_eq!(settler.population, 200);
        assert!(settler.optimal_population > 0);
        assert_approx(
            settler.culture.knowledge_value(crate::model::culture::ids::SOCIAL_ORGANIZATION),
            world.group(id).unwrap().culture.knowledge_value(crate::model::culture::ids::SOCIAL_ORGANIZATION),
            1e-9,
            "settlers carry the source culture",
        );
    }

    #[test]
    fn migrants_merge_into_existing_group() {
        let mut world = grass_world(3, 3);
        let content = ContentRegistry::new();
        let id = place_group(&mut world, WorldPosition::new(1, 1), 1_000);
        let target = WorldPosition::new(1, 2);
        let host = place_group(&mut world, target, 500);
        send(&mut world, id, target, 0.1);

        let mut ctx = EventContext::new(&mut world, &content);
        migrate_group(&mut ctx, id).unwrap();

        assert_eq!(world.groups.len(), 2);
        assert_eq!(world.group(id).unwrap().population, 900);
        assert_eq!(world.group(host).unwrap().population, 600);
    }

    #[test]
    fn too_few_migrants_is_a_noop() {
        let mut world = grass_world(3, 3);
        let content = ContentRegistry::new();
        let id = place_group(&mut world, WorldPosition::new(1, 1), 3);
        send(&mut world, id, WorldPosition::new(2, 1), 0.1);

        let mut ctx = EventContext::new(&mut world, &content);
        migrate_group(&mut ctx, id).unwrap();
        assert_eq!(world.groups.len(), 1);
        assert_eq!(world.group(id).unwrap().population, 3);
    }
}
