use tracing::debug;

use crate::error::SimError;
use crate::id::GroupId;
use crate::model::{MAX_SUPPORTED_DATE, World, WorldDate, WorldPhase, WorldPosition};
use crate::sim::{ContentRegistry, EventKind, WorldEvent};

/// Second load pass: rebuild every cross reference the snapshot files do
/// not carry, check the ones they do, and queue the pending events again.
///
/// Any dangling reference is fatal. On success the world is in the running
/// phase.
pub fn resolve(world: &mut World, content: &ContentRegistry) -> Result<(), SimError> {
    world.phase = WorldPhase::Loading;
    world.queue.clear();
    world.groups_to_remove.clear();
    world.polities_to_update.clear();

    link_groups(world)?;
    link_regions(world)?;
    link_routes(world)?;
    check_polities(world)?;
    check_clusters(world)?;
    requeue_events(world, content)?;

    world.phase = WorldPhase::Running;
    Ok(())
}

fn dangling(entity: impl ToString, date: WorldDate, detail: String) -> SimError {
    SimError::invariant(entity, date, "resolve", detail)
}

fn link_groups(world: &mut World) -> Result<(), SimError> {
    let placements: Vec<(GroupId, WorldPosition)> =
        world.groups.values().map(|g| (g.id, g.position)).collect();
    for (id, pos) in placements {
        let cell = world.terrain.cell_mut(pos).ok_or(SimError::MissingCell(pos))?;
        if let Some(other) = cell.group {
            return Err(dangling(id, world.current_date, format!("cell {pos} already holds {other}")));
        }
        cell.group = Some(id);
    }
    Ok(())
}

fn link_regions(world: &mut World) -> Result<(), SimError> {
    let date = world.current_date;
    for region in world.regions.values_mut() {
        if let Some(language) = region.language
            && !world.languages.contains_key(&language)
        {
            return Err(dangling(region.id, date, format!("language {language} not found")));
        }
        for pos in &region.cells {
            let cell = world.terrain.cell_mut(*pos).ok_or(SimError::MissingCell(*pos))?;
            if let Some(other) = cell.region {
                return Err(dangling(region.id, date, format!("cell {pos} already in region {other}")));
            }
            cell.region = Some(region.id);
        }
        region.evaluate_attributes(&world.terrain);
    }
    Ok(())
}

fn link_routes(world: &mut World) -> Result<(), SimError> {
    for route in world.routes.values() {
        route.finalize_load(&mut world.terrain)?;
    }
    for group in world.groups.values() {
        if let Some(route) = group.sea_route
            && !world.routes.contains_key(&route)
        {
            return Err(dangling(group.id, world.current_date, format!("route {route} not found")));
        }
    }
    Ok(())
}

fn check_polities(world: &World) -> Result<(), SimError> {
    let date = world.current_date;
    for polity in world.polities.values() {
        world.group(polity.core_group)?;
        if !world.languages.contains_key(&polity.language) {
            return Err(dangling(polity.id, date, format!("language {} not found", polity.language)));
        }
        if let Some(parent) = polity.parent
            && !world.polities.contains_key(&parent)
        {
            debug!(polity = %polity.id, %parent, "parent polity no longer exists");
        }
        if let Some(region) = polity.core_region
            && !world.regions.contains_key(&region)
        {
            return Err(dangling(polity.id, date, format!("region {region} not found")));
        }
        for f in &polity.factions {
            let faction = world
                .factions
                .get(f)
                .ok_or_else(|| dangling(polity.id, date, format!("faction {f} not found")))?;
            if faction.polity != polity.id {
                return Err(dangling(*f, date, format!("faction lists polity {}", faction.polity)));
            }
        }
        if let Some(d) = polity.dominant_faction
            && !polity.factions.contains(&d)
        {
            return Err(dangling(polity.id, date, format!("dominant faction {d} not a member")));
        }
    }
    for faction in world.factions.values() {
        world.polity(faction.polity)?;
        world.group(faction.core_group)?;
    }
    Ok(())
}

/// Every cluster member carries a prominence pointing back at the cluster,
/// and every prominence sits in exactly the cluster it names.
fn check_clusters(world: &World) -> Result<(), SimError> {
    let date = world.current_date;
    for cluster in world.clusters.values() {
        let polity = world.polity(cluster.polity)?;
        if !polity.clusters.contains(&cluster.id) {
            return Err(dangling(cluster.id, date, format!("not listed by polity {}", polity.id)));
        }
        for g in &cluster.prominences {
            let p = world.group(*g)?.prominences.get(&cluster.polity);
            if p.and_then(|p| p.cluster) != Some(cluster.id) {
                return Err(dangling(cluster.id, date, format!("member {g} does not point back")));
            }
        }
    }
    for group in world.groups.values() {
        for p in group.prominences.values() {
            world.polity(p.polity)?;
            let cluster = p.cluster.ok_or_else(|| {
                dangling(group.id, date, format!("prominence of {} has no cluster", p.polity))
            })?;
            let members = world.clusters.get(&cluster).ok_or(SimError::MissingCluster(cluster))?;
            if !members.contains(group.id) {
                return Err(dangling(group.id, date, format!("missing from cluster {cluster}")));
            }
        }
    }
    Ok(())
}

/// Rebuild the queue from the pending dates stored on groups and polities.
fn requeue_events(world: &mut World, content: &ContentRegistry) -> Result<(), SimError> {
    let current = world.current_date;
    let mut events = Vec::new();

    for group in world.groups.values() {
        let id = group.id;
        let pos = group.position;
        if group.next_update_date <= MAX_SUPPORTED_DATE {
            events.push(rebuild(
                WorldEvent::for_group(EventKind::UpdateCellGroup { group: id }, pos, current, group.next_update_date),
                id,
                current,
            )?);
        }
        if let Some(m) = &group.pending_migration {
            events.push(rebuild(
                WorldEvent::for_group(EventKind::MigrateGroup { group: id }, pos, current, m.trigger_date),
                id,
                current,
            )?);
        }
        for (&discovery, &date) in &group.pending_discoveries {
            events.push(rebuild(
                WorldEvent::for_group(EventKind::Discovery { group: id, discovery }, pos, current, date),
                id,
                current,
            )?);
        }
        if let Some(date) = group.tribe_formation_date {
            events.push(rebuild(
                WorldEvent::for_group(EventKind::TribeFormation { group: id }, pos, current, date),
                id,
                current,
            )?);
        }
        for (generator, &date) in &group.generator_events {
            let type_id = content
                .type_id_of(generator)
                .ok_or_else(|| SimError::MissingGenerator(generator.clone()))?;
            let kind = EventKind::Generated {
                group: id,
                generator: generator.clone(),
                type_id,
            };
            events.push(rebuild(WorldEvent::for_group(kind, pos, current, date), id, current)?);
        }
    }
    for polity in world.polities.values() {
        if let Some(date) = polity.split_event_date {
            let kind = EventKind::TribeSplit { polity: polity.id };
            events.push(rebuild(
                WorldEvent::for_polity(kind, polity.id, current, date),
                polity.id,
                current,
            )?);
        }
    }

    let count = events.len();
    for event in events {
        event.finalize_load(world, content)?;
        world.insert_event(event)?;
    }
    debug!(events = count, "events rebuilt from snapshot");
    Ok(())
}

/// A stored pending date that no longer yields an event is corrupt.
fn rebuild(
    event: Option<WorldEvent>,
    owner: impl ToString,
    current: WorldDate,
) -> Result<WorldEvent, SimError> {
    event.ok_or_else(|| dangling(owner, current, "pending event date is not after the snapshot date".into()))
}
