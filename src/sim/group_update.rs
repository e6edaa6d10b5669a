use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::content::ContentRegistry;
use super::context::EventContext;
use super::event::{EventKind, WorldEvent};
use super::{discovery, migration, polity};
use crate::error::SimError;
use crate::id::{GroupId, PolityId};
use crate::model::culture::CultureEnvironment;
use crate::model::group::{
    PolityProminence, next_update_date, optimal_population, population_after_time,
    skill_adaptation_level,
};
use crate::model::{CellGroup, Culture, MAX_SUPPORTED_DATE, World, WorldDate};

/// Register a new group and schedule its first update.
pub fn spawn_group(
    world: &mut World,
    content: &ContentRegistry,
    mut group: CellGroup,
) -> Result<GroupId, SimError> {
    let cell = world.cell(group.position)?;
    group.culture.initialize_biome_skills(cell);
    group.last_update_date = world.current_date;
    let id = group.id;
    world.add_group(group)?;
    world.note_population_change(id);
    reschedule(world, content, id)?;
    Ok(id)
}

/// Bring a group's population and culture forward to the current date.
/// A no-op when the group is already up to date.
pub fn advance_group(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let date = world.current_date;
    let group = world.group(id)?;
    let time_span = date - group.last_update_date;
    if time_span <= 0 {
        return Ok(());
    }
    let cell = world.cell(group.position)?;

    let population = population_after_time(group.population, group.optimal_population, time_span);

    // Core cultures are cloned so the group can be mutated afterwards.
    let influences: Vec<(f64, Culture)> = group
        .prominences
        .values()
        .filter_map(|p| {
            let core = world.polities.get(&p.polity)?.core_group;
            if core == id {
                return None;
            }
            let core = world.groups.get(&core)?;
            Some((p.value, core.culture.clone()))
        })
        .collect();
    let env = CultureEnvironment {
        world_seed: world.seed,
        date,
        cell,
        population,
        polity_influences: influences.iter().map(|(v, c)| (*v, c)).collect(),
    };
    let mut culture = group.culture.clone();
    culture.update(&env, time_span);
    let lost = culture.drop_unholdable_discoveries();
    culture.initialize_biome_skills(cell);

    let polities: Vec<PolityId> = group.prominences.keys().copied().collect();
    let group = world.group_mut(id)?;
    group.population = population;
    group.culture = culture;
    group.last_update_date = date;
    for kind in lost {
        group.pending_discoveries.remove(&kind);
        debug!(%id, discovery = %kind, "discovery lost");
    }

    if population == 0 {
        world.groups_to_remove.insert(id);
    }
    world.note_population_change(id);
    world.polities_to_update.extend(polities);
    Ok(())
}

/// Full update cycle run by the group's update event.
pub fn update_group(ctx: &mut EventContext<'_>, id: GroupId) -> Result<(), SimError> {
    let world = &mut *ctx.world;
    if world.current_date - world.group(id)?.last_update_date <= 0 {
        return Ok(());
    }
    advance_group(world, id)?;
    if world.groups_to_remove.contains(&id) {
        return Ok(());
    }
    polity::expand_prominence(world, id)?;
    setup_for_next_update(world, ctx.content, id)
}

/// Recompute the carrying capacity, plan migrations and other pending
/// events, and pick the next update date.
pub fn setup_for_next_update(
    world: &mut World,
    content: &ContentRegistry,
    id: GroupId,
) -> Result<(), SimError> {
    let group = world.group(id)?;
    if group.population == 0 {
        world.groups_to_remove.insert(id);
        return Ok(());
    }
    let optimal = optimal_population(&group.culture, world.cell(group.position)?);
    world.group_mut(id)?.optimal_population = optimal;

    migration::ensure_sea_route(world, id)?;
    migration::consider_migration(world, id)?;
    discovery::assign_discovery_events(world, id)?;
    polity::assign_tribe_formation(world, id)?;
    assign_generator_events(world, content, id)?;

    let group = world.group(id)?;
    let adaptation = skill_adaptation_level(&group.culture, world.cell(group.position)?);
    let next = next_update_date(world.current_date, group.population, optimal, adaptation);
    let group = world.group_mut(id)?;
    group.next_update_date = match next {
        Some(date) => date,
        None => {
            warn!(%id, "next update date out of range; group will not update again");
            WorldDate::MAX
        }
    };
    Ok(())
}

/// Queue an update event at the group's `next_update_date`.
pub fn schedule_update(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let group = world.group(id)?;
    if group.next_update_date > MAX_SUPPORTED_DATE {
        return Ok(());
    }
    let event = WorldEvent::for_group(
        EventKind::UpdateCellGroup { group: id },
        group.position,
        world.current_date,
        group.next_update_date,
    );
    match event {
        Some(event) => world.insert_event(event),
        None => Ok(()),
    }
}

/// Re-plan a group outside its own update event. The previously queued
/// update becomes stale unless the date is unchanged.
pub fn reschedule(world: &mut World, content: &ContentRegistry, id: GroupId) -> Result<(), SimError> {
    let previous = world.group(id)?.next_update_date;
    setup_for_next_update(world, content, id)?;
    if world.groups_to_remove.contains(&id) {
        return Ok(());
    }
    let next = world.group(id)?.next_update_date;
    if next == previous && next > world.current_date {
        return Ok(());
    }
    schedule_update(world, id)
}

fn assign_generator_events(
    world: &mut World,
    content: &ContentRegistry,
    id: GroupId,
) -> Result<(), SimError> {
    for (type_id, generator) in content.iter() {
        let flag = generator.event_set_flag();
        let group = world.group(id)?;
        if group.flags.contains(&flag) || !generator.can_assign_to(group, world) {
            continue;
        }
        let Some(date) = generator.calculate_trigger_date(group, world) else {
            warn!(%id, generator = generator.id(), "generator produced no trigger date");
            continue;
        };
        let Some(event) = WorldEvent::for_group(
            EventKind::Generated {
                group: id,
                generator: generator.id().to_string(),
                type_id,
            },
            group.position,
            world.current_date,
            date,
        ) else {
            continue;
        };
        let group = world.group_mut(id)?;
        group.flags.insert(flag);
        group.generator_events.insert(generator.id().to_string(), date);
        world.insert_event(event)?;
    }
    Ok(())
}

/// Fold `population` migrants carrying `culture` and `prominences` into an
/// existing group.
pub fn merge_group(
    world: &mut World,
    content: &ContentRegistry,
    target: GroupId,
    population: u64,
    culture: &Culture,
    prominences: &[PolityProminence],
) -> Result<(), SimError> {
    advance_group(world, target)?;
    let date = world.current_date;
    let group = world.group_mut(target)?;
    let existing = group.population;
    let total = existing + population;
    if total == 0 {
        return Err(SimError::invariant(
            target,
            date,
            "merge_group",
            "merged population is zero",
        ));
    }
    let share = population as f64 / total as f64;
    group.culture.merge(culture, share);
    group.population = total;
    world.groups_to_remove.remove(&target);

    let incoming: Vec<(PolityId, f64, f64)> =
        prominences.iter().map(|p| (p.polity, p.value, p.core_distance)).collect();
    let current: Vec<(PolityId, f64, f64)> = world
        .group(target)?
        .prominences
        .values()
        .map(|p| (p.polity, p.value, p.core_distance))
        .collect();
    let polities: BTreeSet<PolityId> = incoming
        .iter()
        .chain(&current)
        .map(|(p, _, _)| *p)
        .collect();
    for polity_id in polities {
        let ours = current.iter().find(|(p, _, _)| *p == polity_id);
        let theirs = incoming.iter().find(|(p, _, _)| *p == polity_id);
        let value = ours.map_or(0.0, |o| o.1) * (1.0 - share) + theirs.map_or(0.0, |t| t.1) * share;
        let core_distance = match (ours, theirs) {
            (Some(o), Some(t)) => o.2.min(t.2),
            (Some(o), None) => o.2,
            (None, Some(t)) => t.2,
            (None, None) => continue,
        };
        polity::set_prominence(world, target, polity_id, value, core_distance)?;
    }

    world.note_population_change(target);
    reschedule(world, content, target)
}

/// Destroy every group whose population reached zero during the current
/// event. Their queued events become stale.
pub fn remove_dead_groups(world: &mut World) -> Result<(), SimError> {
    let dead = std::mem::take(&mut world.groups_to_remove);
    for id in dead {
        let Some(group) = world.groups.get(&id) else {
            continue;
        };
        if group.population > 0 {
            continue;
        }
        let polities: Vec<PolityId> = group.prominences.keys().copied().collect();
        for polity_id in polities {
            polity::remove_prominence(world, id, polity_id)?;
        }

        let Some(mut group) = world.groups.remove(&id) else {
            continue;
        };
        group.still_present = false;
        if let Some(cell) = world.terrain.cell_mut(group.position)
            && cell.group == Some(id)
        {
            cell.group = None;
        }
        if let Some(route) = group.sea_route.and_then(|r| world.routes.remove(&r)) {
            route.destroy(&mut world.terrain);
        }
        if world.most_populous_group == Some(id) {
            world.most_populous_group = world
                .groups
                .values()
                .max_by_key(|g| (g.population, std::cmp::Reverse(g.id)))
                .map(|g| g.id);
        }
        debug!(%id, position = %group.position, "group removed");
    }
    Ok(())
}
