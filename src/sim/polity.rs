use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info, warn};

use super::context::EventContext;
use super::event::{EventKind, WorldEvent};
use crate::error::SimError;
use crate::id::{ClusterId, FactionId, GroupId, PolityId, RegionId};
use crate::model::culture::ids;
use crate::model::group::{MAX_CORE_DISTANCE, PolityProminence, calculate_adaption};
use crate::model::region::try_generate_biome_region;
use crate::model::{
    DiscoveryKind, Faction, FactionKind, GENERATION_SPAN, Language, Polity, PolityKind,
    PolityProminenceCluster, Region, World, WorldDate, WorldPosition, date_after,
};
use crate::rng::{self, offsets};

// --- Constants ---

pub const MIN_POPULATION_FOR_TRIBE_CORE: u64 = 500;

/// Mean years between qualifying for and forming a tribe.
pub const TRIBE_FORMATION_MEAN_SPAN: f64 = 500.0;

pub const BASE_CORE_INFLUENCE: f64 = 0.5;

/// Bias toward spreading into neighbouring groups over reinforcing the
/// source group.
pub const TRIBAL_EXPANSION_FACTOR: f64 = 2.0;

/// Share of the source prominence carried to a neighbour in one expansion.
pub const PROMINENCE_TRANSFER: f64 = 0.25;

/// Prominence below this is dropped.
pub const MIN_PROMINENCE_VALUE: f64 = 0.01;

pub const SPLIT_DATE_SPAN_FACTOR: f64 = (GENERATION_SPAN * 2_000) as f64;

pub const MU_ADMINISTRATIVE_LOAD: f64 = 500_000.0;

/// Groups closer than this to the core never seed a split.
pub const MIN_SPLIT_CORE_DISTANCE: f64 = 1_000.0;

/// Scales `population * prominence * core distance` into administrative cost.
pub const ADMINISTRATIVE_COST_FACTOR: f64 = 1e-6;

pub const MIN_SOCIAL_ORGANIZATION: f64 = 0.01;

// ---------------------------------------------------------------------------
// Prominence and clusters
// ---------------------------------------------------------------------------

/// Groups under `polity`'s influence, gathered from its clusters.
pub fn members(world: &World, polity: PolityId) -> BTreeSet<GroupId> {
    let Some(p) = world.polities.get(&polity) else {
        return BTreeSet::new();
    };
    p.clusters
        .iter()
        .filter_map(|c| world.clusters.get(c))
        .flat_map(|c| c.prominences.iter().copied())
        .collect()
}

/// Set a group's prominence for a polity, joining a neighbour's cluster (or
/// a new one) when the group is new to the polity. Values below
/// `MIN_PROMINENCE_VALUE` remove the prominence instead.
pub fn set_prominence(
    world: &mut World,
    group: GroupId,
    polity: PolityId,
    value: f64,
    core_distance: f64,
) -> Result<(), SimError> {
    if !world.polities.contains_key(&polity) {
        return Err(SimError::MissingPolity(polity));
    }
    if value < MIN_PROMINENCE_VALUE {
        return remove_prominence(world, group, polity);
    }
    let value = value.min(1.0);
    world.polities_to_update.insert(polity);

    if let Some(p) = world.group_mut(group)?.prominences.get_mut(&polity) {
        p.value = value;
        p.core_distance = core_distance;
        return Ok(());
    }

    let neighbor_cluster = world.neighbor_groups(group).into_iter().find_map(|(n, _)| {
        world
            .groups
            .get(&n)?
            .prominences
            .get(&polity)?
            .cluster
            .filter(|c| world.clusters.contains_key(c))
    });
    let cluster = match neighbor_cluster {
        Some(c) => c,
        None => {
            let c = world.new_cluster_id();
            world.clusters.insert(c, PolityProminenceCluster::new(c, polity));
            world.polity_mut(polity)?.clusters.insert(c);
            c
        }
    };
    world
        .clusters
        .get_mut(&cluster)
        .ok_or(SimError::MissingCluster(cluster))?
        .add_prominence(group);
    world.group_mut(group)?.prominences.insert(
        polity,
        PolityProminence {
            polity,
            value,
            core_distance,
            cluster: Some(cluster),
        },
    );
    split_cluster_if_needed(world, cluster, group)
}

pub fn remove_prominence(world: &mut World, group: GroupId, polity: PolityId) -> Result<(), SimError> {
    let Some(removed) = world
        .groups
        .get_mut(&group)
        .and_then(|g| g.prominences.remove(&polity))
    else {
        return Ok(());
    };
    world.polities_to_update.insert(polity);
    let Some(cluster_id) = removed.cluster else {
        return Ok(());
    };
    let Some(cluster) = world.clusters.get_mut(&cluster_id) else {
        return Ok(());
    };
    cluster.remove_prominence(group);
    if cluster.size() == 0 {
        world.clusters.remove(&cluster_id);
        if let Some(p) = world.polities.get_mut(&polity) {
            p.clusters.remove(&cluster_id);
        }
    }
    Ok(())
}

fn split_cluster_if_needed(
    world: &mut World,
    cluster_id: ClusterId,
    start: GroupId,
) -> Result<(), SimError> {
    if !world.clusters.get(&cluster_id).is_some_and(|c| c.needs_split()) {
        return Ok(());
    }
    let new_id = world.new_cluster_id();
    let mut cluster = world
        .clusters
        .remove(&cluster_id)
        .ok_or(SimError::MissingCluster(cluster_id))?;
    let child = {
        let world = &*world;
        cluster.split(start, new_id, |g| {
            world.neighbor_groups(g).into_iter().map(|(n, _)| n).collect()
        })
    };
    let polity = cluster.polity;
    for group in &child.prominences {
        if let Some(p) = world
            .groups
            .get_mut(group)
            .and_then(|g| g.prominences.get_mut(&polity))
        {
            p.cluster = Some(new_id);
        }
    }
    debug!(
        %polity,
        parent = %cluster_id,
        child = %new_id,
        parent_size = cluster.size(),
        child_size = child.size(),
        "prominence cluster split"
    );
    world.clusters.insert(cluster_id, cluster);
    world.clusters.insert(new_id, child);
    world.polity_mut(polity)?.clusters.insert(new_id);
    Ok(())
}

/// Weight of spreading prominence from `source` into `target`.
fn expansion_value(world: &World, source: GroupId, target: GroupId) -> f64 {
    let (Some(s), Some(t)) = (world.groups.get(&source), world.groups.get(&target)) else {
        return 0.0;
    };
    let source_total = s.total_prominence();
    if source_total <= 0.0 {
        return 0.0;
    }
    let Some(cell) = world.terrain.cell(t.position) else {
        return 0.0;
    };
    let influence_factor = (source_total / (t.total_prominence() + source_total)).powi(4);
    let (_, survivability) = calculate_adaption(&s.culture, cell);
    let mut value = influence_factor * survivability.powi(2);
    if source != target {
        value *= TRIBAL_EXPANSION_FACTOR;
    }
    value
}

/// Spread each polity's prominence from a freshly updated group to at most
/// one neighbouring group. The per-group total never exceeds 1.
pub fn expand_prominence(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let group = world.group(id)?;
    if group.prominences.is_empty() {
        return Ok(());
    }
    let cell = world.cell(group.position)?;
    let mut targets = vec![(id, 0.0)];
    targets.extend(world.neighbor_groups(id));
    let weights: Vec<f64> = targets
        .iter()
        .map(|(t, _)| expansion_value(world, id, *t))
        .collect();

    let mut transfers = Vec::new();
    for (i, p) in group.prominences.values().enumerate() {
        let score = cell.random_float(
            world.seed,
            world.current_date,
            offsets::PROMINENCE_EXPANSION + i as u32,
        );
        let Some(k) = rng::weighted_selection(score, &weights) else {
            continue;
        };
        let (target, distance) = targets[k];
        if target != id {
            transfers.push((target, p.polity, p.value * PROMINENCE_TRANSFER, p.core_distance + distance));
        }
    }

    for (target, polity, amount, core_distance) in transfers {
        let group = world.group(target)?;
        let current = group.prominence_value(polity);
        let others = group.total_prominence() - current;
        let value = (current + amount).min(1.0 - others);
        if value <= current {
            continue;
        }
        let core_distance = group
            .prominences
            .get(&polity)
            .map_or(core_distance, |p| p.core_distance.min(core_distance));
        set_prominence(world, target, polity, value, core_distance)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tribe formation
// ---------------------------------------------------------------------------

pub fn can_form_tribe(world: &World, id: GroupId) -> bool {
    world.groups.get(&id).is_some_and(|g| {
        g.still_present
            && g.culture.has_discovery(DiscoveryKind::Tribalism)
            && g.population >= MIN_POPULATION_FOR_TRIBE_CORE
            && g.prominences.is_empty()
    })
}

/// Schedule a tribe formation event if the group qualifies and has none.
pub fn assign_tribe_formation(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let group = world.group(id)?;
    if group.tribe_formation_date.is_some() || !can_form_tribe(world, id) {
        return Ok(());
    }
    let current = world.current_date;
    let r = world
        .cell(group.position)?
        .random_float(world.seed, current, offsets::TRIBE_FORMATION_DATE);
    let Some(date) = date_after(current, TRIBE_FORMATION_MEAN_SPAN * (0.5 + r)) else {
        return Ok(());
    };
    let Some(event) = WorldEvent::for_group(
        EventKind::TribeFormation { group: id },
        group.position,
        current,
        date,
    ) else {
        return Ok(());
    };
    world.group_mut(id)?.tribe_formation_date = Some(date);
    world.insert_event(event)
}

/// Found a tribe centred on `id`.
pub fn form_tribe(ctx: &mut EventContext<'_>, id: GroupId) -> Result<PolityId, SimError> {
    let world = &mut *ctx.world;
    let date = world.current_date;
    let position = world.group(id)?.position;
    let cell = world.cell(position)?;
    let core_influence =
        BASE_CORE_INFLUENCE + cell.random_float(world.seed, date, offsets::TRIBE_CORE_INFLUENCE) * (1.0 - BASE_CORE_INFLUENCE);
    let language_seed = rng::stream_seed(world.seed, cell.rng_key(), date, offsets::LANGUAGE_SEED);

    let language_id = world.new_language_id();
    let language = Language::new(language_id, language_seed);
    let polity_id = world.new_polity_id();
    let name = format!("{} Tribe", language.word(polity_id.raw()));

    let mut polity = Polity::new(polity_id, PolityKind::Tribe, name.clone(), id, language_id, date);
    polity.core_region = ensure_region(world, position, &language)?;
    world.languages.insert(language_id, language);
    world.polities.insert(polity_id, polity);

    let group = world.group_mut(id)?;
    group.culture.language.get_or_insert(language_id);
    let clan = add_clan(world, polity_id, id)?;
    world.polity_mut(polity_id)?.dominant_faction = Some(clan);
    set_prominence(world, id, polity_id, core_influence, 0.0)?;
    schedule_split(world, polity_id)?;

    info!(polity = %polity_id, %name, core = %id, %position, date, "tribe formed");
    Ok(polity_id)
}

fn add_clan(world: &mut World, polity: PolityId, core_group: GroupId) -> Result<FactionId, SimError> {
    let id = world.new_faction_id();
    let language = world.polity(polity)?.language;
    let name = match world.languages.get(&language) {
        Some(l) => format!("Clan {}", l.word(id.raw())),
        None => format!("Clan {}", id.raw()),
    };
    world.factions.insert(
        id,
        Faction {
            id,
            kind: FactionKind::Clan,
            name,
            polity,
            core_group,
            influence: 1.0,
            still_present: true,
        },
    );
    world.polity_mut(polity)?.factions.insert(id);
    Ok(id)
}

/// The region owning `pos`, growing a new biome region around it if the
/// cell is unclaimed.
fn ensure_region(
    world: &mut World,
    pos: WorldPosition,
    language: &Language,
) -> Result<Option<RegionId>, SimError> {
    let cell = world.cell(pos)?;
    if let Some(region) = cell.region {
        return Ok(Some(region));
    }
    let Some(biome) = cell.most_present_biome() else {
        return Ok(None);
    };
    let cells = try_generate_biome_region(&world.terrain, pos, biome);
    if cells.is_empty() {
        return Ok(None);
    }

    let id = world.new_region_id();
    let name = format!("{} {}", language.word(id.raw()), biome.region_noun());
    let mut region = Region::new(id, biome, name, Some(language.id));
    for p in &cells {
        world.terrain.cell_mut(*p).ok_or(SimError::MissingCell(*p))?.region = Some(id);
    }
    region.cells = cells;
    region.evaluate_attributes(&world.terrain);
    debug!(region = %id, cells = region.cells.len(), biome = %biome, "region generated");
    world.regions.insert(id, region);
    Ok(Some(id))
}

// ---------------------------------------------------------------------------
// Tribe split
// ---------------------------------------------------------------------------

/// Next split date for a polity, or `None` if it cannot be scheduled.
pub fn next_split_date(world: &World, polity: PolityId) -> Result<Option<WorldDate>, SimError> {
    let p = world.polity(polity)?;
    let r = p.random_float(world.seed, world.current_date, offsets::TRIBE_SPLIT_DATE);
    let span = (1.0 - r * r) * SPLIT_DATE_SPAN_FACTOR;
    Ok(date_after(world.current_date, span).filter(|d| *d > world.current_date))
}

fn schedule_split(world: &mut World, polity: PolityId) -> Result<(), SimError> {
    let Some(date) = next_split_date(world, polity)? else {
        warn!(%polity, "no split date could be scheduled");
        return Ok(());
    };
    let Some(event) = WorldEvent::for_polity(
        EventKind::TribeSplit { polity },
        polity,
        world.current_date,
        date,
    ) else {
        return Ok(());
    };
    world.polity_mut(polity)?.split_event_date = Some(date);
    world.insert_event(event)
}

/// Administrative load over social organization, squared.
fn administrative_load_factor(world: &World, polity: &Polity) -> f64 {
    let social_organization = world
        .groups
        .get(&polity.core_group)
        .map_or(0.0, |g| g.culture.knowledge_value(ids::SOCIAL_ORGANIZATION))
        .max(MIN_SOCIAL_ORGANIZATION);
    (polity.administrative_cost / social_organization).powi(2)
}

/// Weighted pick of a group far enough from the core to lead a new tribe.
fn choose_split_core(world: &World, polity: &Polity) -> Option<GroupId> {
    let candidates: Vec<GroupId> = members(world, polity.id).into_iter().collect();
    let weights: Vec<f64> = candidates
        .iter()
        .map(|g| {
            let Some(group) = world.groups.get(g) else {
                return 0.0;
            };
            if *g == polity.core_group
                || group.highest_prominence().map(|p| p.polity) != Some(polity.id)
            {
                return 0.0;
            }
            let p = &group.prominences[&polity.id];
            p.value * (p.core_distance - MIN_SPLIT_CORE_DISTANCE).max(0.0)
        })
        .collect();
    let score = polity.random_float(world.seed, world.current_date, offsets::TRIBE_SPLIT_CORE);
    rng::weighted_selection(score, &weights).map(|i| candidates[i])
}

pub fn can_split_tribe(world: &World, polity: PolityId) -> bool {
    let Some(p) = world.polities.get(&polity).filter(|p| p.still_present) else {
        return false;
    };
    let load = administrative_load_factor(world, p);
    let split_value = load / (load + MU_ADMINISTRATIVE_LOAD);
    let trigger = p.random_float(world.seed, world.current_date, offsets::TRIBE_SPLIT_CHANCE);
    if trigger > split_value {
        return false;
    }
    choose_split_core(world, p).is_some()
}

/// Carve a new tribe out of `polity` around a distant group.
pub fn split_tribe(ctx: &mut EventContext<'_>, polity: PolityId) -> Result<(), SimError> {
    let world = &mut *ctx.world;
    let source = world.polity(polity)?;
    let Some(new_core) = choose_split_core(world, source) else {
        return Ok(());
    };
    let language = source.language;
    let date = world.current_date;

    let new_id = world.new_polity_id();
    let name = match world.languages.get(&language) {
        Some(l) => format!("{} Tribe", l.word(new_id.raw())),
        None => format!("Tribe {}", new_id.raw()),
    };
    let mut tribe = Polity::new(new_id, PolityKind::Tribe, name.clone(), new_core, language, date);
    tribe.parent = Some(polity);
    tribe.core_region = world.cell(world.group(new_core)?.position)?.region;
    world.polities.insert(new_id, tribe);

    let switched = switch_cell_influences(world, polity, new_id, new_core)?;
    transfer_factions(world, polity, new_id, new_core, &switched)?;
    schedule_split(world, new_id)?;
    world.polities_to_update.insert(polity);
    world.polities_to_update.insert(new_id);

    info!(parent = %polity, polity = %new_id, %name, core = %new_core, groups = switched.len(), date, "tribe split");
    Ok(())
}

/// Breadth-first from the new core, hand over every group that is no
/// farther from the new core than from the old one. Returns the groups that
/// switched.
fn switch_cell_influences(
    world: &mut World,
    source: PolityId,
    target: PolityId,
    new_core: GroupId,
) -> Result<BTreeSet<GroupId>, SimError> {
    let mut distances: BTreeMap<GroupId, f64> = BTreeMap::new();
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([new_core]);

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let Some(pi) = world
            .groups
            .get(&id)
            .and_then(|g| g.prominences.get(&source))
            .cloned()
        else {
            continue;
        };
        let neighbors = world.neighbor_groups(id);
        let target_distance = if id == new_core {
            0.0
        } else {
            neighbors
                .iter()
                .filter_map(|(n, d)| distances.get(n).map(|nd| nd + d))
                .fold(MAX_CORE_DISTANCE, f64::min)
        };
        if target_distance >= MAX_CORE_DISTANCE
            || (pi.core_distance < MAX_CORE_DISTANCE && target_distance > pi.core_distance)
        {
            continue;
        }

        remove_prominence(world, id, source)?;
        set_prominence(world, id, target, pi.value, target_distance)?;
        distances.insert(id, target_distance);

        for (n, _) in neighbors {
            if !visited.contains(&n) {
                queue.push_back(n);
            }
        }
    }
    let switched = distances.into_keys().collect();
    Ok(switched)
}

fn transfer_factions(
    world: &mut World,
    source: PolityId,
    target: PolityId,
    new_core: GroupId,
    switched: &BTreeSet<GroupId>,
) -> Result<(), SimError> {
    let moving: Vec<FactionId> = world
        .polity(source)?
        .factions
        .iter()
        .copied()
        .filter(|f| {
            world
                .factions
                .get(f)
                .is_some_and(|f| switched.contains(&f.core_group))
        })
        .collect();
    for f in &moving {
        if let Some(faction) = world.factions.get_mut(f) {
            faction.polity = target;
        }
        world.polity_mut(source)?.factions.remove(f);
        world.polity_mut(target)?.factions.insert(*f);
    }

    let dominant = match moving
        .iter()
        .filter_map(|f| world.factions.get(f))
        .max_by(|a, b| a.influence.total_cmp(&b.influence).then(b.id.cmp(&a.id)))
    {
        Some(f) => f.id,
        None => add_clan(world, target, new_core)?,
    };
    world.polity_mut(target)?.dominant_faction = Some(dominant);

    let source_polity = world.polity(source)?;
    if source_polity
        .dominant_faction
        .is_some_and(|d| !source_polity.factions.contains(&d))
    {
        let replacement = source_polity.factions.iter().next().copied();
        world.polity_mut(source)?.dominant_faction = replacement;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Recompute aggregates of every polity touched by the last event. Polities
/// left without influence are destroyed; polities that lost their core
/// group pick the member with the highest prominence.
pub fn refresh_polities(world: &mut World) -> Result<(), SimError> {
    let pending = std::mem::take(&mut world.polities_to_update);
    for id in pending {
        if !world.polities.contains_key(&id) {
            continue;
        }
        let members = members(world, id);
        if members.is_empty() {
            destroy_polity(world, id);
            continue;
        }

        let mut total_population = 0.0;
        let mut administrative_cost = 0.0;
        let mut best: Option<(f64, GroupId)> = None;
        for g in &members {
            let Some(group) = world.groups.get(g) else { continue };
            let Some(p) = group.prominences.get(&id) else { continue };
            let weighted = group.population as f64 * p.value;
            total_population += weighted;
            administrative_cost += weighted * p.core_distance * ADMINISTRATIVE_COST_FACTOR;
            if best.is_none_or(|(v, _)| p.value > v) {
                best = Some((p.value, *g));
            }
        }

        let polity = world.polity_mut(id)?;
        polity.total_population = total_population;
        polity.administrative_cost = administrative_cost;
        polity.prominence_area = members.len();
        if !members.contains(&polity.core_group)
            && let Some((_, core)) = best
        {
            debug!(polity = %id, old = %polity.core_group, new = %core, "polity core moved");
            polity.core_group = core;
            let factions: Vec<FactionId> = polity.factions.iter().copied().collect();
            for f in factions {
                if let Some(faction) = world.factions.get_mut(&f)
                    && !members.contains(&faction.core_group)
                {
                    faction.core_group = core;
                }
            }
        }
    }
    Ok(())
}

fn destroy_polity(world: &mut World, id: PolityId) {
    let Some(polity) = world.polities.remove(&id) else {
        return;
    };
    for c in &polity.clusters {
        world.clusters.remove(c);
    }
    for f in &polity.factions {
        world.factions.remove(f);
    }
    info!(polity = %id, name = %polity.name, "polity disappeared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellGroup;
    use crate::sim::ContentRegistry;
    use crate::testutil::{grass_world, place_group, striped_world};

    fn tribal_group(world: &mut World, pos: WorldPosition, population: u64) -> GroupId {
        let id = place_group(world, pos, population);
        world.group_mut(id).unwrap().culture.gain_discovery(DiscoveryKind::Tribalism);
        id
    }

    fn found_tribe(world: &mut World, core: GroupId) -> PolityId {
        let content = ContentRegistry::new();
        let mut ctx = EventContext::new(world, &content);
        form_tribe(&mut ctx, core).unwrap()
    }

    #[test]
    fn tribe_formation_requires_tribalism_and_population() {
        let mut world = grass_world(4, 4);
        let small = tribal_group(&mut world, WorldPosition::new(0, 0), 100);
        let plain = place_group(&mut world, WorldPosition::new(2, 2), 1_000);
        let ready = tribal_group(&mut world, WorldPosition::new(1, 1), 1_000);
        assert!(!can_form_tribe(&world, small));
        assert!(!can_form_tribe(&world, plain));
        assert!(can_form_tribe(&world, ready));

        assign_tribe_formation(&mut world, ready).unwrap();
        let date = world.group(ready).unwrap().tribe_formation_date.unwrap();
        assert!((250..=750).contains(&date));
    }

    #[test]
    fn forming_a_tribe_sets_up_polity_state() {
        let mut world = grass_world(6, 4);
        let core = tribal_group(&mut world, WorldPosition::new(2, 2), 1_000);
        let polity = found_tribe(&mut world, core);

        let tribe = world.polity(polity).unwrap();
        assert_eq!(tribe.core_group, core);
        assert!(tribe.name.ends_with(" Tribe"));
        assert_eq!(tribe.factions.len(), 1);
        assert_eq!(tribe.clusters.len(), 1);
        assert!(tribe.split_event_date.is_some());
        assert!(tribe.core_region.is_some());

        let value = world.group(core).unwrap().prominence_value(polity);
        assert!((BASE_CORE_INFLUENCE..=1.0).contains(&value));
        assert!(!can_form_tribe(&world, core));

        // The whole grass world is one region.
        let region = &world.regions[&tribe.core_region.unwrap()];
        assert_eq!(region.cells.len(), 24);
    }

    #[test]
    fn tribes_in_different_biomes_get_disjoint_regions() {
        let mut world = striped_world(8, 4, 4);
        let grass_core = tribal_group(&mut world, WorldPosition::new(1, 1), 1_000);
        let forest_core = tribal_group(&mut world, WorldPosition::new(5, 2), 1_000);
        let second_grass = tribal_group(&mut world, WorldPosition::new(2, 3), 1_000);
        let a = found_tribe(&mut world, grass_core);
        let b = found_tribe(&mut world, forest_core);
        let c = found_tribe(&mut world, second_grass);

        let region_a = world.polity(a).unwrap().core_region.unwrap();
        let region_b = world.polity(b).unwrap().core_region.unwrap();
        assert_ne!(region_a, region_b);
        assert_eq!(world.polity(c).unwrap().core_region, Some(region_a));
        assert_eq!(world.regions.len(), 2);

        let mut owner = BTreeMap::new();
        for region in world.regions.values() {
            assert!(!region.cells.is_empty());
            for pos in &region.cells {
                assert!(owner.insert(*pos, region.id).is_none(), "{pos} in two regions");
                assert_eq!(world.cell(*pos).unwrap().region, Some(region.id));
            }
            let histogram: f64 = region.attributes.biome_presences.values().sum();
            assert!(histogram <= 1.0 + 1e-9, "{}: {histogram}", region.id);
        }
        for cell in world.terrain.cells() {
            assert_eq!(cell.region, owner.get(&cell.position).copied());
        }
        assert!(world.regions[&region_a].cells.iter().all(|p| p.longitude < 4));
        assert!(world.regions[&region_b].cells.iter().all(|p| p.longitude >= 4));
    }

    #[test]
    fn prominence_spreads_without_exceeding_one() {
        let mut world = grass_world(5, 5);
        let core = tribal_group(&mut world, WorldPosition::new(2, 2), 1_000);
        for (lon, lat) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            place_group(&mut world, WorldPosition::new(lon, lat), 1_000);
        }
        let polity = found_tribe(&mut world, core);
        for date in 1..40 {
            world.current_date = date * 20;
            expand_prominence(&mut world, core).unwrap();
        }
        let influenced: Vec<&CellGroup> =
            world.groups.values().filter(|g| g.prominence_value(polity) > 0.0).collect();
        assert!(influenced.len() > 1);
        for g in world.groups.values() {
            assert!(g.total_prominence() <= 1.0 + 1e-9);
        }
        let in_clusters = members(&world, polity);
        assert_eq!(in_clusters.len(), influenced.len());
    }

    #[test]
    fn removing_last_prominence_destroys_polity() {
        let mut world = grass_world(4, 4);
        let core = tribal_group(&mut world, WorldPosition::new(1, 1), 1_000);
        let polity = found_tribe(&mut world, core);
        refresh_polities(&mut world).unwrap();
        assert!(world.polities.contains_key(&polity));

        remove_prominence(&mut world, core, polity).unwrap();
        refresh_polities(&mut world).unwrap();
        assert!(!world.polities.contains_key(&polity));
        assert!(world.clusters.is_empty());
        assert!(world.factions.is_empty());
    }

    #[test]
    fn large_clusters_split_and_partition_members() {
        let mut world = grass_world(12, 8);
        let mut ids = Vec::new();
        for lat in 0..8 {
            for lon in 0..12 {
                ids.push(place_group(&mut world, WorldPosition::new(lon, lat), 1_000));
            }
        }
        let core = ids[0];
        world.group_mut(core).unwrap().culture.gain_discovery(DiscoveryKind::Tribalism);
        let polity = found_tribe(&mut world, core);
        for id in &ids[1..] {
            set_prominence(&mut world, *id, polity, 0.5, 100.0).unwrap();
        }

        let clusters = &world.polity(polity).unwrap().clusters;
        assert!(clusters.len() > 1);
        let mut seen = BTreeSet::new();
        for c in clusters {
            let cluster = &world.clusters[c];
            assert!(cluster.size() <= crate::model::cluster::MAX_CLUSTER_SIZE);
            for g in &cluster.prominences {
                assert!(seen.insert(*g), "{g} in two clusters");
                assert_eq!(world.groups[g].prominences[&polity].cluster, Some(*c));
            }
        }
        assert_eq!(seen.len(), ids.len());
    }

    #[test]
    fn split_hands_distant_groups_to_new_tribe() {
        let mut world = grass_world(12, 3);
        let mut ids = Vec::new();
        for lon in 0..12 {
            ids.push(tribal_group(&mut world, WorldPosition::new(lon, 1), 1_000));
        }
        let core = ids[0];
        let polity = found_tribe(&mut world, core);
        // Distance grows eastward, then wraps back toward the core.
        for (i, id) in ids.iter().enumerate().skip(1) {
            let hops = i.min(12 - i) as f64;
            set_prominence(&mut world, *id, polity, 0.6, hops * 2_000.0).unwrap();
        }
        refresh_polities(&mut world).unwrap();

        let content = ContentRegistry::new();
        let mut ctx = EventContext::new(&mut world, &content);
        split_tribe(&mut ctx, polity).unwrap();
        refresh_polities(&mut world).unwrap();

        let children: Vec<&Polity> =
            world.polities.values().filter(|p| p.parent == Some(polity)).collect();
        assert_eq!(children.len(), 1);
        let child = children[0];
        assert_ne!(child.core_group, core);
        assert_eq!(child.factions.len(), 1);
        assert!(world.group(core).unwrap().prominence_value(polity) > 0.0);
        for g in world.groups.values() {
            let both = g.prominences.contains_key(&polity) && g.prominences.contains_key(&child.id);
            assert!(!both, "{} influenced by both tribes", g.id);
        }
    }

    #[test]
    fn split_date_is_in_range() {
        let mut world = grass_world(4, 4);
        let core = tribal_group(&mut world, WorldPosition::new(1, 1), 1_000);
        let polity = found_tribe(&mut world, core);
        world.current_date = 1_000;
        let date = next_split_date(&world, polity).unwrap().unwrap();
        assert!(date > 1_000 && date <= 1_000 + SPLIT_DATE_SPAN_FACTOR as WorldDate);
    }
}
