use std::collections::{BTreeMap, BTreeSet};

use super::cluster::PolityProminenceCluster;
use super::date::WorldDate;
use super::group::CellGroup;
use super::language::Language;
use super::polity::{Faction, Polity};
use super::position::WorldPosition;
use super::region::Region;
use super::route::Route;
use super::terrain::{Terrain, TerrainCell};
use crate::error::SimError;
use crate::id::{
    ClusterId, FactionId, GroupId, IdGenerator, LanguageId, PolityId, RegionId, RouteId,
};
use crate::sim::{EventQueue, WorldEvent};
use crate::worldgen::WorldGenConfig;

/// Which phase the world is in. Events may only be scheduled at or before
/// the current date while initializing or resolving a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldPhase {
    Initializing,
    Loading,
    Running,
}

/// Arena of every simulated entity plus the event queue.
///
/// Cross references are ids into these maps; nothing holds a pointer to
/// another entity.
#[derive(Debug)]
pub struct World {
    pub seed: u64,
    pub config: WorldGenConfig,
    pub terrain: Terrain,
    pub current_date: WorldDate,
    pub phase: WorldPhase,

    pub groups: BTreeMap<GroupId, CellGroup>,
    pub polities: BTreeMap<PolityId, Polity>,
    pub factions: BTreeMap<FactionId, Faction>,
    pub clusters: BTreeMap<ClusterId, PolityProminenceCluster>,
    pub regions: BTreeMap<RegionId, Region>,
    pub routes: BTreeMap<RouteId, Route>,
    pub languages: BTreeMap<LanguageId, Language>,

    pub queue: EventQueue,
    pub id_gen: IdGenerator,
    pub most_populous_group: Option<GroupId>,

    /// Groups whose population hit zero during the current event.
    pub groups_to_remove: BTreeSet<GroupId>,
    /// Polities whose aggregates must be refreshed after the current event.
    pub polities_to_update: BTreeSet<PolityId>,
}

impl World {
    pub fn new(config: WorldGenConfig, terrain: Terrain) -> Self {
        Self {
            seed: config.seed,
            config,
            terrain,
            current_date: 0,
            phase: WorldPhase::Initializing,
            groups: BTreeMap::new(),
            polities: BTreeMap::new(),
            factions: BTreeMap::new(),
            clusters: BTreeMap::new(),
            regions: BTreeMap::new(),
            routes: BTreeMap::new(),
            languages: BTreeMap::new(),
            queue: EventQueue::new(),
            id_gen: IdGenerator::new(),
            most_populous_group: None,
            groups_to_remove: BTreeSet::new(),
            polities_to_update: BTreeSet::new(),
        }
    }

    pub fn cell(&self, pos: WorldPosition) -> Result<&TerrainCell, SimError> {
        self.terrain.cell(pos).ok_or(SimError::MissingCell(pos))
    }

    pub fn group(&self, id: GroupId) -> Result<&CellGroup, SimError> {
        self.groups.get(&id).ok_or(SimError::MissingGroup(id))
    }

    pub fn group_mut(&mut self, id: GroupId) -> Result<&mut CellGroup, SimError> {
        self.groups.get_mut(&id).ok_or(SimError::MissingGroup(id))
    }

    pub fn polity(&self, id: PolityId) -> Result<&Polity, SimError> {
        self.polities.get(&id).ok_or(SimError::MissingPolity(id))
    }

    pub fn polity_mut(&mut self, id: PolityId) -> Result<&mut Polity, SimError> {
        self.polities.get_mut(&id).ok_or(SimError::MissingPolity(id))
    }

    pub fn group_is_present(&self, id: GroupId) -> bool {
        self.groups.get(&id).is_some_and(|g| g.still_present)
    }

    /// Queue an event, allowing past dates only outside the running phase.
    pub fn insert_event(&mut self, event: WorldEvent) -> Result<(), SimError> {
        let allow_past = self.phase != WorldPhase::Running;
        self.queue.insert(event, self.current_date, allow_past)
    }

    /// Register a group in the arena and on its cell.
    pub fn add_group(&mut self, group: CellGroup) -> Result<(), SimError> {
        let cell = self
            .terrain
            .cell_mut(group.position)
            .ok_or(SimError::MissingCell(group.position))?;
        if let Some(existing) = cell.group {
            return Err(SimError::invariant(
                group.id,
                self.current_date,
                "add_group",
                format!("cell {} already holds {existing}", group.position),
            ));
        }
        cell.group = Some(group.id);
        self.groups.insert(group.id, group);
        Ok(())
    }

    /// Groups in the cells neighbouring `id`'s cell, in direction order,
    /// with the distance to each.
    pub fn neighbor_groups(&self, id: GroupId) -> Vec<(GroupId, f64)> {
        let Some(group) = self.groups.get(&id) else {
            return Vec::new();
        };
        let Some(cell) = self.terrain.cell(group.position) else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        cell.neighbors
            .iter()
            .zip(&cell.neighbor_distances)
            .filter_map(|((_, npos), dist)| {
                let gid = self.terrain.cell(*npos)?.group?;
                seen.insert(gid).then_some((gid, *dist))
            })
            .collect()
    }

    pub fn total_population(&self) -> u64 {
        self.groups.values().map(|g| g.population).sum()
    }

    /// Track the most populous group after a population change.
    pub fn note_population_change(&mut self, id: GroupId) {
        let Some(pop) = self.groups.get(&id).map(|g| g.population) else {
            return;
        };
        let current_best = self
            .most_populous_group
            .and_then(|best| self.groups.get(&best))
            .map(|g| (g.population, g.id));
        match current_best {
            Some((best_pop, best_id)) if best_id != id && best_pop >= pop => {}
            Some((_, best_id)) if best_id == id => {
                // The leader shrank; another group may now be larger.
                self.most_populous_group = self
                    .groups
                    .values()
                    .max_by_key(|g| (g.population, std::cmp::Reverse(g.id)))
                    .map(|g| g.id);
            }
            _ => self.most_populous_group = Some(id),
        }
    }

    pub fn new_group_id(&mut self) -> GroupId {
        GroupId(self.id_gen.next_id())
    }

    pub fn new_polity_id(&mut self) -> PolityId {
        PolityId(self.id_gen.next_id())
    }

    pub fn new_faction_id(&mut self) -> FactionId {
        FactionId(self.id_gen.next_id())
    }

    pub fn new_cluster_id(&mut self) -> ClusterId {
        ClusterId(self.id_gen.next_id())
    }

    pub fn new_region_id(&mut self) -> RegionId {
        RegionId(self.id_gen.next_id())
    }

    pub fn new_route_id(&mut self) -> RouteId {
        RouteId(self.id_gen.next_id())
    }

    pub fn new_language_id(&mut self) -> LanguageId {
        LanguageId(self.id_gen.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::culture::Culture;
    use crate::testutil::grass_world;

    #[test]
    fn add_group_sets_cell_back_reference() {
        let mut world = grass_world(4, 4);
        let id = world.new_group_id();
        let pos = WorldPosition::new(1, 1);
        world
            .add_group(CellGroup::new(id, pos, 100, Culture::default(), 0))
            .unwrap();
        assert_eq!(world.terrain.cell(pos).unwrap().group, Some(id));

        let dup = world.new_group_id();
        let err = world.add_group(CellGroup::new(dup, pos, 5, Culture::default(), 0));
        assert!(err.is_err());
    }

    #[test]
    fn neighbor_groups_in_direction_order() {
        let mut world = grass_world(4, 4);
        let center = world.new_group_id();
        world
            .add_group(CellGroup::new(center, WorldPosition::new(1, 1), 10, Culture::default(), 0))
            .unwrap();
        let south = world.new_group_id();
        world
            .add_group(CellGroup::new(south, WorldPosition::new(1, 0), 10, Culture::default(), 0))
            .unwrap();
        let north = world.new_group_id();
        world
            .add_group(CellGroup::new(north, WorldPosition::new(1, 2), 10, Culture::default(), 0))
            .unwrap();

        let ids: Vec<GroupId> = world.neighbor_groups(center).into_iter().map(|(g, _)| g).collect();
        assert_eq!(ids, vec![north, south]);
    }

    #[test]
    fn most_populous_tracks_leader() {
        let mut world = grass_world(4, 4);
        let a = world.new_group_id();
        world
            .add_group(CellGroup::new(a, WorldPosition::new(0, 0), 100, Culture::default(), 0))
            .unwrap();
        world.note_population_change(a);
        let b = world.new_group_id();
        world
            .add_group(CellGroup::new(b, WorldPosition::new(2, 2), 300, Culture::default(), 0))
            .unwrap();
        world.note_population_change(b);
        assert_eq!(world.most_populous_group, Some(b));

        world.groups.get_mut(&b).unwrap().population = 50;
        world.note_population_change(b);
        assert_eq!(world.most_populous_group, Some(a));
    }
}
