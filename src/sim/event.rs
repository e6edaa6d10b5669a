use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::content::ContentRegistry;
use super::context::EventContext;
use super::{discovery, group_update, migration, polity};
use crate::error::SimError;
use crate::id::{GroupId, PolityId};
use crate::model::{
    DATE_ID_FACTOR, DiscoveryKind, MAX_SUPPORTED_DATE, World, WorldDate, WorldPosition,
};

/// Per-kind type ids. Always below 1000 so they fit the low digits of an id.
pub mod type_ids {
    pub const UPDATE_CELL_GROUP: i64 = 0;
    pub const MIGRATE_GROUP: i64 = 1;
    pub const BOAT_MAKING_DISCOVERY: i64 = 2;
    pub const SAILING_DISCOVERY: i64 = 3;
    pub const TRIBALISM_DISCOVERY: i64 = 4;
    pub const PLANT_CULTIVATION_DISCOVERY: i64 = 5;
    pub const TRIBE_FORMATION: i64 = 6;
    pub const TRIBE_SPLIT: i64 = 7;
    /// First type id handed to content generators.
    pub const GENERATOR_BASE: i64 = 500;
    pub const GENERATOR_MAX: i64 = 999;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Spawned,
    Queued,
    Fired,
    Discarded,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Group(GroupId),
    Polity(PolityId),
}

/// Every kind of scheduled occurrence. The target id lives in the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    UpdateCellGroup { group: GroupId },
    MigrateGroup { group: GroupId },
    Discovery { group: GroupId, discovery: DiscoveryKind },
    TribeFormation { group: GroupId },
    TribeSplit { polity: PolityId },
    Generated { group: GroupId, generator: String, type_id: i64 },
}

impl EventKind {
    pub fn type_id(&self) -> i64 {
        match self {
            EventKind::UpdateCellGroup { .. } => type_ids::UPDATE_CELL_GROUP,
            EventKind::MigrateGroup { .. } => type_ids::MIGRATE_GROUP,
            EventKind::Discovery { discovery, .. } => match discovery {
                DiscoveryKind::BoatMaking => type_ids::BOAT_MAKING_DISCOVERY,
                DiscoveryKind::Sailing => type_ids::SAILING_DISCOVERY,
                DiscoveryKind::Tribalism => type_ids::TRIBALISM_DISCOVERY,
                DiscoveryKind::PlantCultivation => type_ids::PLANT_CULTIVATION_DISCOVERY,
            },
            EventKind::TribeFormation { .. } => type_ids::TRIBE_FORMATION,
            EventKind::TribeSplit { .. } => type_ids::TRIBE_SPLIT,
            EventKind::Generated { type_id, .. } => *type_id,
        }
    }

    pub fn target(&self) -> EventTarget {
        match self {
            EventKind::UpdateCellGroup { group }
            | EventKind::MigrateGroup { group }
            | EventKind::Discovery { group, .. }
            | EventKind::TribeFormation { group }
            | EventKind::Generated { group, .. } => EventTarget::Group(*group),
            EventKind::TribeSplit { polity } => EventTarget::Polity(*polity),
        }
    }
}

/// A scheduled occurrence tied to one target.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldEvent {
    pub id: i64,
    pub type_id: i64,
    /// Target portion of the id: cell position digits or polity digits.
    pub target_key: i64,
    pub spawn_date: WorldDate,
    pub original_spawn_date: WorldDate,
    pub trigger_date: WorldDate,
    pub state: EventState,
    pub kind: EventKind,
}

impl WorldEvent {
    /// Id digits for an event targeting a group in the cell at `pos`.
    pub fn group_target_key(pos: WorldPosition) -> i64 {
        pos.longitude as i64 * 1_000_000 + pos.latitude as i64 * 1_000
    }

    /// Id digits for an event targeting a polity.
    pub fn polity_target_key(polity: PolityId) -> i64 {
        (polity.raw() % 1_000_000) as i64 * 1_000
    }

    pub fn derive_id(trigger_date: WorldDate, target_key: i64, type_id: i64) -> i64 {
        trigger_date * DATE_ID_FACTOR + target_key + type_id
    }

    /// Spawn an event, or `None` for a scheduling anomaly (trigger date not
    /// after the spawn date, or past the supported range).
    pub fn new(
        kind: EventKind,
        target_key: i64,
        spawn_date: WorldDate,
        trigger_date: WorldDate,
    ) -> Option<Self> {
        if trigger_date <= spawn_date || trigger_date > MAX_SUPPORTED_DATE {
            warn!(
                ?kind,
                spawn_date, trigger_date, "scheduling anomaly: event not generated"
            );
            return None;
        }
        let type_id = kind.type_id();
        Some(Self {
            id: Self::derive_id(trigger_date, target_key, type_id),
            type_id,
            target_key,
            spawn_date,
            original_spawn_date: spawn_date,
            trigger_date,
            state: EventState::Spawned,
            kind,
        })
    }

    pub fn for_group(
        kind: EventKind,
        pos: WorldPosition,
        spawn_date: WorldDate,
        trigger_date: WorldDate,
    ) -> Option<Self> {
        Self::new(kind, Self::group_target_key(pos), spawn_date, trigger_date)
    }

    pub fn for_polity(
        kind: EventKind,
        polity: PolityId,
        spawn_date: WorldDate,
        trigger_date: WorldDate,
    ) -> Option<Self> {
        Self::new(kind, Self::polity_target_key(polity), spawn_date, trigger_date)
    }

    /// Build an event with an explicit id, skipping the anomaly check.
    pub fn with_id(kind: EventKind, id: i64, spawn_date: WorldDate, trigger_date: WorldDate) -> Self {
        Self {
            id,
            type_id: kind.type_id(),
            target_key: 0,
            spawn_date,
            original_spawn_date: spawn_date,
            trigger_date,
            state: EventState::Spawned,
            kind,
        }
    }

    pub fn order_key(&self) -> (WorldDate, i64) {
        (self.trigger_date, self.id)
    }

    pub fn target(&self) -> EventTarget {
        self.kind.target()
    }

    /// Reassign the trigger date and re-derive the id. The same date always
    /// yields the same id.
    pub fn reset(&mut self, new_trigger_date: WorldDate) {
        self.spawn_date = self.trigger_date.min(new_trigger_date);
        self.trigger_date = new_trigger_date;
        self.id = Self::derive_id(new_trigger_date, self.target_key, self.type_id);
        self.state = EventState::Reset;
    }

    /// Whether the target still exists and still expects this event.
    pub fn is_still_valid(&self, world: &World) -> bool {
        let date = self.trigger_date;
        match &self.kind {
            EventKind::TribeSplit { polity } => world
                .polities
                .get(polity)
                .is_some_and(|p| p.still_present && p.split_event_date == Some(date)),
            kind => {
                let EventTarget::Group(id) = kind.target() else {
                    return false;
                };
                let Some(group) = world.groups.get(&id).filter(|g| g.still_present) else {
                    return false;
                };
                match kind {
                    EventKind::UpdateCellGroup { .. } => group.next_update_date == date,
                    EventKind::MigrateGroup { .. } => group
                        .pending_migration
                        .as_ref()
                        .is_some_and(|m| m.trigger_date == date),
                    EventKind::Discovery { discovery, .. } => {
                        group.pending_discoveries.get(discovery) == Some(&date)
                    }
                    EventKind::TribeFormation { .. } => group.tribe_formation_date == Some(date),
                    EventKind::Generated { generator, .. } => {
                        group.generator_events.get(generator) == Some(&date)
                    }
                    EventKind::TribeSplit { .. } => false,
                }
            }
        }
    }

    /// Readiness predicate. Side-effect free.
    pub fn can_trigger(&self, world: &World, content: &ContentRegistry) -> bool {
        match &self.kind {
            EventKind::UpdateCellGroup { .. } => true,
            EventKind::MigrateGroup { group } => migration::can_migrate(world, *group),
            EventKind::Discovery { group, discovery } => {
                discovery::can_trigger(world, *group, *discovery)
            }
            EventKind::TribeFormation { group } => polity::can_form_tribe(world, *group),
            EventKind::TribeSplit { polity } => polity::can_split_tribe(world, *polity),
            EventKind::Generated {
                group, generator, ..
            } => {
                let Some(generator) = content.generator(generator) else {
                    return false;
                };
                world
                    .groups
                    .get(group)
                    .is_some_and(|g| generator.can_trigger(g, world))
            }
        }
    }

    /// Apply the event to the world.
    pub fn trigger(&mut self, ctx: &mut EventContext<'_>) -> Result<(), SimError> {
        match &self.kind {
            EventKind::UpdateCellGroup { group } => group_update::update_group(ctx, *group)?,
            EventKind::MigrateGroup { group } => migration::migrate_group(ctx, *group)?,
            EventKind::Discovery { group, discovery } => {
                discovery::trigger_discovery(ctx, *group, *discovery)?
            }
            EventKind::TribeFormation { group } => {
                polity::form_tribe(ctx, *group)?;
            }
            EventKind::TribeSplit { polity } => polity::split_tribe(ctx, *polity)?,
            EventKind::Generated {
                group, generator, ..
            } => {
                let generator = ctx
                    .content
                    .generator(generator)
                    .ok_or_else(|| SimError::MissingGenerator(generator.clone()))?;
                generator.trigger(*group, ctx.world)?;
            }
        }
        self.state = EventState::Fired;
        Ok(())
    }

    pub fn discard(&mut self) {
        self.state = EventState::Discarded;
    }

    /// Post-processing that runs whether or not the event fired. Clears the
    /// target's pending markers and re-queues recurring events.
    pub fn cleanup(mut self, ctx: &mut EventContext<'_>) -> Result<(), SimError> {
        let date = self.trigger_date;
        let current = ctx.world.current_date;
        match self.kind.clone() {
            EventKind::UpdateCellGroup { group } => {
                if self.state != EventState::Fired {
                    return Ok(());
                }
                let Some(next) = ctx
                    .world
                    .groups
                    .get(&group)
                    .filter(|g| g.still_present)
                    .map(|g| g.next_update_date)
                else {
                    return Ok(());
                };
                if next > current && next <= MAX_SUPPORTED_DATE {
                    self.reset(next);
                    ctx.world.insert_event(self)?;
                } else {
                    debug!(%group, next, "update event not re-queued");
                }
            }
            EventKind::MigrateGroup { group } => {
                if let Some(g) = ctx.world.groups.get_mut(&group)
                    && g.pending_migration.as_ref().is_some_and(|m| m.trigger_date == date)
                {
                    g.pending_migration = None;
                }
            }
            EventKind::Discovery { group, discovery } => {
                if let Some(g) = ctx.world.groups.get_mut(&group)
                    && g.pending_discoveries.get(&discovery) == Some(&date)
                {
                    g.pending_discoveries.remove(&discovery);
                }
            }
            EventKind::TribeFormation { group } => {
                if let Some(g) = ctx.world.groups.get_mut(&group)
                    && g.tribe_formation_date == Some(date)
                {
                    g.tribe_formation_date = None;
                }
            }
            EventKind::TribeSplit { polity } => {
                let expected = ctx
                    .world
                    .polities
                    .get(&polity)
                    .is_some_and(|p| p.still_present && p.split_event_date == Some(date));
                if !expected {
                    return Ok(());
                }
                match polity::next_split_date(ctx.world, polity)? {
                    Some(next) => {
                        ctx.world.polity_mut(polity)?.split_event_date = Some(next);
                        self.reset(next);
                        ctx.world.insert_event(self)?;
                    }
                    None => ctx.world.polity_mut(polity)?.split_event_date = None,
                }
            }
            EventKind::Generated {
                group, generator, ..
            } => {
                let flag = ctx.content.generator(&generator).map(|g| g.event_set_flag());
                if let Some(g) = ctx.world.groups.get_mut(&group)
                    && g.generator_events.get(&generator) == Some(&date)
                {
                    g.generator_events.remove(&generator);
                    if let Some(flag) = flag {
                        g.flags.remove(&flag);
                    }
                }
            }
        }
        Ok(())
    }

    /// Check that a rebuilt event's references resolve against a loaded world.
    pub fn finalize_load(&self, world: &World, content: &ContentRegistry) -> Result<(), SimError> {
        match &self.kind {
            EventKind::TribeSplit { polity } => {
                world.polity(*polity)?;
            }
            EventKind::Generated {
                group, generator, ..
            } => {
                world.group(*group)?;
                if content.generator(generator).is_none() {
                    return Err(SimError::MissingGenerator(generator.clone()));
                }
            }
            kind => {
                if let EventTarget::Group(group) = kind.target() {
                    world.group(group)?;
                }
            }
        }
        Ok(())
    }
}
