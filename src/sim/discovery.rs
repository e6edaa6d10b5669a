use tracing::{debug, warn};

use super::context::EventContext;
use super::event::{EventKind, WorldEvent};
use crate::error::SimError;
use crate::id::GroupId;
use crate::model::{DiscoveryKind, World, date_after};
use crate::rng::offsets;

/// Schedule a discovery event for every discovery the group now qualifies
/// for and is not already working toward.
pub fn assign_discovery_events(world: &mut World, id: GroupId) -> Result<(), SimError> {
    let current = world.current_date;
    for kind in DiscoveryKind::ALL {
        let group = world.group(id)?;
        if group.pending_discoveries.contains_key(&kind) {
            continue;
        }
        let cell = world.cell(group.position)?;
        if !kind.can_be_discovered(&group.culture, cell) {
            continue;
        }
        let r = cell.random_float(world.seed, current, offsets::DISCOVERY_DATE + kind as u32);
        let span = kind.mean_discovery_span() * (0.5 + r);
        let Some(date) = date_after(current, span) else {
            warn!(%id, discovery = %kind, span, "discovery date out of range");
            continue;
        };
        let Some(event) = WorldEvent::for_group(
            EventKind::Discovery {
                group: id,
                discovery: kind,
            },
            group.position,
            current,
            date,
        ) else {
            continue;
        };
        world.group_mut(id)?.pending_discoveries.insert(kind, date);
        world.insert_event(event)?;
    }
    Ok(())
}

pub fn can_trigger(world: &World, id: GroupId, kind: DiscoveryKind) -> bool {
    let Some(group) = world.groups.get(&id) else {
        return false;
    };
    world
        .terrain
        .cell(group.position)
        .is_some_and(|cell| kind.can_be_discovered(&group.culture, cell))
}

pub fn trigger_discovery(
    ctx: &mut EventContext<'_>,
    id: GroupId,
    kind: DiscoveryKind,
) -> Result<(), SimError> {
    let date = ctx.world.current_date;
    let group = ctx.world.group_mut(id)?;
    if group.culture.gain_discovery(kind) {
        debug!(%id, discovery = %kind, date, "discovery made");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorldPosition;
    use crate::model::culture::ids;
    use crate::sim::ContentRegistry;
    use crate::testutil::{island_world, place_group};

    #[test]
    fn coastal_group_works_toward_boat_making() {
        let mut world = island_world();
        world.current_date = 100;
        let id = place_group(&mut world, WorldPosition::new(3, 4), 500);
        assign_discovery_events(&mut world, id).unwrap();

        let group = world.group(id).unwrap();
        let date = group.pending_discoveries[&DiscoveryKind::BoatMaking];
        assert!(date >= 100 + 1_000 && date <= 100 + 3_000);
        assert!(!group.pending_discoveries.contains_key(&DiscoveryKind::Sailing));
        assert!(!group.pending_discoveries.contains_key(&DiscoveryKind::Tribalism));
        assert!(world.queue.iter().any(|e| e.trigger_date == date));

        // Already pending: nothing new is queued.
        let queued = world.queue.len();
        assign_discovery_events(&mut world, id).unwrap();
        assert_eq!(world.queue.len(), queued);
    }

    #[test]
    fn triggering_applies_consequences() {
        let mut world = island_world();
        let content = ContentRegistry::new();
        let id = place_group(&mut world, WorldPosition::new(3, 4), 500);
        assert!(can_trigger(&world, id, DiscoveryKind::BoatMaking));

        let mut ctx = EventContext::new(&mut world, &content);
        trigger_discovery(&mut ctx, id, DiscoveryKind::BoatMaking).unwrap();

        let culture = &world.group(id).unwrap().culture;
        assert!(culture.has_discovery(DiscoveryKind::BoatMaking));
        assert!(culture.knowledge_value(ids::SHIPBUILDING) > 0.0);
        assert!(!can_trigger(&world, id, DiscoveryKind::BoatMaking));
    }
}
